//! Caller-owned conversation state and the rules that decide what to ask next.
//!
//! The state object is round-tripped by the client on every turn; nothing here
//! is stored server side.

use serde::{Deserialize, Serialize};

use crate::model::{Gender, HealthClass, Rider};
use crate::rules;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Initial,
    GatheringInfo,
    QuotePresented,
    AdjustingQuote,
}

/// Quote parameters gathered so far. Every field is filled in incrementally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_code: Option<String>,
    #[serde(
        rename = "flagTobaccoUse",
        alias = "tobaccoUse",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub tobacco_use: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_class: Option<HealthClass>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_amount: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benefit_period: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub riders: Vec<Rider>,
}

impl QuoteParams {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependent {
    pub age: u32,
}

/// Inputs for the coverage suggestion that are not sent to the vendor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub income: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_debt: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mortgage_balance: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependents: Vec<Dependent>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationState {
    #[serde(default)]
    pub stage: Stage,
    #[serde(default)]
    pub quote_params: QuoteParams,
    #[serde(default)]
    pub user_input: UserInput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_quote_id: Option<String>,
    /// Amount and term of the last presented quote. Suggested values live
    /// here rather than in `quote_params` so they are re-derived each time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_face_amount: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_benefit_period: Option<u32>,
}

/// Parameters the assistant must collect before quoting, in asking order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RequiredParameter {
    Age,
    Gender,
    StateCode,
    TobaccoUse,
    HealthClass,
    Income,
    TotalDebt,
}

impl RequiredParameter {
    pub const ORDER: [RequiredParameter; 7] = [
        Self::Age,
        Self::Gender,
        Self::StateCode,
        Self::TobaccoUse,
        Self::HealthClass,
        Self::Income,
        Self::TotalDebt,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Age => "age",
            Self::Gender => "gender",
            Self::StateCode => "stateCode",
            Self::TobaccoUse => "tobaccoUse",
            Self::HealthClass => "healthClass",
            Self::Income => "income",
            Self::TotalDebt => "totalDebt",
        }
    }

    pub fn question(self) -> &'static str {
        match self {
            Self::Age => "To get started, could you tell me your age?",
            Self::Gender => "Are you male or female?",
            Self::StateCode => "What state do you live in? (two-letter code, e.g. AZ)",
            Self::TobaccoUse => "Do you use any tobacco products?",
            Self::HealthClass => {
                "How would you rate your overall health? (Excellent, Great, Good, or Average)"
            }
            Self::Income => "What is your annual income?",
            Self::TotalDebt => "What is your total debt, including mortgages and other loans?",
        }
    }
}

pub const CLOSING_QUESTION: &str =
    "Is there anything specific about the coverage you'd like to discuss?";

/// A typed answer to one required parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Age(u32),
    Gender(Gender),
    StateCode(String),
    TobaccoUse(bool),
    HealthClass(HealthClass),
    Income(u64),
    TotalDebt(u64),
}

impl ConversationState {
    pub fn has(&self, parameter: RequiredParameter) -> bool {
        let params = &self.quote_params;
        match parameter {
            RequiredParameter::Age => params.age.is_some(),
            RequiredParameter::Gender => params.gender.is_some(),
            RequiredParameter::StateCode => params.state_code.is_some(),
            RequiredParameter::TobaccoUse => params.tobacco_use.is_some(),
            RequiredParameter::HealthClass => params.health_class.is_some(),
            RequiredParameter::Income => self.user_input.income.is_some(),
            RequiredParameter::TotalDebt => self.user_input.total_debt.is_some(),
        }
    }

    pub fn is_ready_to_quote(&self) -> bool {
        next_required_parameter(self).is_none()
    }

    /// Stores an answer. Returns true when a quote parameter changed value.
    pub fn apply(&mut self, answer: Answer) -> bool {
        let params = &mut self.quote_params;
        match answer {
            Answer::Age(age) => replace(&mut params.age, age),
            Answer::Gender(gender) => replace(&mut params.gender, gender),
            Answer::StateCode(code) => replace(&mut params.state_code, code),
            Answer::TobaccoUse(flag) => replace(&mut params.tobacco_use, flag),
            Answer::HealthClass(class) => replace(&mut params.health_class, class),
            Answer::Income(income) => {
                self.user_input.income = Some(income);
                false
            }
            Answer::TotalDebt(debt) => {
                self.user_input.total_debt = Some(debt);
                false
            }
        }
    }

    /// Moves the stage forward after a turn's answers were applied.
    ///
    /// `initial` becomes `gathering_info` once any quote parameter exists, and a
    /// presented quote becomes `adjusting_quote` when its parameters change.
    pub fn advance(&mut self, quote_params_changed: bool) {
        self.stage = match self.stage {
            Stage::Initial if !self.quote_params.is_empty() => Stage::GatheringInfo,
            Stage::QuotePresented if quote_params_changed => Stage::AdjustingQuote,
            stage => stage,
        };
    }

    /// Records a successful vendor quote.
    pub fn mark_quoted(
        &mut self,
        quote_response_id: impl Into<String>,
        face_amount: u64,
        benefit_period: u32,
    ) {
        self.stage = Stage::QuotePresented;
        self.last_quote_id = Some(quote_response_id.into());
        self.last_face_amount = Some(face_amount);
        self.last_benefit_period = Some(benefit_period);
    }
}

fn replace<T: PartialEq>(slot: &mut Option<T>, value: T) -> bool {
    let changed = slot.as_ref() != Some(&value);
    *slot = Some(value);
    changed
}

/// First parameter in asking order that has not been gathered, or `None`
/// when the conversation has everything it needs to quote.
pub fn next_required_parameter(state: &ConversationState) -> Option<RequiredParameter> {
    RequiredParameter::ORDER
        .into_iter()
        .find(|parameter| !state.has(*parameter))
}

pub fn next_question(state: &ConversationState) -> &'static str {
    next_required_parameter(state)
        .map(RequiredParameter::question)
        .unwrap_or(CLOSING_QUESTION)
}

/// First run of ASCII digits in `text`.
pub fn extract_number(text: &str) -> Option<u64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

/// Like [`extract_number`] but tolerant of thousands separators ("$85,000").
pub fn parse_amount(text: &str) -> Option<u64> {
    extract_number(&text.replace(',', ""))
}

pub fn parse_gender(text: &str) -> Option<Gender> {
    match text.trim().chars().next()?.to_ascii_lowercase() {
        'm' => Some(Gender::Male),
        'f' => Some(Gender::Female),
        _ => None,
    }
}

pub fn parse_tobacco(text: &str) -> Option<bool> {
    match text.trim().to_lowercase().as_str() {
        "yes" | "y" | "true" | "yeah" | "yep" => Some(true),
        "no" | "n" | "false" | "nah" | "nope" => Some(false),
        _ => None,
    }
}

pub fn parse_health_class(text: &str) -> Option<HealthClass> {
    let text = text.trim();
    HealthClass::ALL
        .into_iter()
        .find(|class| class.as_str().eq_ignore_ascii_case(text))
}

/// Uppercased state code, or `None` when malformed or not eligible.
pub fn parse_state_code(text: &str) -> Option<String> {
    let code = text.trim().to_uppercase();
    rules::is_eligible_state(&code).then_some(code)
}

/// Parses a free-text reply to the question about `parameter`.
pub fn parse_answer(parameter: RequiredParameter, text: &str) -> Option<Answer> {
    match parameter {
        RequiredParameter::Age => extract_number(text)
            .and_then(|n| u32::try_from(n).ok())
            .filter(|age| rules::is_supported_age(*age))
            .map(Answer::Age),
        RequiredParameter::Gender => parse_gender(text).map(Answer::Gender),
        RequiredParameter::StateCode => parse_state_code(text).map(Answer::StateCode),
        RequiredParameter::TobaccoUse => parse_tobacco(text).map(Answer::TobaccoUse),
        RequiredParameter::HealthClass => parse_health_class(text).map(Answer::HealthClass),
        RequiredParameter::Income => parse_amount(text).map(Answer::Income),
        RequiredParameter::TotalDebt => parse_amount(text).map(Answer::TotalDebt),
    }
}
