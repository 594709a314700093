//! Request handling that ties extraction, validation, coverage suggestion and
//! the vendor call together. Holds no per-conversation state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::calculator::{CoverageSuggestion, calculate_dime_coverage, suggest_term_length};
use crate::conversation::{
    Answer, ConversationState, RequiredParameter, Stage, next_question, next_required_parameter,
    parse_answer, parse_state_code,
};
use crate::error::{QuoteFlowError, Result, ValidationError};
use crate::extraction::{ExtractedParameters, ParameterExtractor, quote_parameter_schema};
use crate::model::{
    ApplicationLinks, PaymentFrequency, QuoteOffer, QuoteRequest, StartApplicationRequest,
};
use crate::quoting::QuotingService;
use crate::rules::{self, MAX_AGE, MIN_AGE};
use crate::validator::{validate_quote_request, validate_start_application};

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub context: Option<ConversationState>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub message: String,
    pub context: ConversationState,
    pub quote: Option<QuoteOffer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage: Option<CoverageSuggestion>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ValidationError>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequoteRequest {
    #[serde(default)]
    pub original_quote_id: Option<String>,
    #[serde(default)]
    pub original_quote: Value,
    #[serde(default)]
    pub updates: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequoteResponse {
    pub original_quote_id: String,
    pub updated_quote: QuoteOffer,
}

pub struct QuoteOrchestrator {
    extractor: Arc<dyn ParameterExtractor>,
    quoting: Arc<dyn QuotingService>,
    schema: Value,
}

impl QuoteOrchestrator {
    pub fn new(extractor: Arc<dyn ParameterExtractor>, quoting: Arc<dyn QuotingService>) -> Self {
        Self {
            extractor,
            quoting,
            schema: quote_parameter_schema(),
        }
    }

    /// Validates a direct quote request and forwards it to the vendor.
    pub async fn quote(&self, mut request: QuoteRequest) -> Result<QuoteOffer> {
        request.normalize_phone();
        validate_quote_request(&request)?;

        let offer = self.quoting.get_quote(&request).await?;
        info!(
            quote_response_id = %offer.selected_quote.quote_response_id,
            face_amount = request.face_amount,
            benefit_period = request.benefit_period,
            "Quote received"
        );
        Ok(offer)
    }

    pub async fn start_application(
        &self,
        mut request: StartApplicationRequest,
    ) -> Result<ApplicationLinks> {
        request.normalize_phone();
        validate_start_application(&request)?;

        let links = self.quoting.start_application(&request).await?;
        info!(
            quote_response_id = ?request.quote_response_id,
            "Application links generated"
        );
        Ok(links)
    }

    /// Merges `updates` over `original_quote` and quotes the result.
    pub async fn requote(&self, request: RequoteRequest) -> Result<RequoteResponse> {
        let original_quote_id = request
            .original_quote_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                QuoteFlowError::Malformed(
                    "Original quote ID is required for requoting".to_string(),
                )
            })?
            .to_string();

        let merged = merge_objects(request.original_quote, request.updates)?;
        let quote_request: QuoteRequest = serde_json::from_value(merged)
            .map_err(|e| QuoteFlowError::Malformed(format!("invalid quote parameters: {e}")))?;

        info!(original_quote_id = %original_quote_id, "Requoting with updated parameters");
        let updated_quote = self.quote(quote_request).await?;
        Ok(RequoteResponse {
            original_quote_id,
            updated_quote,
        })
    }

    /// Runs one conversation turn.
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let message = request.message.trim();
        if message.is_empty() {
            return Err(QuoteFlowError::Malformed("message is required".to_string()));
        }

        let mut state = request.context.unwrap_or_default();
        let asking = next_required_parameter(&state);
        let stage_before = state.stage;

        let extracted = self.extract(message).await;
        let mut notes = Vec::new();
        let mut changed = apply_extracted(&mut state, &extracted, &mut notes);
        let mut understood = !extracted.is_empty();

        // The model may miss short replies such as "yes" or "35".
        if let Some(parameter) = asking.filter(|p| !state.has(*p)) {
            if let Some(answer) = parse_answer(parameter, message) {
                debug!(parameter = parameter.as_str(), "Parsed reply directly");
                changed |= state.apply(answer);
                understood = true;
            }
        }

        state.advance(changed);
        info!(
            from = ?stage_before,
            to = ?state.stage,
            next = ?next_required_parameter(&state).map(RequiredParameter::as_str),
            "Conversation turn applied"
        );

        let wants_quote = matches!(state.stage, Stage::GatheringInfo | Stage::AdjustingQuote);
        if wants_quote {
            if let Some((quote_request, coverage)) = build_quote_request(&state) {
                return self.quote_turn(state, quote_request, coverage, notes).await;
            }
        }

        if !understood && notes.is_empty() && state.stage == Stage::GatheringInfo {
            notes.push("Sorry, I didn't catch that.".to_string());
        }
        Ok(ChatResponse {
            message: compose(&notes, next_question(&state)),
            context: state,
            quote: None,
            coverage: None,
            errors: Vec::new(),
        })
    }

    async fn quote_turn(
        &self,
        mut state: ConversationState,
        request: QuoteRequest,
        coverage: CoverageSuggestion,
        notes: Vec<String>,
    ) -> Result<ChatResponse> {
        if let Err(failure) = validate_quote_request(&request) {
            warn!(
                errors = failure.errors.len(),
                stage = ?state.stage,
                "Conversation quote failed validation"
            );
            let detail = failure.messages().join("; ");
            return Ok(ChatResponse {
                message: compose(
                    &notes,
                    &format!("I can't prepare a quote with these details yet: {detail}"),
                ),
                context: state,
                quote: None,
                coverage: Some(coverage),
                errors: failure.errors,
            });
        }

        let suggested_face = state.quote_params.face_amount.is_none();
        let offer = self.quoting.get_quote(&request).await?;

        state.mark_quoted(
            offer.selected_quote.quote_response_id.clone(),
            request.face_amount,
            request.benefit_period,
        );
        info!(
            quote_response_id = %offer.selected_quote.quote_response_id,
            "Quote presented"
        );

        let mut summary = String::new();
        if suggested_face {
            summary.push_str(&format!(
                "Based on your income, debts and dependents I suggest ${} of coverage. ",
                coverage.suggested_amount
            ));
        }
        summary.push_str(&describe_offer(&offer));

        Ok(ChatResponse {
            message: compose(&notes, &summary),
            context: state,
            quote: Some(offer),
            coverage: Some(coverage),
            errors: Vec::new(),
        })
    }

    async fn extract(&self, message: &str) -> ExtractedParameters {
        match self.extractor.extract(message, &self.schema).await {
            Ok(Some(value)) => ExtractedParameters::from_value(&value),
            Ok(None) => ExtractedParameters::default(),
            Err(e) => {
                warn!(error = %e, "Parameter extraction failed, parsing reply directly");
                ExtractedParameters::default()
            }
        }
    }
}

/// Applies sanitized extractor output. Returns true when a quote parameter
/// changed; rejected values leave an explanation in `notes`.
fn apply_extracted(
    state: &mut ConversationState,
    extracted: &ExtractedParameters,
    notes: &mut Vec<String>,
) -> bool {
    let mut changed = false;

    if let Some(age) = extracted.age {
        if rules::is_supported_age(age) {
            changed |= state.apply(Answer::Age(age));
        } else {
            notes.push(format!(
                "Coverage is only available for ages {MIN_AGE} to {MAX_AGE}."
            ));
        }
    }
    if let Some(gender) = extracted.gender {
        changed |= state.apply(Answer::Gender(gender));
    }
    if let Some(code) = extracted.state_code.as_deref() {
        match parse_state_code(code) {
            Some(code) => changed |= state.apply(Answer::StateCode(code)),
            None if rules::is_excluded_state(code) => {
                notes.push(format!("Unfortunately coverage isn't available in {code}."))
            }
            None => notes.push("I need a valid two-letter state code.".to_string()),
        }
    }
    if let Some(flag) = extracted.tobacco_use {
        changed |= state.apply(Answer::TobaccoUse(flag));
    }
    if let Some(class) = extracted.health_class {
        changed |= state.apply(Answer::HealthClass(class));
    }
    if let Some(amount) = extracted.face_amount {
        changed |= state.quote_params.face_amount.replace(amount) != Some(amount);
    }
    if let Some(period) = extracted.benefit_period {
        changed |= state.quote_params.benefit_period.replace(period) != Some(period);
    }
    if let Some(income) = extracted.income {
        state.apply(Answer::Income(income));
    }
    if let Some(debt) = extracted.total_debt {
        state.apply(Answer::TotalDebt(debt));
    }
    if let Some(balance) = extracted.mortgage_balance {
        state.user_input.mortgage_balance = Some(balance);
    }
    if let Some(dependents) = &extracted.dependents {
        state.user_input.dependents = dependents.clone();
    }

    changed
}

/// Builds the vendor request once every required parameter is present.
/// Face amount and term fall back to the coverage suggestion.
fn build_quote_request(state: &ConversationState) -> Option<(QuoteRequest, CoverageSuggestion)> {
    if !state.is_ready_to_quote() {
        return None;
    }
    let params = &state.quote_params;
    let input = &state.user_input;
    let age = params.age?;
    let tobacco_use = params.tobacco_use?;

    let coverage = calculate_dime_coverage(
        input.income,
        input.total_debt,
        input.mortgage_balance,
        &input.dependents,
        age,
    );
    let benefit_period = params.benefit_period.unwrap_or_else(|| {
        snap_term(
            suggest_term_length(age, &input.dependents),
            rules::allowed_benefit_periods(age, tobacco_use),
        )
    });

    let request = QuoteRequest {
        face_amount: params.face_amount.unwrap_or(coverage.suggested_amount),
        benefit_period,
        tobacco_use,
        gender: params.gender?,
        state_code: params.state_code.clone(),
        zip_code: None,
        rate_class: None,
        health_class: params.health_class,
        height: None,
        weight_in_lbs: None,
        age: Some(age),
        date_of_birth: None,
        riders: params.riders.clone(),
        payment_frequency: PaymentFrequency::Monthly,
        first_name: None,
        last_name: None,
        email: None,
        phone: None,
    };
    Some((request, coverage))
}

/// Largest allowed period not above `suggested`, else the shortest allowed.
fn snap_term(suggested: u32, allowed: &[u32]) -> u32 {
    allowed
        .iter()
        .copied()
        .filter(|period| *period <= suggested)
        .max()
        .or_else(|| allowed.iter().copied().min())
        .unwrap_or(suggested)
}

fn merge_objects(original: Value, updates: Value) -> Result<Value> {
    let mut merged = into_object(original, "originalQuote")?;
    merged.extend(into_object(updates, "updates")?);
    Ok(Value::Object(merged))
}

fn into_object(value: Value, name: &str) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => Err(QuoteFlowError::Malformed(format!("{name} must be an object"))),
    }
}

fn describe_offer(offer: &QuoteOffer) -> String {
    let quote = &offer.selected_quote;
    format!(
        "{}: ${:.2} {} for ${:.0} of coverage over {} years. \
         Would you like to start your application or adjust the coverage?",
        offer.product_name,
        quote.quote_amount,
        quote.payment_frequency.to_lowercase(),
        quote.face_amount,
        quote.benefit_period
    )
}

fn compose(notes: &[String], text: &str) -> String {
    if notes.is_empty() {
        text.to_string()
    } else {
        format!("{} {}", notes.join(" "), text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snaps_term_to_allowed_periods() {
        assert_eq!(snap_term(20, &[10, 20, 30]), 20);
        assert_eq!(snap_term(30, &[10, 20]), 20);
        assert_eq!(snap_term(5, &[10, 20]), 10);
        assert_eq!(snap_term(20, &[]), 20);
    }

    #[test]
    fn merges_updates_over_original() {
        let merged = merge_objects(
            serde_json::json!({ "faceAmount": 100000, "age": 30 }),
            serde_json::json!({ "faceAmount": 250000 }),
        )
        .unwrap();
        assert_eq!(merged["faceAmount"], 250000);
        assert_eq!(merged["age"], 30);
    }

    #[test]
    fn merge_rejects_non_objects() {
        let result = merge_objects(serde_json::json!([1, 2]), Value::Null);
        assert!(matches!(result, Err(QuoteFlowError::Malformed(_))));
    }

    #[test]
    fn rejected_extracted_values_leave_notes() {
        let mut state = ConversationState::default();
        let mut notes = Vec::new();
        let extracted = ExtractedParameters {
            age: Some(72),
            state_code: Some("NY".to_string()),
            ..Default::default()
        };
        assert!(!apply_extracted(&mut state, &extracted, &mut notes));
        assert_eq!(notes.len(), 2);
        assert!(state.quote_params.is_empty());
    }

    #[test]
    fn quote_request_needs_every_parameter() {
        let mut state = ConversationState::default();
        state.apply(Answer::Age(48));
        assert!(build_quote_request(&state).is_none());
    }
}
