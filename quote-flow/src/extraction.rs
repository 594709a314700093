//! Language-model parameter extraction seam.
//!
//! Extractor output is untrusted: fields are read one at a time, anything that
//! does not fit its type is dropped, and the orchestrator still runs the full
//! validator before a quote is requested.

use async_trait::async_trait;
use serde_json::{Value, json};
use thiserror::Error;

use crate::conversation::{Dependent, parse_gender, parse_health_class, parse_tobacco};
use crate::model::{Gender, HealthClass};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parameter extraction failed: {0}")]
pub struct ExtractionError(pub String);

/// Turns free text into a partial parameter object shaped by `schema`.
#[async_trait]
pub trait ParameterExtractor: Send + Sync {
    /// `Ok(None)` means nothing could be extracted from the text.
    async fn extract(
        &self,
        text: &str,
        schema: &Value,
    ) -> Result<Option<Value>, ExtractionError>;
}

/// JSON schema describing what the extractor may return.
pub fn quote_parameter_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "age": { "type": "integer", "description": "Applicant age in years" },
            "gender": { "type": "integer", "enum": [1, 2], "description": "1 = male, 2 = female" },
            "stateCode": { "type": "string", "description": "Two-letter US state code" },
            "flagTobaccoUse": { "type": "boolean" },
            "healthClass": {
                "type": "string",
                "enum": ["Excellent", "Great", "Good", "Average"]
            },
            "faceAmount": { "type": "integer", "description": "Requested coverage in dollars" },
            "benefitPeriod": { "type": "integer", "enum": [10, 20, 30] },
            "income": { "type": "integer", "description": "Annual income in dollars" },
            "totalDebt": { "type": "integer", "description": "Total debt in dollars" },
            "mortgageBalance": { "type": "integer" },
            "dependents": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": { "age": { "type": "integer" } }
                }
            }
        }
    })
}

/// Typed view of an extractor response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedParameters {
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub state_code: Option<String>,
    pub tobacco_use: Option<bool>,
    pub health_class: Option<HealthClass>,
    pub face_amount: Option<u64>,
    pub benefit_period: Option<u32>,
    pub income: Option<u64>,
    pub total_debt: Option<u64>,
    pub mortgage_balance: Option<u64>,
    pub dependents: Option<Vec<Dependent>>,
}

impl ExtractedParameters {
    pub fn from_value(value: &Value) -> Self {
        // some models nest the object one level down
        let value = value.get("extractedInfo").unwrap_or(value);

        Self {
            age: field(value, &["age"])
                .and_then(as_whole_number)
                .and_then(|n| u32::try_from(n).ok()),
            gender: field(value, &["gender"]).and_then(as_gender),
            state_code: field(value, &["stateCode", "state"])
                .and_then(Value::as_str)
                .map(|s| s.trim().to_uppercase()),
            tobacco_use: field(value, &["flagTobaccoUse", "tobaccoUse"]).and_then(as_flag),
            health_class: field(value, &["healthClass"])
                .and_then(Value::as_str)
                .and_then(parse_health_class),
            face_amount: field(value, &["faceAmount"]).and_then(as_whole_number),
            benefit_period: field(value, &["benefitPeriod"])
                .and_then(as_whole_number)
                .and_then(|n| u32::try_from(n).ok()),
            income: field(value, &["income", "annualIncome"]).and_then(as_whole_number),
            total_debt: field(value, &["totalDebt"]).and_then(as_whole_number),
            mortgage_balance: field(value, &["mortgageBalance"]).and_then(as_whole_number),
            dependents: field(value, &["dependents"]).and_then(as_dependents),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn field<'a>(value: &'a Value, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|name| value.get(*name))
        .find(|v| !v.is_null())
}

fn as_whole_number(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64)),
        Value::String(s) => s.replace([',', '$'], "").trim().parse().ok(),
        _ => None,
    }
}

fn as_gender(value: &Value) -> Option<Gender> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .and_then(|code| u8::try_from(code).ok())
            .and_then(|code| Gender::try_from(code).ok()),
        Value::String(s) => parse_gender(s),
        _ => None,
    }
}

fn as_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => parse_tobacco(s),
        _ => None,
    }
}

fn as_dependents(value: &Value) -> Option<Vec<Dependent>> {
    let items = value.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| {
                let age = item.get("age").unwrap_or(item);
                as_whole_number(age).and_then(|n| u32::try_from(n).ok())
            })
            .map(|age| Dependent { age })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_typed_fields() {
        let extracted = ExtractedParameters::from_value(&json!({
            "age": 42,
            "gender": 2,
            "stateCode": "tx",
            "flagTobaccoUse": false,
            "healthClass": "Great",
            "income": 85000,
            "dependents": [{ "age": 3 }, { "age": 7 }]
        }));

        assert_eq!(extracted.age, Some(42));
        assert_eq!(extracted.gender, Some(Gender::Female));
        assert_eq!(extracted.state_code.as_deref(), Some("TX"));
        assert_eq!(extracted.tobacco_use, Some(false));
        assert_eq!(extracted.health_class, Some(HealthClass::Great));
        assert_eq!(extracted.income, Some(85_000));
        assert_eq!(
            extracted.dependents,
            Some(vec![Dependent { age: 3 }, Dependent { age: 7 }])
        );
    }

    #[test]
    fn tolerates_loose_model_output() {
        let extracted = ExtractedParameters::from_value(&json!({
            "extractedInfo": {
                "age": "35",
                "gender": "male",
                "tobaccoUse": "no",
                "healthClass": "excellent",
                "totalDebt": "$12,500",
                "faceAmount": 250000.0
            }
        }));

        assert_eq!(extracted.age, Some(35));
        assert_eq!(extracted.gender, Some(Gender::Male));
        assert_eq!(extracted.tobacco_use, Some(false));
        assert_eq!(extracted.health_class, Some(HealthClass::Excellent));
        assert_eq!(extracted.total_debt, Some(12_500));
        assert_eq!(extracted.face_amount, Some(250_000));
    }

    #[test]
    fn drops_fields_that_do_not_fit() {
        let extracted = ExtractedParameters::from_value(&json!({
            "age": -4,
            "gender": 9,
            "healthClass": "Superb",
            "income": null,
            "benefitPeriod": 12.5
        }));
        assert!(extracted.is_empty());
    }

    #[test]
    fn schema_lists_every_parameter() {
        let schema = quote_parameter_schema();
        let properties = schema["properties"].as_object().unwrap();
        for name in ["age", "gender", "stateCode", "flagTobaccoUse", "healthClass", "income", "totalDebt"] {
            assert!(properties.contains_key(name), "{name}");
        }
    }
}
