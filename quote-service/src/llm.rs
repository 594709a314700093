use async_trait::async_trait;
use quote_flow::extraction::{ExtractionError, ParameterExtractor};
use rig::{agent::Agent, client::CompletionClient, completion::Prompt, providers::openrouter};
use serde_json::Value;
use tracing::{debug, info};

const EXTRACTION_PREAMBLE: &str = r#"You extract life insurance quote parameters from a single customer message.

RULES:
- Only report values the customer actually stated. Never guess or fill in defaults.
- gender is 1 for male and 2 for female.
- stateCode is the two-letter US state code.
- flagTobaccoUse is true only if the customer uses tobacco or nicotine.
- healthClass is one of Excellent, Great, Good, Average.
- Money amounts are whole dollars without symbols or separators.
- dependents is a list of {"age": n} objects, one per child or dependent.

Respond with ONLY a JSON object using the property names of the schema you are given.
If the message contains none of the parameters respond with: null
Do not mix text and JSON in your response."#;

/// Builds an OpenRouter agent with the given preamble.
pub fn get_llm_agent(
    api_key: &str,
    model: &str,
    preamble: &str,
) -> Agent<openrouter::CompletionModel> {
    let client = openrouter::Client::new(api_key);
    client.agent(model).preamble(preamble).build()
}

/// Parameter extraction backed by an OpenRouter-routed chat model.
pub struct OpenRouterExtractor {
    agent: Agent<openrouter::CompletionModel>,
}

impl OpenRouterExtractor {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            agent: get_llm_agent(api_key, model, EXTRACTION_PREAMBLE),
        }
    }
}

#[async_trait]
impl ParameterExtractor for OpenRouterExtractor {
    async fn extract(&self, text: &str, schema: &Value) -> Result<Option<Value>, ExtractionError> {
        let prompt = format!("Schema:\n{schema}\n\nCustomer message:\n{text}");
        let response = self
            .agent
            .prompt(&prompt)
            .await
            .map_err(|e| ExtractionError(e.to_string()))?;

        debug!(response_length = response.len(), "Extractor responded");
        let parameters = parse_extraction_response(&response)?;
        info!(
            extracted = parameters.is_some(),
            "Parameter extraction finished"
        );
        Ok(parameters)
    }
}

/// Pulls the JSON object out of a model reply. `null`, an empty object and a
/// reply with no JSON at all mean nothing was extracted.
pub fn parse_extraction_response(response: &str) -> Result<Option<Value>, ExtractionError> {
    let trimmed = strip_code_fence(response.trim());
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(None);
    }

    let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) else {
        return Ok(None);
    };
    if end < start {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(&trimmed[start..=end])
        .map_err(|e| ExtractionError(format!("invalid JSON from model: {e}")))?;
    match value {
        Value::Object(map) if map.is_empty() => Ok(None),
        Value::Object(_) => Ok(Some(value)),
        _ => Ok(None),
    }
}

fn strip_code_fence(text: &str) -> &str {
    text.strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(text)
}
