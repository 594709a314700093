use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single rule violation, keyed by the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Every violation found in one request. Never empty when returned as an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("quote validation failed with {} error(s)", errors.len())]
pub struct ValidationFailure {
    pub errors: Vec<ValidationError>,
}

impl ValidationFailure {
    pub fn messages(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.message.as_str()).collect()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

/// Failures reported by the upstream quoting collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    #[error("upstream authentication failed")]
    Auth,
    #[error("upstream resource not found: {0}")]
    NotFound(String),
    #[error("upstream rejected the request: {0}")]
    Rejected(String),
    #[error("upstream request failed: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuoteFlowError {
    #[error(transparent)]
    Validation(#[from] ValidationFailure),
    #[error("malformed request: {0}")]
    Malformed(String),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

pub type Result<T> = std::result::Result<T, QuoteFlowError>;
