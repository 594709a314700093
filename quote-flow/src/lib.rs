pub mod calculator;
pub mod conversation;
pub mod error;
pub mod extraction;
pub mod model;
pub mod orchestrator;
pub mod quoting;
pub mod rules;
pub mod validator;

// Re-export commonly used types
pub use calculator::{CoverageSuggestion, calculate_dime_coverage, suggest_term_length};
pub use conversation::{ConversationState, RequiredParameter, Stage, next_required_parameter};
pub use error::{QuoteFlowError, Result, UpstreamError, ValidationError, ValidationFailure};
pub use extraction::{ExtractionError, ParameterExtractor};
pub use model::{ApplicationLinks, QuoteOffer, QuoteRequest, StartApplicationRequest};
pub use orchestrator::{ChatRequest, ChatResponse, QuoteOrchestrator, RequoteRequest, RequoteResponse};
pub use quoting::QuotingService;
pub use validator::{validate_quote_request, validate_start_application};
