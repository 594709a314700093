pub mod config;
pub mod cors;
pub mod llm;
pub mod service;
pub mod upstream;

pub use config::ServiceConfig;
pub use cors::OriginPolicy;
pub use llm::OpenRouterExtractor;
pub use service::{AppState, build_router};
pub use upstream::InstaBrainClient;
