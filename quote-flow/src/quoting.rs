use async_trait::async_trait;

use crate::error::UpstreamError;
use crate::model::{ApplicationLinks, QuoteOffer, QuoteRequest, StartApplicationRequest};

/// The third-party quoting vendor. Implementations own their credentials and
/// token lifecycle; a failed call is reported, never silently retried, except
/// for the single refresh-and-retry an implementation does on token rejection.
#[async_trait]
pub trait QuotingService: Send + Sync {
    async fn get_quote(&self, request: &QuoteRequest) -> Result<QuoteOffer, UpstreamError>;

    async fn start_application(
        &self,
        request: &StartApplicationRequest,
    ) -> Result<ApplicationLinks, UpstreamError>;
}
