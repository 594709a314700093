//! InstaBrain term-quote API client.
//!
//! Every call carries a bearer JWT obtained from the auth endpoint. The token
//! is cached for its lifetime and shared by all requests; a 401 invalidates it
//! and the call is retried once with a fresh token.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use quote_flow::error::UpstreamError;
use quote_flow::model::{ApplicationLinks, QuoteOffer, QuoteRequest, StartApplicationRequest};
use quote_flow::quoting::QuotingService;
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

pub const AUTH_PATH: &str = "/quickquoterv2/auth";
pub const QUOTE_PATH: &str = "/thirdpartyibtermquote/get";
pub const START_APPLICATION_PATH: &str = "/thirdpartyibtermstartapp/start-application";

const TOKEN_LIFETIME: Duration = Duration::from_secs(30 * 60);
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Response wrapper used by every vendor endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<T> {
    #[serde(default)]
    flag_status: bool,
    value: Option<T>,
    #[serde(default)]
    error: Option<Value>,
}

impl<T> Envelope<T> {
    fn error_message(&self) -> Option<String> {
        match self.error.as_ref()? {
            Value::Null => None,
            Value::String(message) if message.trim().is_empty() => None,
            Value::String(message) => Some(message.clone()),
            other => other
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| Some(other.to_string())),
        }
    }

    /// The payload, or `Rejected` when the vendor flagged a failure.
    fn into_value(self, fallback: &str) -> Result<T, UpstreamError> {
        let message = self.error_message();
        match (self.flag_status, message, self.value) {
            (true, None, Some(value)) => Ok(value),
            (_, Some(message), _) => Err(UpstreamError::Rejected(message)),
            _ => Err(UpstreamError::Rejected(fallback.to_string())),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthRequest<'a> {
    user_id: &'a str,
    access_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthValue {
    jwt_token: String,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self, now: Instant) -> bool {
        self.expires_at > now + TOKEN_REFRESH_MARGIN
    }
}

pub struct InstaBrainClient {
    http: reqwest::Client,
    base_url: String,
    user_id: String,
    access_token: String,
    token: Mutex<Option<CachedToken>>,
}

impl InstaBrainClient {
    pub fn new(
        base_url: impl Into<String>,
        user_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_id: user_id.into(),
            access_token: access_token.into(),
            token: Mutex::new(None),
        }
    }

    /// Returns the cached token, authenticating first when it is missing or
    /// about to expire. The lock is held across authentication so concurrent
    /// callers share one refresh.
    async fn bearer_token(&self) -> Result<String, UpstreamError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Instant::now())) {
            return Ok(token.token.clone());
        }

        let token = self.authenticate().await?;
        *cached = Some(CachedToken {
            token: token.clone(),
            expires_at: Instant::now() + TOKEN_LIFETIME,
        });
        Ok(token)
    }

    /// Drops the cached token only if it is the one that was rejected, so a
    /// token refreshed by a concurrent request survives.
    async fn invalidate_token(&self, rejected: &str) {
        let mut cached = self.token.lock().await;
        if cached.as_ref().is_some_and(|t| t.token == rejected) {
            cached.take();
        }
    }

    async fn authenticate(&self) -> Result<String, UpstreamError> {
        debug!(url = %self.url(AUTH_PATH), "Authenticating with quoting service");
        let response = self
            .http
            .post(self.url(AUTH_PATH))
            .json(&AuthRequest {
                user_id: &self.user_id,
                access_token: &self.access_token,
            })
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            warn!(status = %status, "Quoting service rejected credentials");
            return Err(UpstreamError::Auth);
        }
        if !status.is_success() {
            return Err(UpstreamError::Transport(format!(
                "authentication returned {status}"
            )));
        }

        let envelope: Envelope<AuthValue> = response.json().await.map_err(transport_error)?;
        match envelope.into_value("authentication was not accepted") {
            Ok(AuthValue { jwt_token }) if !jwt_token.is_empty() => {
                info!("Obtained quoting service token");
                Ok(jwt_token)
            }
            _ => {
                warn!("Quoting service did not issue a token");
                Err(UpstreamError::Auth)
            }
        }
    }

    async fn post_with_token<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        token: &str,
    ) -> Result<Response, UpstreamError> {
        self.http
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(transport_error)
    }

    /// POSTs `body` with a bearer token and unwraps the vendor envelope.
    async fn send_authorized<B, T>(&self, path: &str, body: &B) -> Result<T, UpstreamError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let token = self.bearer_token().await?;
        let mut response = self.post_with_token(path, body, &token).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!(path, "Token rejected, refreshing and retrying once");
            self.invalidate_token(&token).await;
            let token = self.bearer_token().await?;
            response = self.post_with_token(path, body, &token).await?;
            if response.status() == StatusCode::UNAUTHORIZED {
                error!(path, "Token rejected after refresh");
                return Err(UpstreamError::Auth);
            }
        }

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(UpstreamError::NotFound(format!("{path} returned 404")));
        }
        if !status.is_success() {
            error!(path, status = %status, "Quoting service request failed");
            return Err(UpstreamError::Transport(format!("{path} returned {status}")));
        }

        let envelope: Envelope<T> = response.json().await.map_err(transport_error)?;
        envelope.into_value("request was not accepted by the quoting service")
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn transport_error(err: reqwest::Error) -> UpstreamError {
    UpstreamError::Transport(err.to_string())
}

#[async_trait]
impl QuotingService for InstaBrainClient {
    async fn get_quote(&self, request: &QuoteRequest) -> Result<QuoteOffer, UpstreamError> {
        self.send_authorized(QUOTE_PATH, request).await
    }

    async fn start_application(
        &self,
        request: &StartApplicationRequest,
    ) -> Result<ApplicationLinks, UpstreamError> {
        self.send_authorized(START_APPLICATION_PATH, request).await
    }
}
