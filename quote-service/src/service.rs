use std::sync::Arc;

use axum::{
    Router,
    extract::{Request, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode},
    middleware::{Next, from_fn, from_fn_with_state},
    response::{Json, Response},
    routing::{get, post},
};
use quote_flow::{
    ChatRequest, ChatResponse, QuoteFlowError, QuoteOrchestrator, QuoteRequest, RequoteRequest,
    RequoteResponse, StartApplicationRequest, UpstreamError,
};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;
use tracing::{Instrument, error, info, warn};
use uuid::Uuid;

use crate::cors::{OriginPolicy, origin_policy};

type ApiResult<T> = Result<Json<T>, ApiError>;
type ApiError = (StatusCode, Json<Value>);

pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<QuoteOrchestrator>,
    pub origin_policy: OriginPolicy,
}

/// `/health` is open; everything under `/api` goes through the origin policy.
pub fn build_router(app_state: AppState) -> Router {
    let api = Router::new()
        .route("/quote", post(get_quote))
        .route("/chat", post(chat))
        .route("/application", post(start_application))
        .route("/requote", post(requote))
        .layer(from_fn_with_state(
            app_state.origin_policy.clone(),
            origin_policy,
        ));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(correlation_id_middleware))
        .with_state(app_state)
}

/// Tags the request with a fresh correlation id and runs it inside a span
/// carrying that id.
async fn correlation_id_middleware(mut request: Request, next: Next) -> Response {
    let correlation_id = Uuid::new_v4().to_string();
    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        request.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    let mut response = next.run(request).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }
    response
}

async fn health_check() -> &'static str {
    "OK"
}

async fn get_quote(
    State(state): State<AppState>,
    payload: Result<Json<QuoteRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = payload.map_err(|e| rejection_error(e, true))?;
    info!(
        face_amount = request.face_amount,
        benefit_period = request.benefit_period,
        "Processing quote request"
    );

    let offer = state
        .orchestrator
        .quote(request)
        .await
        .map_err(|e| api_error(e, true))?;
    Ok(Json(json!({ "flagStatus": true, "value": offer })))
}

async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<ChatResponse> {
    let Json(request) = payload.map_err(|e| rejection_error(e, false))?;
    info!(
        message_length = request.message.len(),
        stage = ?request.context.as_ref().map(|c| c.stage),
        "Processing chat message"
    );

    let response = state
        .orchestrator
        .chat(request)
        .await
        .map_err(|e| api_error(e, false))?;
    Ok(Json(response))
}

async fn start_application(
    State(state): State<AppState>,
    payload: Result<Json<StartApplicationRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = payload.map_err(|e| rejection_error(e, false))?;
    let quote_response_id = request.quote_response_id.clone();
    info!(quote_response_id = ?quote_response_id, "Processing application request");

    let links = state
        .orchestrator
        .start_application(request)
        .await
        .map_err(|e| api_error(e, false))?;
    Ok(Json(json!({
        "quoteResponseId": quote_response_id,
        "applicationLinks": links
    })))
}

async fn requote(
    State(state): State<AppState>,
    payload: Result<Json<RequoteRequest>, JsonRejection>,
) -> ApiResult<RequoteResponse> {
    let Json(request) = payload.map_err(|e| rejection_error(e, true))?;
    info!(original_quote_id = ?request.original_quote_id, "Processing requote request");

    let response = state
        .orchestrator
        .requote(request)
        .await
        .map_err(|e| api_error(e, true))?;
    Ok(Json(response))
}

fn rejection_error(rejection: JsonRejection, quote_flavoured: bool) -> ApiError {
    warn!(error = %rejection.body_text(), "Rejected malformed request body");
    api_error(
        QuoteFlowError::Malformed(rejection.body_text()),
        quote_flavoured,
    )
}

/// Maps a flow error to its HTTP status and JSON body. Quote endpoints also
/// carry `flagStatus: false`, matching the vendor's envelope.
pub fn api_error(err: QuoteFlowError, quote_flavoured: bool) -> ApiError {
    let (status, mut body) = match err {
        QuoteFlowError::Validation(failure) => {
            info!(errors = failure.errors.len(), "Request failed validation");
            (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Validation failed", "details": failure.errors }),
            )
        }
        QuoteFlowError::Malformed(message) => bad_request_error(&message),
        QuoteFlowError::Upstream(UpstreamError::Auth) => {
            error!("Quoting service authentication failed");
            (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "Authentication failed" }),
            )
        }
        QuoteFlowError::Upstream(UpstreamError::NotFound(details)) => {
            warn!(details = %details, "Quoting service resource not found");
            (
                StatusCode::NOT_FOUND,
                json!({ "error": "Quote or application not found" }),
            )
        }
        QuoteFlowError::Upstream(UpstreamError::Rejected(message)) => {
            warn!(message = %message, "Quoting service rejected the request");
            bad_request_error(&message)
        }
        QuoteFlowError::Upstream(UpstreamError::Transport(details)) => {
            error!(details = %details, "Quoting service request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Internal server error" }),
            )
        }
    };

    if quote_flavoured {
        body["flagStatus"] = json!(false);
    }
    (status, Json(body))
}

fn bad_request_error(message: &str) -> (StatusCode, Value) {
    (StatusCode::BAD_REQUEST, json!({ "error": message }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quote_flow::{ValidationError, ValidationFailure};

    #[test]
    fn validation_errors_carry_details() {
        let failure = ValidationFailure {
            errors: vec![ValidationError::new("age", "Age must be between 18 and 60")],
        };
        let (status, Json(body)) = api_error(failure.into(), true);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Validation failed");
        assert_eq!(body["details"][0]["field"], "age");
        assert_eq!(body["flagStatus"], false);
    }

    #[test]
    fn upstream_errors_map_to_statuses() {
        let cases = [
            (UpstreamError::Auth, StatusCode::UNAUTHORIZED),
            (
                UpstreamError::NotFound("gone".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                UpstreamError::Rejected("Face amount too high".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                UpstreamError::Transport("connection reset".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            let (status, Json(body)) = api_error(err.into(), false);
            assert_eq!(status, expected);
            assert!(body.get("flagStatus").is_none());
        }
    }

    #[test]
    fn transport_details_stay_internal() {
        let (_, Json(body)) =
            api_error(UpstreamError::Transport("10.0.0.4 refused".to_string()).into(), false);
        assert!(!body.to_string().contains("10.0.0.4"));
    }

    #[test]
    fn rejected_requests_relay_vendor_message() {
        let (_, Json(body)) =
            api_error(UpstreamError::Rejected("State not supported".to_string()).into(), true);
        assert_eq!(body["error"], "State not supported");
    }
}
