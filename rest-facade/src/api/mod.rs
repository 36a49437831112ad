//! # REST API
//!
//! ## Endpoints
//!
//! - `GET /` - Liveness
//! - `POST /setData` - Submit `{p1, p2, value}`
//! - `GET /getData/:key` - Query a key

use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use shared::{
    error::WalletError,
    types::{HealthResponse, QueryResponse, SetDataRequest, SubmitResponse},
};

use crate::AppState;

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let body_limit = state.config.api.max_body_size;

    Router::new()
        .route("/", get(health_check))
        .route("/setData", post(set_data))
        .route("/getData/:key", get(get_data))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// HANDLERS
// =============================================================================

/// Liveness and connection summary
async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        channel: state.connection.channel().to_string(),
        contract: state.connection.contract_name().to_string(),
        version: shared::VERSION.to_string(),
    })
}

/// Submit a transaction
///
/// # Request Body
/// ```json
/// { "p1": "a", "p2": "b", "value": "10" }
/// ```
///
/// # Response
/// ```json
/// { "result": "" }
/// ```
async fn set_data(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SetDataRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    info!(p1 = %request.p1, p2 = %request.p2, "setData request received");

    let args = [request.p1, request.p2, request.value];
    let result = state
        .connection
        .submit_transaction(&state.config.submit_function, &args)
        .await?;

    Ok(Json(SubmitResponse { result }))
}

/// Evaluate a query for `key`
async fn get_data(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<QueryResponse>, ApiError> {
    info!(key = %key, "getData request received");

    let result = state
        .connection
        .evaluate_transaction(&state.config.query_function, std::slice::from_ref(&key))
        .await?;

    Ok(Json(QueryResponse { key, result }))
}

// =============================================================================
// ERROR HANDLING
// =============================================================================

/// API error type
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    BadGateway(String),
    GatewayTimeout(String),
    Internal(String),
}

impl From<WalletError> for ApiError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::InvalidLabel { .. } | WalletError::InvalidIdentity(_) => {
                ApiError::BadRequest(err.to_string())
            }

            WalletError::NotFound(_) => ApiError::NotFound(err.to_string()),

            WalletError::AlreadyExists(_) => ApiError::Conflict(err.to_string()),

            WalletError::Timeout { .. } => ApiError::GatewayTimeout(err.to_string()),

            WalletError::TransactionError(_)
            | WalletError::Network { .. }
            | WalletError::Authentication(_)
            | WalletError::Authorization(_) => ApiError::BadGateway(err.to_string()),

            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::BadGateway(msg) => {
                warn!(error = %msg, "Ledger call failed");
                (StatusCode::BAD_GATEWAY, msg)
            }
            ApiError::GatewayTimeout(msg) => {
                warn!(error = %msg, "Ledger call timed out");
                (StatusCode::GATEWAY_TIMEOUT, msg)
            }
            ApiError::Internal(msg) => {
                error!(error = %msg, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".into())
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
