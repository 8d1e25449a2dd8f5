//! HTTP endpoints
//!
//! REST surface for design sessions. Clarification responses share the 200
//! channel with committed edits; everything else maps one error kind to one
//! status code.

use axum::{
    extract::{Json, Path, State},
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use wireframe_core::WireframeNode;
use wireframe_session::{EditOutcome, EngineError};

use crate::metrics::metrics_handler;
use crate::state::AppState;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(
        &state.config.server.cors_origins,
        state.config.server.cors_enabled,
    );

    Router::new()
        // Session endpoints
        .route("/design-sessions", post(create_session))
        .route("/design-sessions/:id", get(get_session))
        .route("/design-sessions/:id", delete(close_session))
        .route("/design-sessions/:id/edit", post(apply_edit))
        .route("/design-sessions/:id/history", get(get_history))
        .route("/design-sessions/:id/versions/:version", get(get_version))
        .route("/design-sessions/:id/metrics", get(session_metrics))
        // Health check
        .route("/health", get(health_check))
        // Prometheus metrics
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins (NOT FOR PRODUCTION)");
        return CorsLayer::permissive();
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    if parsed_origins.is_empty() {
        tracing::info!("no CORS origins configured, defaulting to localhost:3000");
        return CorsLayer::new()
            .allow_origin(HeaderValue::from_static("http://localhost:3000"))
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers(Any);
    }

    CorsLayer::new()
        .allow_origin(parsed_origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
}

/// Engine error carried to the response layer.
pub struct ApiError(EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            EngineError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            EngineError::Model(_) => StatusCode::BAD_GATEWAY,
            EngineError::InvalidOutput(_) => StatusCode::BAD_REQUEST,
            EngineError::Timeout | EngineError::Cancelled => StatusCode::REQUEST_TIMEOUT,
            EngineError::NotFound => StatusCode::NOT_FOUND,
            EngineError::Conflict => StatusCode::CONFLICT,
            EngineError::Busy => StatusCode::LOCKED,
            EngineError::Gone => StatusCode::GONE,
            EngineError::Quarantined(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct CreateRequest {
    prompt: String,
    user_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateResponse {
    session_id: String,
    wireframe: WireframeNode,
    version: u64,
}

/// Create a design session from an initial prompt.
async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateRequest>,
) -> Result<Json<CreateResponse>, ApiError> {
    let result = state
        .engine
        .create_session(request.user_id, &request.prompt, &CancellationToken::new())
        .await?;

    Ok(Json(CreateResponse {
        session_id: result.session_id,
        wireframe: result.wireframe,
        version: result.version,
    }))
}

#[derive(Debug, Deserialize)]
struct EditRequest {
    edit_prompt: String,
}

/// Apply one edit; an ambiguous edit returns the candidate list instead.
async fn apply_edit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<EditRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let outcome = state
        .engine
        .apply_edit(&id, &request.edit_prompt, &CancellationToken::new())
        .await?;

    let body = match outcome {
        EditOutcome::Applied(result) => json!({
            "session_id": result.session_id,
            "wireframe": result.wireframe,
            "version": result.version,
            "changes_summary": result.changes_summary,
            "processing_ms": result.processing_ms,
        }),
        EditOutcome::NeedsClarification(candidates) => json!({
            "clarification": candidates,
        }),
    };
    Ok(Json(body))
}

/// Session metadata plus the current document.
async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let view = state.engine.get_session(&id).await?;
    Ok(Json(json!({
        "metadata": view.metadata,
        "current_version": view.metadata.current_version,
        "wireframe": view.wireframe,
    })))
}

/// Version history with metadata and change summaries.
async fn get_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let entries = state.engine.get_history(&id).await?;
    Ok(Json(json!({ "versions": entries })))
}

/// Fetch one version. Compacted bodies answer `410 Gone`, with the
/// surviving metadata in the body.
async fn get_version(
    State(state): State<AppState>,
    Path((id, version)): Path<(String, u64)>,
) -> Result<Response, ApiError> {
    let view = state.engine.get_version(&id, version).await?;
    if view.wireframe.is_none() {
        let body = json!({
            "version": view.version,
            "metadata": view.metadata,
            "compacted": true,
        });
        return Ok((StatusCode::GONE, Json(body)).into_response());
    }
    Ok(Json(view).into_response())
}

/// Derived metrics for one session.
async fn session_metrics(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let metrics = state.engine.metrics(&id).await?;
    Ok(Json(json!(metrics)))
}

/// Mark a session completed; the janitor reclaims it at TTL.
async fn close_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.engine.close_session(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Liveness probe.
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (EngineError::Unavailable("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (EngineError::Model("x".into()), StatusCode::BAD_GATEWAY),
            (EngineError::InvalidOutput("x".into()), StatusCode::BAD_REQUEST),
            (EngineError::Timeout, StatusCode::REQUEST_TIMEOUT),
            (EngineError::NotFound, StatusCode::NOT_FOUND),
            (EngineError::Conflict, StatusCode::CONFLICT),
            (EngineError::Busy, StatusCode::LOCKED),
            (EngineError::Gone, StatusCode::GONE),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).status(), status);
        }
    }
}
