//! HTTP route handlers.
//!
//! - `GET /health` — current provider readiness, always 200
//! - `POST /admin/revalidate` — token-gated forced revalidation
//! - `POST /evaluate` — run one evaluation (JSON body or multipart form)

use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use tracing::Instrument;

use evalgate_core::{EvaluationResult, HealthSnapshot};

use crate::error::{ApiError, ApiResult};
use crate::monitor;
use crate::pipeline::{self, EvaluationRequest};
use crate::state::AppState;

/// Cap on an inbound request body.
const BODY_LIMIT: usize = 1024 * 1024;

/// Build the API router.
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/admin/revalidate", post(revalidate))
        .route("/evaluate", post(evaluate))
        .with_state(state)
}

#[derive(Serialize)]
struct SuccessEnvelope {
    success: bool,
    data: EvaluationResult,
}

// ─────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────

async fn health(State(state): State<AppState>) -> Json<HealthSnapshot> {
    monitor::ensure_fresh(&state).await;
    Json(state.health.snapshot())
}

async fn revalidate(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let supplied = headers.get("x-admin-token").and_then(|v| v.to_str().ok());
    if !monitor::admin_authorized(&state, supplied) {
        return Err(ApiError::Forbidden);
    }

    monitor::run_validation(&state).await;
    let snap = state.health.snapshot();
    Ok(Json(json!({
        "success": true,
        "last_error": snap.last_error,
        "last_check_at": snap.last_check_at,
    })))
}

async fn evaluate(
    State(state): State<AppState>,
    request: Request,
) -> ApiResult<Json<SuccessEnvelope>> {
    // Callers pass a correlation id; every log line of this request carries it.
    let span = tracing::info_span!(
        "evaluate",
        request_id = %request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
    );

    async move {
        let content_type = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let payload = if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(request, &())
                .await
                .map_err(|e| ApiError::JsonInvalid(format!("invalid multipart body: {e}")))?;
            from_multipart(multipart).await?
        } else {
            let bytes = axum::body::to_bytes(request.into_body(), BODY_LIMIT)
                .await
                .map_err(|e| ApiError::JsonInvalid(format!("could not read request body: {e}")))?;
            serde_json::from_slice::<EvaluationRequest>(&bytes)
                .map_err(|e| ApiError::JsonInvalid(format!("invalid JSON body: {e}")))?
        };

        let result = pipeline::evaluate(&state, payload).await?;
        Ok(Json(SuccessEnvelope {
            success: true,
            data: result,
        }))
    }
    .instrument(span)
    .await
}

/// Collect the known form fields; unknown fields (including file parts from
/// older callers) are drained and ignored.
async fn from_multipart(mut multipart: Multipart) -> Result<EvaluationRequest, ApiError> {
    let mut request = EvaluationRequest::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::JsonInvalid(format!("invalid multipart body: {e}")))?
    {
        let Some(name) = field.name().map(String::from) else {
            continue;
        };
        let value = field
            .text()
            .await
            .map_err(|e| ApiError::JsonInvalid(format!("invalid multipart field: {e}")))?;

        let slot = match name.as_str() {
            "repoUrl" | "repo_url" => &mut request.repo_url,
            "answerText" | "answer_text" => &mut request.answer_text,
            "runStatus" | "run_status" => &mut request.run_status,
            "taskTitle" | "task_title" => &mut request.task_title,
            "taskDescription" | "task_description" => &mut request.task_description,
            "knownIssues" | "known_issues" => &mut request.known_issues,
            _ => continue,
        };
        *slot = Some(value);
    }

    Ok(request)
}
