//! Request Handlers

use super::{errors::ApiError, middleware::RequestId, models::*};
use crate::config::ChainConfig;
use crate::errors::ChainSubmissionError;
use crate::submission::SubmissionService;
use axum::{body::Bytes, extract::State, Extension, Json};
use std::{sync::Arc, time::Duration};

/// Step name reported when the whole request outlives its deadline.
pub const REQUEST_STEP: &str = "request";

/// Shared application state
pub struct AppState {
    pub service: Arc<SubmissionService>,
    pub chain: ChainConfig,
    pub version: String,
    /// Deadline for one submit request, queue wait included.
    pub request_timeout: Duration,
}

/// GET /health
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Running".to_string(),
        signer: state.service.signer().to_hex(),
        chain_id: state.service.chain_id(),
        network: state.chain.name.clone(),
        version: state.version.clone(),
    })
}

/// POST /api/submit-onchain
///
/// The body is taken raw so every malformed payload gets the structured 400.
/// Past the deadline the caller gets a structured 500 marked pending; a job
/// still queued at that point is dropped by the worker before signing.
pub async fn submit_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<SubmitResponse>, ApiError> {
    let outcome = tokio::time::timeout(state.request_timeout, state.service.submit_json(&body))
        .await
        .unwrap_or_else(|_| {
            Err(ChainSubmissionError::Timeout {
                step: REQUEST_STEP,
                after_ms: state.request_timeout.as_millis() as u64,
                dispatched: true,
            }
            .into())
        });
    let (submission, result) = outcome.map_err(|e| ApiError::new(request_id.0.clone(), e))?;

    let explorer_url = state.chain.explorer_tx_url(&result.hash);
    Ok(Json(SubmitResponse::success(
        result.hash,
        submission.score,
        state.service.method(),
        explorer_url,
    )))
}
