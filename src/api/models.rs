//! API Response Models

use crate::errors::SubmitError;
use serde::{Deserialize, Serialize};

/// Body of every `POST /api/submit-onchain` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u128>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Contract method that was called
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
    /// Set when the transaction may still be included; do not resubmit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<bool>,
}

impl SubmitResponse {
    pub fn success(tx: String, score: u128, used: &str, explorer_url: Option<String>) -> Self {
        Self {
            ok: true,
            tx: Some(tx),
            score: Some(score),
            error: None,
            used: Some(used.to_string()),
            explorer_url,
            pending: None,
        }
    }

    pub fn failure(error: &SubmitError) -> Self {
        Self {
            ok: false,
            tx: None,
            score: None,
            error: Some(error.to_string()),
            used: None,
            explorer_url: None,
            pending: error.is_indeterminate().then_some(true),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub signer: String,
    pub chain_id: u64,
    pub network: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ChainSubmissionError;

    #[test]
    fn test_failure_omits_success_fields() {
        let json =
            serde_json::to_value(SubmitResponse::failure(&SubmitError::BadRequest("boom".into()))).unwrap();
        assert_eq!(json, serde_json::json!({ "ok": false, "error": "bad request: boom" }));
    }

    #[test]
    fn test_failure_marks_pending_outcome() {
        let timed_out = SubmitError::from(ChainSubmissionError::Timeout {
            step: "request",
            after_ms: 1_000,
            dispatched: true,
        });
        let json = serde_json::to_value(SubmitResponse::failure(&timed_out)).unwrap();
        assert_eq!(json["ok"], false);
        assert_eq!(json["pending"], true);
        assert_eq!(json["error"], "request timed out after 1000ms");
    }
}
