//! HTTP score sink for players talking to a remote relay.

use crate::errors::{ChainSubmissionError, SubmitError, SubmitResult};
use crate::games::client::ScoreSink;
use crate::games::types::{ScoreSubmission, TransactionResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

pub const SUBMIT_PATH: &str = "/api/submit-onchain";

const RELAY_STEP: &str = "relay";

#[derive(Debug, Deserialize)]
struct RelayReply {
    ok: bool,
    tx: Option<String>,
    error: Option<String>,
}

/// Posts finalized scores to `{base_url}/api/submit-onchain`
#[derive(Debug, Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    submit_url: String,
}

impl RelayClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            submit_url: format!("{}{}", base_url.trim_end_matches('/'), SUBMIT_PATH),
        })
    }

    pub fn submit_url(&self) -> &str {
        &self.submit_url
    }
}

#[async_trait]
impl ScoreSink for RelayClient {
    async fn submit_score(&self, submission: ScoreSubmission) -> SubmitResult<TransactionResult> {
        let response = self
            .http
            .post(&self.submit_url)
            .json(&submission)
            .send()
            .await
            .map_err(|e| ChainSubmissionError::Transport {
                step: RELAY_STEP,
                message: e.to_string(),
                // the relay may have started signing
                dispatched: !e.is_connect(),
            })?;

        let status = response.status();
        let reply: RelayReply = response
            .json()
            .await
            .map_err(|e| ChainSubmissionError::MalformedResponse {
                step: RELAY_STEP,
                message: format!("status {}: {}", status, e),
            })?;

        match (reply.ok, reply.tx) {
            (true, Some(hash)) if !hash.is_empty() => Ok(TransactionResult {
                hash,
                accepted: true,
            }),
            (true, _) => Err(SubmitError::Internal(
                "relay reported success without a transaction".to_string(),
            )),
            (false, _) => {
                let message = reply.error.unwrap_or_else(|| format!("status {}", status));
                if status.is_client_error() {
                    Err(SubmitError::BadRequest(message))
                } else {
                    Err(SubmitError::Internal(message))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_url() {
        let client = RelayClient::new("http://localhost:3000/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.submit_url(), "http://localhost:3000/api/submit-onchain");
    }

    #[tokio::test]
    async fn test_unreachable_relay_is_not_dispatched() {
        let client = RelayClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let player = "0x00000000000000000000000000000000000000aa".parse().unwrap();
        let err = client
            .submit_score(ScoreSubmission::new(player, 100))
            .await
            .unwrap_err();
        match err {
            SubmitError::Chain(chain) => assert!(!chain.is_indeterminate()),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
