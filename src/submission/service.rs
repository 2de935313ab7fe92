//! Score attestation service
//!
//! Validates a submission, then hands it to the signer's queue. The service
//! is constructed once at startup; a missing key, endpoint or contract is a
//! configuration error and no service exists without them.

use super::{
    abi::UPDATE_PLAYER_DATA,
    address::Address,
    queue::{QueueSettings, SubmissionQueue},
    rpc::{ChainRpc, HttpChainRpc},
    signer::CustodialKey,
};
use crate::config::{Credentials, RelayConfig};
use crate::errors::{ConfigurationError, SubmitError, SubmitResult};
use crate::games::client::ScoreSink;
use crate::games::types::{ScoreSubmission, TransactionResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Wire form of a submission request. `txCount` is the legacy field name.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub player: String,
    pub score: u128,
    #[serde(default, alias = "txCount")]
    pub transaction_count: Option<u64>,
}

impl SubmitRequest {
    /// Parse a raw request body. Every failure is a `BadRequest`.
    pub fn from_json(body: &[u8]) -> SubmitResult<Self> {
        serde_json::from_slice(body)
            .map_err(|e| SubmitError::BadRequest(format!("bad payload: need {{ player, score }}: {}", e)))
    }

    /// Check the fields and produce the submission to sign.
    pub fn validate(&self) -> SubmitResult<ScoreSubmission> {
        let player: Address = self
            .player
            .parse()
            .map_err(|e| SubmitError::BadRequest(format!("invalid player address: {}", e)))?;
        let transaction_count = self.transaction_count.unwrap_or(1);
        if transaction_count == 0 {
            return Err(SubmitError::BadRequest(
                "transactionCount must be at least 1".to_string(),
            ));
        }
        Ok(ScoreSubmission {
            player,
            score: self.score,
            transaction_count,
        })
    }
}

/// Signs and submits finalized scores to the registry contract
#[derive(Clone)]
pub struct SubmissionService {
    queue: SubmissionQueue,
    chain_id: u64,
    contract: Address,
}

impl std::fmt::Debug for SubmissionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionService")
            .field("signer", &self.queue.signer())
            .field("chain_id", &self.chain_id)
            .field("contract", &self.contract)
            .finish()
    }
}

impl SubmissionService {
    /// Build against the JSON-RPC endpoint named in `credentials`.
    pub async fn connect(config: &RelayConfig, credentials: Credentials) -> Result<Self, ConfigurationError> {
        let chain = HttpChainRpc::new(credentials.rpc_url.clone(), config.submission.timeout())
            .map_err(|e| ConfigurationError::EndpointUnreachable(e.to_string()))?;
        Self::with_chain(config, credentials, Arc::new(chain)).await
    }

    /// Build with an explicit chain backend.
    pub async fn with_chain(
        config: &RelayConfig,
        credentials: Credentials,
        chain: Arc<dyn ChainRpc>,
    ) -> Result<Self, ConfigurationError> {
        config.validate_settings()?;
        let expected = config.chain.chain_id;

        let actual = tokio::time::timeout(config.submission.timeout(), chain.chain_id())
            .await
            .map_err(|_| ConfigurationError::EndpointUnreachable("eth_chainId timed out".to_string()))?
            .map_err(|e| ConfigurationError::EndpointUnreachable(e.to_string()))?;
        if actual != expected {
            return Err(ConfigurationError::ChainMismatch { expected, actual });
        }

        let settings = QueueSettings {
            chain_id: expected,
            contract: credentials.contract,
            step_timeout: config.submission.timeout(),
            capacity: config.submission.queue_capacity,
            gas_limit_headroom_percent: config.submission.gas_limit_headroom_percent,
            fixed_gas_limit: config.submission.gas_limit,
        };
        Ok(Self::from_parts(Arc::new(credentials.key), chain, settings))
    }

    /// Assemble from already-validated parts.
    pub fn from_parts(key: Arc<CustodialKey>, chain: Arc<dyn ChainRpc>, settings: QueueSettings) -> Self {
        let chain_id = settings.chain_id;
        let contract = settings.contract;
        let queue = SubmissionQueue::spawn(key, chain, settings);
        info!(
            signer = %queue.signer(),
            chain_id,
            contract = %contract,
            "submission service ready"
        );
        Self {
            queue,
            chain_id,
            contract,
        }
    }

    pub fn signer(&self) -> Address {
        self.queue.signer()
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    /// Contract method every submission calls.
    pub fn method(&self) -> &'static str {
        UPDATE_PLAYER_DATA
    }

    /// Sign and submit `updatePlayerData(player, score, transaction_count)`.
    ///
    /// Identical submissions are not de-duplicated: each call produces its
    /// own transaction.
    pub async fn submit(
        &self,
        player: Address,
        score: u128,
        transaction_count: u64,
    ) -> SubmitResult<TransactionResult> {
        if transaction_count == 0 {
            return Err(SubmitError::BadRequest(
                "transactionCount must be at least 1".to_string(),
            ));
        }
        self.queue
            .submit(ScoreSubmission {
                player,
                score,
                transaction_count,
            })
            .await
    }

    /// Validate a raw request body and submit it.
    pub async fn submit_json(&self, body: &[u8]) -> SubmitResult<(ScoreSubmission, TransactionResult)> {
        let submission = SubmitRequest::from_json(body)?.validate()?;
        let result = self
            .submit(submission.player, submission.score, submission.transaction_count)
            .await
            .inspect_err(|e| warn!(player = %submission.player, error = %e, "submission failed"))?;
        Ok((submission, result))
    }
}

#[async_trait]
impl ScoreSink for SubmissionService {
    async fn submit_score(&self, submission: ScoreSubmission) -> SubmitResult<TransactionResult> {
        self.submit(submission.player, submission.score, submission.transaction_count)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_parsing() {
        let request =
            SubmitRequest::from_json(br#"{"player":"0x00000000000000000000000000000000000000aa","score":1000}"#)
                .unwrap();
        let submission = request.validate().unwrap();
        assert_eq!(submission.score, 1000);
        assert_eq!(submission.transaction_count, 1);

        let legacy = SubmitRequest::from_json(
            br#"{"player":"0x00000000000000000000000000000000000000aa","score":5,"txCount":3}"#,
        )
        .unwrap();
        assert_eq!(legacy.validate().unwrap().transaction_count, 3);
    }

    #[test]
    fn test_request_rejections() {
        let bad = [
            &br#"{"score":1000}"#[..],
            br#"{"player":"0x00000000000000000000000000000000000000aa","score":"1000"}"#,
            br#"{"player":"0x00000000000000000000000000000000000000aa","score":-5}"#,
            br#"{"player":"0x00000000000000000000000000000000000000aa","score":1.5}"#,
            br#"not json"#,
        ];
        for body in bad {
            assert!(matches!(
                SubmitRequest::from_json(body),
                Err(SubmitError::BadRequest(_))
            ));
        }

        let bad_player = SubmitRequest::from_json(br#"{"player":"0xABC","score":1}"#).unwrap();
        assert!(matches!(bad_player.validate(), Err(SubmitError::BadRequest(_))));

        let zero_count = SubmitRequest::from_json(
            br#"{"player":"0x00000000000000000000000000000000000000aa","score":1,"transactionCount":0}"#,
        )
        .unwrap();
        assert!(matches!(zero_count.validate(), Err(SubmitError::BadRequest(_))));
    }
}
