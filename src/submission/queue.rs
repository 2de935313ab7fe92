//! Serialized submission worker, one per signing key.
//!
//! Every cash-out funnels through a single task that owns the signer's
//! nonce, so concurrent requests never race for the same sequence number.
//! A failed job is reported and never re-sent by the worker. A job whose
//! caller stopped waiting is dropped unless it was already signed.

use super::{
    abi,
    address::Address,
    rpc::{self, CallRequest, ChainRpc},
    signer::{CustodialKey, LegacyTransaction},
};
use crate::errors::{ChainSubmissionError, SubmitError, SubmitResult};
use crate::games::types::{ScoreSubmission, TransactionResult};
use std::{future::Future, sync::Arc, time::Duration};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// Upper bound on network calls per job: nonce, gas price, estimate, send.
pub const NETWORK_STEPS: u64 = 4;

/// Chain and fee parameters for the worker
#[derive(Debug, Clone)]
pub struct QueueSettings {
    pub chain_id: u64,
    pub contract: Address,
    pub step_timeout: Duration,
    pub capacity: usize,
    pub gas_limit_headroom_percent: u64,
    pub fixed_gas_limit: Option<u64>,
}

struct Job {
    submission: ScoreSubmission,
    reply: oneshot::Sender<SubmitResult<TransactionResult>>,
}

/// Handle to the worker. Cheap to clone; all clones share one nonce sequence.
#[derive(Clone)]
pub struct SubmissionQueue {
    sender: mpsc::Sender<Job>,
    signer: Address,
}

impl SubmissionQueue {
    /// Spawn the worker task on the current tokio runtime.
    pub fn spawn(key: Arc<CustodialKey>, chain: Arc<dyn ChainRpc>, settings: QueueSettings) -> Self {
        let (sender, receiver) = mpsc::channel(settings.capacity.max(1));
        let signer = key.address();
        let worker = SubmissionWorker {
            key,
            chain,
            settings,
            nonce: None,
            receiver,
        };
        tokio::spawn(worker.run());
        Self { sender, signer }
    }

    pub fn signer(&self) -> Address {
        self.signer
    }

    /// Enqueue and wait for the outcome. Dropping this future before the
    /// worker signs the job cancels it; after signing it runs to completion.
    pub async fn submit(&self, submission: ScoreSubmission) -> SubmitResult<TransactionResult> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(Job { submission, reply })
            .await
            .map_err(|_| ChainSubmissionError::QueueClosed)?;
        response
            .await
            .map_err(|_| SubmitError::from(ChainSubmissionError::QueueClosed))?
    }
}

struct SubmissionWorker {
    key: Arc<CustodialKey>,
    chain: Arc<dyn ChainRpc>,
    settings: QueueSettings,
    /// Next nonce to use; `None` forces a resync from the node.
    nonce: Option<u64>,
    receiver: mpsc::Receiver<Job>,
}

impl SubmissionWorker {
    async fn run(mut self) {
        debug!(signer = %self.key.address(), "submission worker started");
        while let Some(job) = self.receiver.recv().await {
            if job.reply.is_closed() {
                warn!(
                    player = %job.submission.player,
                    score = %job.submission.score,
                    "submission abandoned while queued; skipped"
                );
                continue;
            }
            let result = self.process(&job).await;
            if job.reply.send(result).is_err() {
                debug!(player = %job.submission.player, "submitter went away before the result");
            }
        }
        debug!(signer = %self.key.address(), "submission worker stopped");
    }

    async fn process(&mut self, job: &Job) -> SubmitResult<TransactionResult> {
        let submission = &job.submission;
        let timeout = self.settings.step_timeout;
        let signer = self.key.address();

        let nonce = match self.nonce {
            Some(nonce) => nonce,
            None => {
                let nonce = bounded(rpc::NONCE_STEP, false, timeout, self.chain.pending_nonce(signer)).await?;
                debug!(%signer, nonce, "nonce synchronized");
                self.nonce = Some(nonce);
                nonce
            }
        };

        let data = abi::encode_update_player_data(
            &submission.player,
            submission.score,
            submission.transaction_count,
        );
        let gas_price = bounded(rpc::GAS_PRICE_STEP, false, timeout, self.chain.gas_price()).await?;
        let gas_limit = match self.settings.fixed_gas_limit {
            Some(limit) => limit,
            None => {
                let call = CallRequest {
                    from: signer,
                    to: self.settings.contract,
                    data: data.clone(),
                };
                let estimate = bounded(rpc::ESTIMATE_STEP, false, timeout, self.chain.estimate_gas(&call)).await?;
                with_headroom(estimate, self.settings.gas_limit_headroom_percent)
            }
        };

        let tx = LegacyTransaction {
            nonce,
            gas_price,
            gas_limit,
            to: self.settings.contract,
            value: 0,
            data,
        };
        if job.reply.is_closed() {
            warn!(
                player = %submission.player,
                score = %submission.score,
                nonce,
                "submission abandoned before signing; nonce left unused"
            );
            return Err(ChainSubmissionError::Abandoned.into());
        }
        let signed = self
            .key
            .sign_transaction(&tx, self.settings.chain_id)
            .map_err(|e| SubmitError::Internal(e.to_string()))?;

        match bounded(rpc::SEND_STEP, true, timeout, self.chain.send_raw_transaction(&signed.raw)).await {
            Ok(hash) => {
                self.nonce = Some(nonce + 1);
                if !hash.eq_ignore_ascii_case(&signed.hash_hex()) {
                    warn!(node = %hash, local = %signed.hash_hex(), "node reported a different transaction hash");
                }
                info!(
                    player = %submission.player,
                    score = %submission.score,
                    nonce,
                    tx = %hash,
                    "score submitted"
                );
                Ok(TransactionResult {
                    hash,
                    accepted: true,
                })
            }
            Err(e) => {
                // the node's view of our nonce is unknown now
                self.nonce = None;
                if e.is_indeterminate() {
                    error!(
                        player = %submission.player,
                        score = %submission.score,
                        nonce,
                        local_tx = %signed.hash_hex(),
                        error = %e,
                        "submission outcome unknown; transaction may still be pending"
                    );
                } else {
                    warn!(player = %submission.player, nonce, error = %e, "submission rejected");
                }
                Err(e.into())
            }
        }
    }
}

/// Run one network step under the configured timeout.
async fn bounded<T, F>(
    step: &'static str,
    dispatched: bool,
    timeout: Duration,
    call: F,
) -> Result<T, ChainSubmissionError>
where
    F: Future<Output = Result<T, ChainSubmissionError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(ChainSubmissionError::Timeout {
            step,
            after_ms: timeout.as_millis() as u64,
            dispatched,
        }),
    }
}

fn with_headroom(estimate: u64, percent: u64) -> u64 {
    let scaled = (estimate as u128 * percent as u128).div_ceil(100);
    u64::try_from(scaled).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submission::testing::{RecordingChain, SendBehavior};

    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn spawn_queue(chain: &Arc<RecordingChain>) -> SubmissionQueue {
        let key = Arc::new(CustodialKey::from_hex(DEV_KEY).unwrap());
        let settings = QueueSettings {
            chain_id: 10143,
            contract: "0x336cc67C7A141d6d1711830EaDDC2147d3a33191".parse().unwrap(),
            step_timeout: Duration::from_millis(200),
            capacity: 16,
            gas_limit_headroom_percent: 120,
            fixed_gas_limit: None,
        };
        SubmissionQueue::spawn(key, chain.clone(), settings)
    }

    fn submission(score: u128) -> ScoreSubmission {
        ScoreSubmission::new("0x00000000000000000000000000000000000000aa".parse().unwrap(), score)
    }

    #[tokio::test]
    async fn test_abandoned_job_is_never_signed() {
        let chain = Arc::new(RecordingChain::new(10143));
        chain.script_send(SendBehavior::Hang);
        let queue = spawn_queue(&chain);

        let stuck = tokio::spawn({
            let queue = queue.clone();
            async move { queue.submit(submission(100)).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        // gives up while the hanging send still holds the worker
        let gave_up = tokio::time::timeout(Duration::from_millis(50), queue.submit(submission(200))).await;
        assert!(gave_up.is_err());

        let after = queue.submit(submission(300)).await.unwrap();
        assert!(after.accepted);
        assert!(stuck.await.unwrap().unwrap_err().is_indeterminate());

        // the abandoned job never reached estimation, signing or the node
        assert_eq!(chain.sent_nonces(), vec![0, 1]);
        assert_eq!(chain.estimate_calls().len(), 2);
    }

    #[test]
    fn test_with_headroom() {
        assert_eq!(with_headroom(50_000, 120), 60_000);
        assert_eq!(with_headroom(33_333, 100), 33_333);
        assert_eq!(with_headroom(1, 101), 2);
        assert_eq!(with_headroom(u64::MAX, 200), u64::MAX);
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let result: Result<(), _> = bounded(
            rpc::SEND_STEP,
            true,
            Duration::from_millis(20),
            std::future::pending(),
        )
        .await;
        assert_eq!(
            result.unwrap_err(),
            ChainSubmissionError::Timeout {
                step: rpc::SEND_STEP,
                after_ms: 20,
                dispatched: true,
            }
        );
    }
}
