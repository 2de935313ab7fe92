//! Player-side game context
//!
//! Combines identity, one session engine and a score sink. The engine decides
//! whether a cash-out happened; the sink is awaited only when it did.

use crate::errors::{SessionError, SubmitResult};
use crate::games::{
    identity::IdentityResolver,
    randomness::RandomnessSource,
    session::SessionEngine,
    types::{ScoreSubmission, Session, TransactionResult},
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Destination for finalized scores
#[async_trait]
pub trait ScoreSink: Send + Sync {
    async fn submit_score(&self, submission: ScoreSubmission) -> SubmitResult<TransactionResult>;
}

#[async_trait]
impl<T: ScoreSink + ?Sized> ScoreSink for Arc<T> {
    async fn submit_score(&self, submission: ScoreSubmission) -> SubmitResult<TransactionResult> {
        (**self).submit_score(submission).await
    }
}

/// Outcome of a cash-out. The session is `CashedOut` whatever `result` says.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CashOutReceipt {
    pub submission: ScoreSubmission,
    pub result: SubmitResult<TransactionResult>,
}

pub struct GameClient<R, S> {
    engine: SessionEngine<R>,
    identity: Arc<dyn IdentityResolver>,
    sink: S,
}

impl<R: RandomnessSource, S: ScoreSink> GameClient<R, S> {
    pub fn new(randomness: R, identity: Arc<dyn IdentityResolver>, sink: S) -> Self {
        Self {
            engine: SessionEngine::new(randomness),
            identity,
            sink,
        }
    }

    pub fn session(&self) -> Session {
        self.engine.session()
    }

    pub fn start(&mut self) -> Result<Session, SessionError> {
        let identity = self.identity.resolve();
        self.engine.start(identity.as_ref())
    }

    pub fn spin(&mut self) -> Result<Session, SessionError> {
        self.engine.spin()
    }

    /// Cash out and submit. A rejected cash-out never reaches the sink.
    pub async fn cash_out(&mut self) -> Result<CashOutReceipt, SessionError> {
        let submission = self.engine.cash_out()?;
        let result = self.sink.submit_score(submission).await;
        match &result {
            Ok(tx) => info!(player = %submission.player, score = %submission.score, tx = %tx.hash, "score recorded"),
            Err(e) => warn!(player = %submission.player, score = %submission.score, error = %e, "score submission failed"),
        }
        Ok(CashOutReceipt { submission, result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ChainSubmissionError, SubmitError};
    use crate::games::{identity::StaticIdentity, randomness::FixedSequence, types::Phase};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FailingSink {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ScoreSink for FailingSink {
        async fn submit_score(&self, _submission: ScoreSubmission) -> SubmitResult<TransactionResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(SubmitError::Chain(ChainSubmissionError::QueueClosed))
        }
    }

    #[tokio::test]
    async fn test_failed_submission_keeps_session_cashed_out() {
        let sink = Arc::new(FailingSink::default());
        let player = "0x00000000000000000000000000000000000000aa".parse().unwrap();
        let mut client = GameClient::new(
            FixedSequence::new([0, 1, 2, 3]),
            Arc::new(StaticIdentity::confirmed(player)),
            sink.clone(),
        );

        client.start().unwrap();
        client.spin().unwrap();
        let receipt = client.cash_out().await.unwrap();

        assert!(receipt.result.is_err());
        assert_eq!(receipt.submission.score, 100);
        assert_eq!(client.session().phase, Phase::CashedOut);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unresolved_identity_cannot_start() {
        let sink = Arc::new(FailingSink::default());
        let mut client = GameClient::new(
            FixedSequence::new([0]),
            Arc::new(StaticIdentity::anonymous()),
            sink.clone(),
        );
        assert_eq!(client.start(), Err(SessionError::AuthRequired));
        assert!(client.cash_out().await.is_err());
        assert_eq!(sink.calls.load(Ordering::SeqCst), 0);
    }
}
