//! Game flow through `GameClient`: engine rules plus the one-submission-per-session handoff.

mod common;

use async_trait::async_trait;
use common::{service_on, PLAYER};
use russian_spin::games::{
    FixedSequence, GameClient, Phase, ScoreSink, ScoreSubmission, StaticIdentity, TransactionResult,
};
use russian_spin::submission::testing::RecordingChain;
use russian_spin::{Address, SessionError, SubmitResult};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct CountingSink {
    received: Mutex<Vec<ScoreSubmission>>,
}

impl CountingSink {
    fn received(&self) -> Vec<ScoreSubmission> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScoreSink for CountingSink {
    async fn submit_score(&self, submission: ScoreSubmission) -> SubmitResult<TransactionResult> {
        self.received.lock().unwrap().push(submission);
        Ok(TransactionResult {
            hash: format!("0x{:064x}", self.received.lock().unwrap().len()),
            accepted: true,
        })
    }
}

fn player() -> Address {
    PLAYER.parse().unwrap()
}

fn client_with(draws: &[u8], sink: Arc<CountingSink>) -> GameClient<FixedSequence, Arc<CountingSink>> {
    GameClient::new(
        FixedSequence::new(draws.to_vec()),
        Arc::new(StaticIdentity::confirmed(player())),
        sink,
    )
}

#[tokio::test]
async fn test_survive_then_die() {
    let sink = Arc::new(CountingSink::default());
    let mut client = client_with(&[0, 3, 1, 2, 2], sink.clone());

    let session = client.start().unwrap();
    assert_eq!((session.level, session.points, session.bullet_positions.len()), (1, 10, 1));

    let session = client.spin().unwrap();
    assert_eq!((session.level, session.points, session.bullet_positions.len()), (2, 100, 2));

    let session = client.spin().unwrap();
    assert_eq!(session.phase, Phase::Dead);
    assert_eq!(session.points, 0);

    assert!(matches!(client.spin(), Err(SessionError::NotArmed { phase: Phase::Dead })));
    assert!(client.cash_out().await.is_err());
    assert!(sink.received().is_empty());

    // a dead session only accepts a fresh start
    let session = client.start().unwrap();
    assert_eq!(session.phase, Phase::Armed);
    assert_eq!(session.points, 10);
}

#[tokio::test]
async fn test_cash_out_emits_exactly_one_submission() {
    let sink = Arc::new(CountingSink::default());
    let mut client = client_with(&[0, 1, 2, 3, 4, 5, 0, 1], sink.clone());

    client.start().unwrap();
    client.spin().unwrap();
    let session = client.spin().unwrap();
    assert_eq!(session.points, 1_000);
    assert_eq!(session.bullet_positions.len(), 3);

    let receipt = client.cash_out().await.unwrap();
    assert_eq!(
        receipt.submission,
        ScoreSubmission {
            player: player(),
            score: 1_000,
            transaction_count: 1,
        }
    );
    assert!(receipt.result.unwrap().accepted);
    assert_eq!(client.session().phase, Phase::CashedOut);

    assert!(matches!(
        client.cash_out().await,
        Err(SessionError::NotArmed { phase: Phase::CashedOut })
    ));
    assert_eq!(sink.received().len(), 1);
}

#[tokio::test]
async fn test_cash_out_at_starting_points_is_a_no_op() {
    let sink = Arc::new(CountingSink::default());
    let mut client = client_with(&[4], sink.clone());

    let before = client.start().unwrap();
    assert_eq!(
        client.cash_out().await,
        Err(SessionError::NothingToCashOut { points: 10 })
    );
    assert_eq!(client.session(), before);
    assert!(sink.received().is_empty());
}

#[tokio::test]
async fn test_unconfirmed_player_cannot_start() {
    let sink = Arc::new(CountingSink::default());
    let mut client = GameClient::new(
        FixedSequence::new([0]),
        Arc::new(StaticIdentity::unconfirmed(player())),
        sink,
    );
    assert_eq!(client.start(), Err(SessionError::AuthRequired));
    assert_eq!(client.session().phase, Phase::Idle);
}

#[tokio::test]
async fn test_cash_out_through_the_relay_service() {
    let chain = Arc::new(RecordingChain::new(10143));
    let service = Arc::new(service_on(&chain).await);
    let mut client = GameClient::new(
        FixedSequence::new([0, 1, 2, 3]),
        Arc::new(StaticIdentity::confirmed(player())),
        service,
    );

    client.start().unwrap();
    client.spin().unwrap();
    let receipt = client.cash_out().await.unwrap();

    let tx = receipt.result.unwrap();
    assert!(tx.accepted);
    assert_eq!(tx.hash.len(), 66);
    assert_eq!(chain.sent_transactions().len(), 1);
}
