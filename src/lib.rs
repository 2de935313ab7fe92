//! Russian Spin - short-session risk game with on-chain score attestation
//!
//! The game side (`games`) is a pure state machine over an injected
//! randomness source. The relay side (`submission`, `api`) signs finalized
//! scores with a custodial key and submits them to a registry contract.

pub mod api;
pub mod config;
pub mod errors;
pub mod games;
pub mod submission;

pub use config::{ConfigLoader, RelayConfig};
pub use errors::{ChainSubmissionError, ConfigurationError, SessionError, SubmitError, SubmitResult};
pub use games::{GameClient, Phase, ScoreSink, ScoreSubmission, Session, SessionEngine, TransactionResult};
pub use submission::{Address, SubmissionService};
