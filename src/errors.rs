//! Error taxonomy for the game engine and the score relay
//!
//! Every failure that crosses a module boundary is one of the enums below.
//! Engine rejections never mutate a session; submission errors carry enough
//! context to tell the caller whether a transaction may still be pending.

use crate::games::types::Phase;
use thiserror::Error;

/// Rejections raised by the session engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("player identity is not resolved")]
    AuthRequired,

    #[error("a session is already in progress ({phase})")]
    SessionInProgress { phase: Phase },

    #[error("session is {phase}, expected armed")]
    NotArmed { phase: Phase },

    #[error("a draw is already in flight")]
    SpinInFlight,

    #[error("no draw in flight (session is {phase})")]
    NotResolving { phase: Phase },

    #[error("nothing to cash out yet ({points} points)")]
    NothingToCashOut { points: u128 },

    #[error("score at level {level} cannot grow further; cash out instead")]
    ScoreCeiling { level: u32 },

    #[error("expected {expected} loaded chambers, got {actual}")]
    InvalidDraw { expected: usize, actual: usize },

    #[error("roll {roll} is not a chamber index")]
    RollOutOfRange { roll: u8 },
}

/// Deployment misconfiguration. Fatal for the relay process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("missing required setting: {0}")]
    MissingRequired(&'static str),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("rpc endpoint reports chain id {actual}, configured {expected}")]
    ChainMismatch { expected: u64, actual: u64 },

    #[error("rpc endpoint unusable: {0}")]
    EndpointUnreachable(String),
}

/// Network or contract level failure while submitting a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainSubmissionError {
    #[error("rpc error {code} during {step}: {message}")]
    Rpc {
        step: &'static str,
        code: i64,
        message: String,
    },

    #[error("transport failure during {step}: {message}")]
    Transport {
        step: &'static str,
        message: String,
        dispatched: bool,
    },

    #[error("{step} timed out after {after_ms}ms")]
    Timeout {
        step: &'static str,
        after_ms: u64,
        dispatched: bool,
    },

    #[error("malformed rpc response during {step}: {message}")]
    MalformedResponse { step: &'static str, message: String },

    #[error("submission queue is closed")]
    QueueClosed,

    /// The caller stopped waiting before the transaction was signed.
    #[error("submission abandoned before signing")]
    Abandoned,
}

impl ChainSubmissionError {
    /// True when the transaction may have reached the network and could
    /// still be included. Such failures must not be resubmitted blindly.
    pub fn is_indeterminate(&self) -> bool {
        match self {
            ChainSubmissionError::Transport { dispatched, .. }
            | ChainSubmissionError::Timeout { dispatched, .. } => *dispatched,
            // The node answered the send with an error: it was rejected.
            ChainSubmissionError::Rpc { .. } => false,
            ChainSubmissionError::MalformedResponse { step, .. } => {
                *step == crate::submission::rpc::SEND_STEP
            }
            ChainSubmissionError::QueueClosed | ChainSubmissionError::Abandoned => false,
        }
    }
}

/// Broad status category reported at the service boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCategory {
    Success,
    ClientValidation,
    Server,
}

/// Outcome of a failed `submit` call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Chain(#[from] ChainSubmissionError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl SubmitError {
    pub fn is_indeterminate(&self) -> bool {
        matches!(self, SubmitError::Chain(e) if e.is_indeterminate())
    }

    pub fn status_category(&self) -> StatusCategory {
        match self {
            SubmitError::BadRequest(_) => StatusCategory::ClientValidation,
            SubmitError::Configuration(_) | SubmitError::Chain(_) | SubmitError::Internal(_) => {
                StatusCategory::Server
            }
        }
    }
}

pub type SubmitResult<T> = Result<T, SubmitError>;
