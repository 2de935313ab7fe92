pub mod client;
pub mod identity;
pub mod randomness;
pub mod session;
pub mod types;

pub use client::{CashOutReceipt, GameClient, ScoreSink};
pub use identity::{IdentityResolver, StaticIdentity};
pub use randomness::{FixedSequence, OsRandomness, RandomnessSource};
pub use session::{SessionEngine, Transition};
pub use types::*;
