//! Score attestation: custodial signing and on-chain submission
//!
//! A finalized score becomes one `updatePlayerData` call, signed with the
//! relay's key and pushed through a single per-signer queue.

pub mod abi;
pub mod address;
pub mod queue;
pub mod relay_client;
pub mod rpc;
pub mod service;
pub mod signer;
pub mod testing;

pub use address::Address;
pub use relay_client::RelayClient;
pub use rpc::{ChainRpc, HttpChainRpc};
pub use service::{SubmissionService, SubmitRequest};
pub use signer::CustodialKey;
