//! Score relay HTTP API
//!
//! `POST /api/submit-onchain` accepts a finalized score and returns the
//! transaction hash; `GET /health` reports the signer and chain.

pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;

pub use server::{create_app, ApiServer};
