//! Chain access over JSON-RPC.
//!
//! `ChainRpc` is the seam between the submission queue and the network; the
//! HTTP implementation below speaks the standard Ethereum JSON-RPC methods.

use super::address::Address;
use crate::errors::ChainSubmissionError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

pub const CHAIN_ID_STEP: &str = "eth_chainId";
pub const NONCE_STEP: &str = "eth_getTransactionCount";
pub const GAS_PRICE_STEP: &str = "eth_gasPrice";
pub const ESTIMATE_STEP: &str = "eth_estimateGas";
pub const SEND_STEP: &str = "eth_sendRawTransaction";

/// Call used for gas estimation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub from: Address,
    pub to: Address,
    pub data: Vec<u8>,
}

/// Network operations needed to land one signed transaction.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    async fn chain_id(&self) -> Result<u64, ChainSubmissionError>;

    /// Next nonce for `account`, counting transactions still in the mempool.
    async fn pending_nonce(&self, account: Address) -> Result<u64, ChainSubmissionError>;

    async fn gas_price(&self) -> Result<u128, ChainSubmissionError>;

    async fn estimate_gas(&self, call: &CallRequest) -> Result<u64, ChainSubmissionError>;

    /// Broadcast a signed transaction; returns the node's transaction hash.
    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<String, ChainSubmissionError>;
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorBody {
    code: i64,
    message: String,
}

/// JSON-RPC 2.0 client over HTTP
pub struct HttpChainRpc {
    http: reqwest::Client,
    endpoint: String,
    next_id: AtomicU64,
    timeout_ms: u64,
}

impl HttpChainRpc {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            next_id: AtomicU64::new(1),
            timeout_ms: timeout.as_millis() as u64,
        })
    }

    async fn call(&self, method: &'static str, params: Value) -> Result<Value, ChainSubmissionError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        debug!(method, id = request.id, "rpc call");

        let dispatched = method == SEND_STEP;
        let response = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(method, e, dispatched, self.timeout_ms))?;

        let body: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| transport_error(method, e, dispatched, self.timeout_ms))?;

        if let Some(error) = body.error {
            return Err(ChainSubmissionError::Rpc {
                step: method,
                code: error.code,
                message: error.message,
            });
        }
        body.result.ok_or(ChainSubmissionError::MalformedResponse {
            step: method,
            message: "response has neither result nor error".to_string(),
        })
    }
}

fn transport_error(
    step: &'static str,
    e: reqwest::Error,
    dispatched: bool,
    timeout_ms: u64,
) -> ChainSubmissionError {
    if e.is_timeout() {
        ChainSubmissionError::Timeout {
            step,
            after_ms: timeout_ms,
            dispatched,
        }
    } else {
        ChainSubmissionError::Transport {
            step,
            message: e.to_string(),
            // a connect failure means nothing left this process
            dispatched: dispatched && !e.is_connect(),
        }
    }
}

/// Parse a `0x`-prefixed hex quantity.
pub fn parse_quantity(step: &'static str, value: &Value) -> Result<u128, ChainSubmissionError> {
    let malformed = |message: String| ChainSubmissionError::MalformedResponse { step, message };
    let text = value
        .as_str()
        .ok_or_else(|| malformed(format!("expected hex string, got {}", value)))?;
    let digits = text
        .strip_prefix("0x")
        .ok_or_else(|| malformed(format!("quantity without 0x prefix: {}", text)))?;
    if digits.is_empty() {
        return Err(malformed("empty quantity".to_string()));
    }
    u128::from_str_radix(digits, 16).map_err(|e| malformed(format!("{}: {}", text, e)))
}

fn narrow(step: &'static str, value: u128) -> Result<u64, ChainSubmissionError> {
    u64::try_from(value).map_err(|_| ChainSubmissionError::MalformedResponse {
        step,
        message: format!("quantity {} exceeds 64 bits", value),
    })
}

fn hex_data(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

#[async_trait]
impl ChainRpc for HttpChainRpc {
    async fn chain_id(&self) -> Result<u64, ChainSubmissionError> {
        let value = self.call(CHAIN_ID_STEP, json!([])).await?;
        narrow(CHAIN_ID_STEP, parse_quantity(CHAIN_ID_STEP, &value)?)
    }

    async fn pending_nonce(&self, account: Address) -> Result<u64, ChainSubmissionError> {
        let value = self
            .call(NONCE_STEP, json!([account.to_hex(), "pending"]))
            .await?;
        narrow(NONCE_STEP, parse_quantity(NONCE_STEP, &value)?)
    }

    async fn gas_price(&self) -> Result<u128, ChainSubmissionError> {
        let value = self.call(GAS_PRICE_STEP, json!([])).await?;
        parse_quantity(GAS_PRICE_STEP, &value)
    }

    async fn estimate_gas(&self, call: &CallRequest) -> Result<u64, ChainSubmissionError> {
        let params = json!([{
            "from": call.from.to_hex(),
            "to": call.to.to_hex(),
            "data": hex_data(&call.data),
        }]);
        let value = self.call(ESTIMATE_STEP, params).await?;
        narrow(ESTIMATE_STEP, parse_quantity(ESTIMATE_STEP, &value)?)
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<String, ChainSubmissionError> {
        let value = self.call(SEND_STEP, json!([hex_data(raw)])).await?;
        match value.as_str() {
            Some(hash) if hash.starts_with("0x") && hash.len() == 66 => Ok(hash.to_string()),
            _ => Err(ChainSubmissionError::MalformedResponse {
                step: SEND_STEP,
                message: format!("unexpected transaction hash {}", value),
            }),
        }
    }
}
