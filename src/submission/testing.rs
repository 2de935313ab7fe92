//! Scripted in-memory chain for tests and offline demos.

use super::{
    abi::keccak256,
    address::Address,
    rpc::{self, CallRequest, ChainRpc},
};
use crate::errors::ChainSubmissionError;
use async_trait::async_trait;
use std::{collections::VecDeque, sync::Mutex};

/// What the next `eth_sendRawTransaction` does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendBehavior {
    Accept,
    Reject { code: i64, message: String },
    /// Never answers; exercises the dispatch timeout.
    Hang,
}

#[derive(Debug)]
struct ChainState {
    pending_nonce: u64,
    gas_price: u128,
    gas_estimate: u64,
    nonce_queries: usize,
    sent: Vec<Vec<u8>>,
    estimates: Vec<CallRequest>,
    scripted_sends: VecDeque<SendBehavior>,
    reachable: bool,
}

/// `ChainRpc` that accepts everything unless told otherwise and records
/// every raw transaction it receives.
#[derive(Debug)]
pub struct RecordingChain {
    chain_id: u64,
    state: Mutex<ChainState>,
}

impl RecordingChain {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            state: Mutex::new(ChainState {
                pending_nonce: 0,
                gas_price: 50_000_000_000,
                gas_estimate: 48_000,
                nonce_queries: 0,
                sent: Vec::new(),
                estimates: Vec::new(),
                scripted_sends: VecDeque::new(),
                reachable: true,
            }),
        }
    }

    pub fn with_pending_nonce(self, nonce: u64) -> Self {
        self.lock().pending_nonce = nonce;
        self
    }

    /// Every call fails with a connect-level transport error.
    pub fn unreachable(self) -> Self {
        self.lock().reachable = false;
        self
    }

    /// Queue the behavior of upcoming sends; unscripted sends are accepted.
    pub fn script_send(&self, behavior: SendBehavior) {
        self.lock().scripted_sends.push_back(behavior);
    }

    pub fn sent_transactions(&self) -> Vec<Vec<u8>> {
        self.lock().sent.clone()
    }

    /// Nonces of accepted transactions, in arrival order.
    pub fn sent_nonces(&self) -> Vec<u64> {
        self.lock()
            .sent
            .iter()
            .filter_map(|raw| rlp::Rlp::new(raw).val_at::<u64>(0).ok())
            .collect()
    }

    pub fn estimate_calls(&self) -> Vec<CallRequest> {
        self.lock().estimates.clone()
    }

    pub fn nonce_queries(&self) -> usize {
        self.lock().nonce_queries
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_reachable(&self, step: &'static str) -> Result<(), ChainSubmissionError> {
        if self.lock().reachable {
            Ok(())
        } else {
            Err(ChainSubmissionError::Transport {
                step,
                message: "connection refused".to_string(),
                dispatched: false,
            })
        }
    }
}

#[async_trait]
impl ChainRpc for RecordingChain {
    async fn chain_id(&self) -> Result<u64, ChainSubmissionError> {
        self.check_reachable(rpc::CHAIN_ID_STEP)?;
        Ok(self.chain_id)
    }

    async fn pending_nonce(&self, _account: Address) -> Result<u64, ChainSubmissionError> {
        self.check_reachable(rpc::NONCE_STEP)?;
        let mut state = self.lock();
        state.nonce_queries += 1;
        Ok(state.pending_nonce)
    }

    async fn gas_price(&self) -> Result<u128, ChainSubmissionError> {
        self.check_reachable(rpc::GAS_PRICE_STEP)?;
        Ok(self.lock().gas_price)
    }

    async fn estimate_gas(&self, call: &CallRequest) -> Result<u64, ChainSubmissionError> {
        self.check_reachable(rpc::ESTIMATE_STEP)?;
        let mut state = self.lock();
        state.estimates.push(call.clone());
        Ok(state.gas_estimate)
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<String, ChainSubmissionError> {
        self.check_reachable(rpc::SEND_STEP)?;
        let behavior = self
            .lock()
            .scripted_sends
            .pop_front()
            .unwrap_or(SendBehavior::Accept);
        match behavior {
            SendBehavior::Accept => {
                let mut state = self.lock();
                state.pending_nonce += 1;
                state.sent.push(raw.to_vec());
                Ok(format!("0x{}", hex::encode(keccak256(raw))))
            }
            SendBehavior::Reject { code, message } => Err(ChainSubmissionError::Rpc {
                step: rpc::SEND_STEP,
                code,
                message,
            }),
            SendBehavior::Hang => {
                // the node "received" it: the nonce is consumed
                {
                    let mut state = self.lock();
                    state.pending_nonce += 1;
                    state.sent.push(raw.to_vec());
                }
                std::future::pending::<Result<String, ChainSubmissionError>>().await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rlp::RlpStream;

    #[tokio::test]
    async fn test_sent_nonces_reads_long_lists() {
        let chain = RecordingChain::new(1);
        let mut stream = RlpStream::new_list(2);
        stream.append(&300u64);
        stream.append(&vec![7u8; 70]);
        chain.send_raw_transaction(&stream.out()).await.unwrap();

        // not a list: recorded but has no nonce
        chain.send_raw_transaction(&[0x83, 1, 2, 3]).await.unwrap();

        assert_eq!(chain.sent_transactions().len(), 2);
        assert_eq!(chain.sent_nonces(), vec![300]);
    }

    #[tokio::test]
    async fn test_scripted_sends() {
        let chain = RecordingChain::new(1).with_pending_nonce(4);
        chain.script_send(SendBehavior::Reject {
            code: -32000,
            message: "nonce too low".to_string(),
        });

        assert!(chain.send_raw_transaction(&[0xc1, 0x05]).await.is_err());
        assert_eq!(chain.pending_nonce(Address::ZERO).await.unwrap(), 4);

        let hash = chain.send_raw_transaction(&[0xc1, 0x05]).await.unwrap();
        assert_eq!(hash.len(), 66);
        assert_eq!(chain.sent_nonces(), vec![5]);
        assert_eq!(chain.pending_nonce(Address::ZERO).await.unwrap(), 5);
        assert_eq!(chain.nonce_queries(), 2);
    }
}
