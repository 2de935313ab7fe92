//! Call-data encoding for the score registry's single write method.

use super::address::Address;
use sha3::{Digest, Keccak256};

/// Name of the registry method, reported back to callers.
pub const UPDATE_PLAYER_DATA: &str = "updatePlayerData";

/// Canonical signature hashed into the selector.
pub const UPDATE_PLAYER_DATA_SIGNATURE: &str = "updatePlayerData(address,uint256,uint256)";

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// First four bytes of the keccak hash of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

fn address_word(address: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

fn uint_word(value: u128) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

/// `updatePlayerData(player, scoreAmount, transactionAmount)` call data.
/// Argument order is fixed by the contract.
pub fn encode_update_player_data(player: &Address, score: u128, transaction_count: u64) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 3 * 32);
    data.extend_from_slice(&selector(UPDATE_PLAYER_DATA_SIGNATURE));
    data.extend_from_slice(&address_word(player));
    data.extend_from_slice(&uint_word(score));
    data.extend_from_slice(&uint_word(transaction_count as u128));
    data
}
