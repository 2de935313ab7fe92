//! Custodial signing key and legacy (EIP-155) transaction signing.
//!
//! The key is parsed once at startup. Its secret bytes never leave this
//! module: `Debug` shows only the derived address and the parse buffer is
//! zeroized.

use super::{abi::keccak256, address::Address};
use k256::ecdsa::SigningKey;
use rlp::RlpStream;
use std::fmt;
use zeroize::Zeroizing;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("private key is empty")]
    Empty,
    #[error("private key must be 32 bytes of hex")]
    Malformed,
    #[error("private key is not a valid secp256k1 scalar")]
    OutOfRange,
    #[error("signing failed: {0}")]
    Signing(String),
}

/// Server-held secp256k1 key used to authorize score transactions.
pub struct CustodialKey {
    signing_key: SigningKey,
    address: Address,
}

impl CustodialKey {
    /// Parse hex key material, with or without `0x`, ignoring surrounding whitespace.
    pub fn from_hex(raw: &str) -> Result<Self, KeyError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(KeyError::Empty);
        }
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if digits.len() != 64 {
            return Err(KeyError::Malformed);
        }

        let mut bytes = Zeroizing::new([0u8; 32]);
        hex::decode_to_slice(digits, bytes.as_mut()).map_err(|_| KeyError::Malformed)?;
        let signing_key =
            SigningKey::from_bytes((&*bytes).into()).map_err(|_| KeyError::OutOfRange)?;
        let address = derive_address(&signing_key);

        Ok(Self {
            signing_key,
            address,
        })
    }

    /// Signer account derived from the public key.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Sign a 32-byte digest, returning `(r, s, recovery_id)` with low-S.
    fn sign_digest(&self, digest: &[u8; 32]) -> Result<([u8; 32], [u8; 32], u8), KeyError> {
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(digest)
            .map_err(|e| KeyError::Signing(e.to_string()))?;
        let (signature, recovery_id) = match signature.normalize_s() {
            Some(normalized) => (normalized, recovery_id.to_byte() ^ 1),
            None => (signature, recovery_id.to_byte()),
        };
        let bytes = signature.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        Ok((r, s, recovery_id))
    }

    /// Sign a legacy transaction for `chain_id` and return its raw encoding.
    pub fn sign_transaction(
        &self,
        tx: &LegacyTransaction,
        chain_id: u64,
    ) -> Result<SignedTransaction, KeyError> {
        let digest = keccak256(&tx.signing_payload(chain_id));
        let (r, s, recovery_id) = self.sign_digest(&digest)?;
        let v = recovery_id as u128 + 2 * chain_id as u128 + 35;

        let mut stream = RlpStream::new_list(9);
        tx.append_fields(&mut stream);
        stream.append(&v);
        stream.append(&scalar_bytes(&r));
        stream.append(&scalar_bytes(&s));
        let raw = stream.out().to_vec();
        let hash = keccak256(&raw);

        Ok(SignedTransaction { raw, hash })
    }
}

impl fmt::Debug for CustodialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustodialKey")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

fn derive_address(signing_key: &SigningKey) -> Address {
    let point = signing_key.verifying_key().to_encoded_point(false);
    // uncompressed point: 0x04 || X || Y
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash[12..]);
    Address(bytes)
}

/// Signature scalar as a minimal big-endian integer.
fn scalar_bytes(word: &[u8; 32]) -> Vec<u8> {
    let start = word.iter().position(|b| *b != 0).unwrap_or(word.len());
    word[start..].to_vec()
}

/// Unsigned legacy transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub to: Address,
    pub value: u128,
    pub data: Vec<u8>,
}

impl LegacyTransaction {
    fn append_fields(&self, stream: &mut RlpStream) {
        stream.append(&self.nonce);
        stream.append(&self.gas_price);
        stream.append(&self.gas_limit);
        stream.append(&self.to.as_bytes().to_vec());
        stream.append(&self.value);
        stream.append(&self.data);
    }

    /// EIP-155 payload: the six fields followed by `chain_id, 0, 0`.
    pub fn signing_payload(&self, chain_id: u64) -> Vec<u8> {
        let mut stream = RlpStream::new_list(9);
        self.append_fields(&mut stream);
        stream.append(&chain_id);
        stream.append(&0u8);
        stream.append(&0u8);
        stream.out().to_vec()
    }
}

/// Signed transaction ready for `eth_sendRawTransaction`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub raw: Vec<u8>,
    pub hash: [u8; 32],
}

impl SignedTransaction {
    pub fn raw_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.raw))
    }

    pub fn hash_hex(&self) -> String {
        format!("0x{}", hex::encode(self.hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

    // Well-known development account #0 of the local test node toolchains.
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const DEV_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    fn sample_tx() -> LegacyTransaction {
        LegacyTransaction {
            nonce: 7,
            gas_price: 50_000_000_000,
            gas_limit: 60_000,
            to: "0x00000000000000000000000000000000000000aa".parse().unwrap(),
            value: 0,
            data: vec![0x6e, 0x77, 0xce, 0xaf],
        }
    }

    #[test]
    fn test_address_derivation() {
        let key = CustodialKey::from_hex(DEV_KEY).unwrap();
        assert_eq!(key.address().to_hex(), DEV_ADDRESS);

        let unprefixed = CustodialKey::from_hex(&format!("  {}\n", &DEV_KEY[2..])).unwrap();
        assert_eq!(unprefixed.address(), key.address());
    }

    #[test]
    fn test_rejects_bad_key_material() {
        assert_eq!(CustodialKey::from_hex("   ").unwrap_err(), KeyError::Empty);
        assert_eq!(CustodialKey::from_hex("0x1234").unwrap_err(), KeyError::Malformed);
        let zero = format!("0x{}", "0".repeat(64));
        assert_eq!(CustodialKey::from_hex(&zero).unwrap_err(), KeyError::OutOfRange);
    }

    #[test]
    fn test_debug_hides_secret() {
        let key = CustodialKey::from_hex(DEV_KEY).unwrap();
        let printed = format!("{:?}", key);
        assert!(printed.contains(DEV_ADDRESS));
        assert!(!printed.contains(&DEV_KEY[2..]));
    }

    #[test]
    fn test_signature_recovers_signer() {
        let key = CustodialKey::from_hex(DEV_KEY).unwrap();
        let tx = sample_tx();
        let chain_id = 10143;
        let digest = keccak256(&tx.signing_payload(chain_id));

        let (r, s, recid) = key.sign_digest(&digest).unwrap();
        let mut sig_bytes = [0u8; 64];
        sig_bytes[..32].copy_from_slice(&r);
        sig_bytes[32..].copy_from_slice(&s);
        let signature = Signature::from_slice(&sig_bytes).unwrap();
        assert!(signature.normalize_s().is_none(), "signature must be low-S");

        let recovered = VerifyingKey::recover_from_prehash(
            &digest,
            &signature,
            RecoveryId::from_byte(recid).unwrap(),
        )
        .unwrap();
        assert_eq!(&recovered, key.signing_key.verifying_key());
    }

    #[test]
    fn test_signed_transaction_shape() {
        let key = CustodialKey::from_hex(DEV_KEY).unwrap();
        let signed = key.sign_transaction(&sample_tx(), 10143).unwrap();

        // long list header, then the nonce
        assert_eq!(signed.raw[0], 0xf8);
        assert_eq!(signed.raw[2], 0x07);
        assert_eq!(signed.hash, keccak256(&signed.raw));
        assert!(signed.raw_hex().starts_with("0xf8"));
        assert_eq!(signed.hash_hex().len(), 66);

        // deterministic (RFC 6979)
        let again = key.sign_transaction(&sample_tx(), 10143).unwrap();
        assert_eq!(signed, again);
    }

    #[test]
    fn test_signed_transaction_decodes_to_eip155_fields() {
        let key = CustodialKey::from_hex(DEV_KEY).unwrap();
        let tx = sample_tx();
        let signed = key.sign_transaction(&tx, 10143).unwrap();

        let decoded = rlp::Rlp::new(&signed.raw);
        assert!(decoded.is_list());
        assert_eq!(decoded.item_count().unwrap(), 9);
        assert_eq!(decoded.val_at::<u64>(0).unwrap(), 7);
        assert_eq!(decoded.val_at::<u128>(1).unwrap(), 50_000_000_000);
        assert_eq!(decoded.val_at::<u64>(2).unwrap(), 60_000);
        assert_eq!(decoded.val_at::<Vec<u8>>(3).unwrap(), tx.to.as_bytes().to_vec());
        assert_eq!(decoded.val_at::<u128>(4).unwrap(), 0);
        assert_eq!(decoded.val_at::<Vec<u8>>(5).unwrap(), tx.data);

        let v = decoded.val_at::<u128>(6).unwrap();
        assert!(v == 2 * 10143 + 35 || v == 2 * 10143 + 36);

        // r and s are minimal integers: no leading zero byte
        for index in [7, 8] {
            let scalar = decoded.val_at::<Vec<u8>>(index).unwrap();
            assert!(!scalar.is_empty() && scalar.len() <= 32);
            assert_ne!(scalar[0], 0);
        }
    }

    #[test]
    fn test_signing_payload_carries_chain_id() {
        let payload = sample_tx().signing_payload(10143);
        let decoded = rlp::Rlp::new(&payload);
        assert_eq!(decoded.item_count().unwrap(), 9);
        assert_eq!(decoded.val_at::<u64>(6).unwrap(), 10143);
        assert_eq!(decoded.val_at::<u8>(7).unwrap(), 0);
        assert_eq!(decoded.val_at::<u8>(8).unwrap(), 0);
    }

    #[test]
    fn test_scalar_bytes_strips_leading_zeros() {
        let mut word = [0u8; 32];
        word[30] = 0x01;
        word[31] = 0x02;
        assert_eq!(scalar_bytes(&word), vec![0x01, 0x02]);
        assert!(scalar_bytes(&[0u8; 32]).is_empty());
    }
}
