//! 20-byte account identifiers in `0x`-prefixed hex form.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

/// Account identifier (20 bytes). Parsing is case-insensitive; checksum
/// casing is accepted but not enforced.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Lowercase hex with `0x` prefix.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// `0x1234…abcd` form used for display in terminals.
    pub fn short(&self) -> String {
        let full = self.to_hex();
        format!("{}…{}", &full[..6], &full[full.len() - 4..])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("address must start with 0x")]
    MissingPrefix,
    #[error("address must be 40 hex digits, got {0}")]
    BadLength(usize),
    #[error("address contains non-hex characters")]
    NotHex,
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or(AddressError::MissingPrefix)?;
        if digits.len() != 40 {
            return Err(AddressError::BadLength(digits.len()));
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes).map_err(|_| AddressError::NotHex)?;
        Ok(Address(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_case() {
        let addr: Address = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse().unwrap();
        assert_eq!(addr.to_hex(), "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266");
        assert_eq!(addr.short(), "0xf39f…2266");
    }

    #[test]
    fn test_rejects_malformed() {
        assert_eq!(
            "f39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse::<Address>(),
            Err(AddressError::MissingPrefix)
        );
        assert_eq!("0xABC".parse::<Address>(), Err(AddressError::BadLength(3)));
        assert_eq!(
            "0xzz9fd6e51aad88f6f4ce6ab8827279cfffb92266".parse::<Address>(),
            Err(AddressError::NotHex)
        );
    }

    #[test]
    fn test_serde_as_string() {
        let addr: Address = "0x00000000000000000000000000000000000000aa".parse().unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"0x00000000000000000000000000000000000000aa\"");
        assert!(serde_json::from_str::<Address>("\"0x12\"").is_err());
    }
}
