//! Shared types for the watch pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::WatchError;

// ─── Address ──────────────────────────────────────────────────────────────────

/// An account address (`0x…`).
///
/// Addresses are trimmed and ASCII-lowercased on construction, so a
/// checksummed registration matches the lowercase form returned by nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Parse and normalize an address. Fails only if it is empty.
    pub fn parse(raw: &str) -> Result<Self, WatchError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(WatchError::InvalidAddress("address is empty".into()));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = WatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = WatchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

// ─── Transaction ──────────────────────────────────────────────────────────────

/// An ingested transaction. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Transaction hash (`0x…`), the primary key.
    pub hash: String,
    /// Sender.
    pub from: Address,
    /// Recipient; `None` for contract creation.
    pub to: Option<Address>,
    /// Transferred value as a hex quantity. Kept verbatim, it may not fit in 64 bits.
    pub value: String,
    pub nonce: u64,
    pub block_number: u64,
    /// Position of the transaction within its block.
    pub transaction_index: u64,
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(from: &str, to: Option<&str>) -> Transaction {
        Transaction {
            hash: "0x01".into(),
            from: Address::parse(from).unwrap(),
            to: to.map(|a| Address::parse(a).unwrap()),
            value: "0x0".into(),
            nonce: 0,
            block_number: 100,
            transaction_index: 0,
        }
    }

    #[test]
    fn address_is_normalized() {
        let a = Address::parse("  0xAbCdEf ").unwrap();
        assert_eq!(a.as_str(), "0xabcdef");
        assert_eq!(a, "0xABCDEF".parse().unwrap());
    }

    #[test]
    fn empty_address_rejected() {
        assert!(matches!(Address::parse(""), Err(WatchError::InvalidAddress(_))));
        assert!(matches!(Address::parse("   "), Err(WatchError::InvalidAddress(_))));
    }

    #[test]
    fn address_deserialization_validates() {
        let a: Address = serde_json::from_str(r#""0xAA""#).unwrap();
        assert_eq!(a.as_str(), "0xaa");
        assert!(serde_json::from_str::<Address>(r#""""#).is_err());
    }

    #[test]
    fn transaction_serializes_camel_case() {
        let json = serde_json::to_value(tx("0xaa", None)).unwrap();
        assert_eq!(json["from"], "0xaa");
        assert_eq!(json["to"], serde_json::Value::Null);
        assert_eq!(json["blockNumber"], 100);
        assert_eq!(json["transactionIndex"], 0);
    }
}
