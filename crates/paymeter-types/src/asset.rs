//! Asset identification for the multi-asset escrow model.
//!
//! Every balance, session deposit, and disbursement is segregated by asset.
//! The chain's base currency is its own variant rather than a magic symbol,
//! so the two funding paths (attached value vs. allowance-gated pull) are
//! distinguished by type.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An asset accepted by the marketplace.
///
/// Serializes as its symbol string (`"NATIVE"` for the base currency), so
/// it can key JSON maps and read naturally on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub enum AssetId {
    /// The chain's base currency. Deposits carry the value inline with the
    /// call; no gateway pull is involved.
    Native,
    /// A fungible token, identified by symbol (e.g., "USDC"). Deposits are
    /// pulled through the asset gateway under a prior allowance.
    Token(String),
}

impl AssetId {
    #[must_use]
    pub fn token(symbol: impl Into<String>) -> Self {
        Self::Token(symbol.into())
    }

    #[must_use]
    pub fn is_native(&self) -> bool {
        matches!(self, Self::Native)
    }

    #[must_use]
    pub fn symbol(&self) -> &str {
        match self {
            Self::Native => "NATIVE",
            Self::Token(sym) => sym,
        }
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl Serialize for AssetId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.symbol())
    }
}

impl<'de> Deserialize<'de> for AssetId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let sym = String::deserialize(deserializer)?;
        if sym == "NATIVE" {
            Ok(Self::Native)
        } else {
            Ok(Self::Token(sym))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_symbol() {
        assert!(AssetId::Native.is_native());
        assert_eq!(AssetId::Native.symbol(), "NATIVE");
    }

    #[test]
    fn token_symbol() {
        let usdc = AssetId::token("USDC");
        assert!(!usdc.is_native());
        assert_eq!(usdc.symbol(), "USDC");
        assert_eq!(format!("{usdc}"), "USDC");
    }

    #[test]
    fn distinct_tokens_are_distinct_keys() {
        assert_ne!(AssetId::token("USDC"), AssetId::token("DAI"));
        assert_ne!(AssetId::token("NATIVE"), AssetId::Native);
    }

    #[test]
    fn serde_roundtrip() {
        for asset in [AssetId::Native, AssetId::token("USDC")] {
            let json = serde_json::to_string(&asset).unwrap();
            let back: AssetId = serde_json::from_str(&json).unwrap();
            assert_eq!(asset, back);
        }
    }
}
