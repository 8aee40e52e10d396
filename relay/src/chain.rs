//! Chain identifier resolution.
//!
//! Every provider names networks differently. This module is the single place
//! that translates a numeric chain id into the identifier each provider
//! expects, instead of scattering the ternaries across endpoints:
//!
//! | chain id | hex form   | Moralis slug | Alchemy network |
//! |----------|------------|--------------|-----------------|
//! | 1        | `0x1`      | `eth`        | `eth-mainnet`   |
//! | n ≠ 1    | `0x<hex n>`| `0x<hex n>`  | `eth-<n>`       |
//!
//! The `eth-<n>` Alchemy fallback only holds for Ethereum networks; Alchemy
//! slugs for other chain families (Polygon, Base, ...) do not follow the
//! pattern. It is kept unchanged for compatibility with existing clients.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, de};

/// Numeric identifier of a blockchain network (1 = Ethereum mainnet).
///
/// Deserializes from a JSON integer or a numeric string; decimal and
/// `0x`-prefixed hex strings are both accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(u64);

impl ChainId {
    /// Ethereum mainnet, the default network for every endpoint.
    pub const ETHEREUM_MAINNET: Self = Self(1);

    /// `0x`-prefixed hexadecimal form (`1` → `"0x1"`).
    #[must_use]
    pub fn hex(&self) -> String {
        format!("0x{:x}", self.0)
    }

    /// Short chain slug used in Moralis `chain` query parameters.
    #[must_use]
    pub fn moralis_slug(&self) -> String {
        if self.0 == 1 {
            "eth".to_owned()
        } else {
            self.hex()
        }
    }

    /// Alchemy network slug used to build the fallback RPC host.
    #[must_use]
    pub fn alchemy_network(&self) -> String {
        if self.0 == 1 {
            "eth-mainnet".to_owned()
        } else {
            format!("eth-{}", self.0)
        }
    }
}

impl Default for ChainId {
    fn default() -> Self {
        Self::ETHEREUM_MAINNET
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ChainId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s
            .strip_prefix("0x")
            .map_or_else(|| s.parse(), |hex| u64::from_str_radix(hex, 16))?;
        Ok(Self(id))
    }
}

impl<'de> Deserialize<'de> for ChainId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ChainIdVisitor;

        impl de::Visitor<'_> for ChainIdVisitor {
            type Value = ChainId;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a chain id as an integer or numeric string")
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(ChainId(v))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                u64::try_from(v)
                    .map(ChainId)
                    .map_err(|_| E::custom(format!("chain id out of range: {v}")))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                v.parse()
                    .map_err(|_| E::custom(format!("invalid chain id: '{v}'")))
            }
        }

        deserializer.deserialize_any(ChainIdVisitor)
    }
}
