use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::crypto::{base58_decode, base58_encode};
use crate::error::{CodecError, DomainError};

pub const ASSET_ID_LENGTH: usize = 32;

/// Decimals of the chain's native asset. Issued assets carry their own value
/// in `[0, MAX_ASSET_DECIMALS]`.
pub const NATIVE_DECIMALS: u8 = 8;
pub const MAX_ASSET_DECIMALS: u8 = 8;

/// Either the native chain asset (no identifier) or an issued asset
/// identified by a 32-byte id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Asset {
    Native,
    Issued([u8; ASSET_ID_LENGTH]),
}

impl Asset {
    pub fn is_native(&self) -> bool {
        matches!(self, Asset::Native)
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Native => f.write_str("NATIVE"),
            Asset::Issued(id) => f.write_str(&base58_encode(id)),
        }
    }
}

impl FromStr for Asset {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "NATIVE" {
            return Ok(Asset::Native);
        }
        let bytes = base58_decode(s, 64)?;
        let id: [u8; ASSET_ID_LENGTH] = bytes.try_into().map_err(|_| CodecError::Base58)?;
        Ok(Asset::Issued(id))
    }
}

/// An ordered pair `(amount asset, price asset)`. The price of an order
/// expresses price-asset units per amount-asset unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetPair {
    pub amount_asset: Asset,
    pub price_asset: Asset,
}

impl AssetPair {
    pub fn new(amount_asset: Asset, price_asset: Asset) -> Result<Self, DomainError> {
        if amount_asset == price_asset {
            return Err(DomainError::InvalidAssetPair);
        }
        Ok(AssetPair { amount_asset, price_asset })
    }
}

impl fmt::Display for AssetPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.amount_asset, self.price_asset)
    }
}

/// Human-readable description of an issued asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDescription {
    pub name: String,
    pub decimals: u8,
}

/// Read-only source of per-asset precision and descriptions.
///
/// Implementations must be safe for concurrent snapshot reads and must report
/// [`NATIVE_DECIMALS`] for [`Asset::Native`].
pub trait AssetRegistry: Send + Sync {
    fn decimals(&self, asset: Asset) -> Option<u8>;
    fn description(&self, asset: Asset) -> Option<AssetDescription>;
}
