use dashmap::DashMap;

use common_types::{Asset, AssetDescription, AssetRegistry, DomainError, NATIVE_DECIMALS};
use common_types::asset::MAX_ASSET_DECIMALS;

/// Shared read-mostly registry of issued assets. The native asset is always
/// known and fixed at [`NATIVE_DECIMALS`].
#[derive(Debug, Default)]
pub struct InMemoryAssetRegistry {
    assets: DashMap<Asset, AssetDescription>,
}

impl InMemoryAssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        asset: Asset,
        name: impl Into<String>,
        decimals: u8,
    ) -> Result<(), DomainError> {
        if decimals > MAX_ASSET_DECIMALS {
            return Err(DomainError::InvalidDecimals(decimals));
        }
        self.assets
            .insert(asset, AssetDescription { name: name.into(), decimals });
        Ok(())
    }
}

impl AssetRegistry for InMemoryAssetRegistry {
    fn decimals(&self, asset: Asset) -> Option<u8> {
        match asset {
            Asset::Native => Some(NATIVE_DECIMALS),
            issued => self.assets.get(&issued).map(|entry| entry.decimals),
        }
    }

    fn description(&self, asset: Asset) -> Option<AssetDescription> {
        match asset {
            Asset::Native => Some(AssetDescription {
                name: "NATIVE".to_owned(),
                decimals: NATIVE_DECIMALS,
            }),
            issued => self.assets.get(&issued).map(|entry| entry.value().clone()),
        }
    }
}
