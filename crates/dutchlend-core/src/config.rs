//! Configuration types for DutchLend

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Address, AssetKind, BasisPoints, Error, Result};

/// Environment variable naming the JSON config file
pub const CONFIG_ENV_VAR: &str = "DUTCHLEND_CONFIG";

/// Protocol parameters seeded into the parameter registry at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolConfig {
    /// Address the protocol holds collateral under
    #[serde(default = "default_custody_address")]
    pub custody_address: Address,

    /// Initial registry manager
    #[serde(default = "default_manager")]
    pub manager: Address,

    /// Community treasury (receives fee revenue)
    #[serde(default = "default_community_treasury")]
    pub community_treasury: Address,

    /// Operator treasury; falls back to the community treasury when absent
    #[serde(default)]
    pub operator_treasury: Option<Address>,

    /// Seconds over which the auction rate decays from min to max
    #[serde(default = "default_auction_duration")]
    pub auction_duration_secs: u64,

    /// Protocol base fee in basis points
    #[serde(default = "default_base_fee")]
    pub base_fee_bp: BasisPoints,

    /// Operator share override in basis points (None = even split)
    #[serde(default)]
    pub operator_fee_bp: Option<BasisPoints>,
}

fn default_custody_address() -> Address {
    Address::from_low_u64(0xd1)
}

fn default_manager() -> Address {
    Address::from_low_u64(2)
}

fn default_community_treasury() -> Address {
    Address::from_low_u64(1)
}

fn default_auction_duration() -> u64 {
    2 * 3600
}

fn default_base_fee() -> BasisPoints {
    100
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            custody_address: default_custody_address(),
            manager: default_manager(),
            community_treasury: default_community_treasury(),
            operator_treasury: None,
            auction_duration_secs: default_auction_duration(),
            base_fee_bp: default_base_fee(),
            operator_fee_bp: None,
        }
    }
}

/// An asset registered with the in-memory vault at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetConfig {
    pub address: Address,
    pub kind: AssetKind,
    pub symbol: String,
    /// Per-asset fee override in basis points
    #[serde(default)]
    pub custom_fee_bp: Option<BasisPoints>,
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// API server port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Protocol parameters
    #[serde(default)]
    pub protocol: ProtocolConfig,

    /// Assets known to the vault
    #[serde(default)]
    pub assets: Vec<AssetConfig>,
}

fn default_api_port() -> u16 {
    18545
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            protocol: ProtocolConfig::default(),
            assets: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Parse a config from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        let config: AppConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    /// Load from the file named by `DUTCHLEND_CONFIG`, or defaults if unset
    pub fn load() -> Result<Self> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.is_empty() => Self::from_file(path),
            _ => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        let protocol = &self.protocol;
        if protocol.custody_address.is_zero() {
            return Err(Error::Config("custodyAddress must not be zero".into()));
        }
        if protocol.community_treasury.is_zero() {
            return Err(Error::Config("communityTreasury must not be zero".into()));
        }
        if let Some(asset) = self.assets.iter().find(|a| a.address.is_zero()) {
            return Err(Error::Config(format!(
                "asset {} has a zero address",
                asset.symbol
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.api_port, 18545);
        assert_eq!(config.protocol.auction_duration_secs, 7200);
        assert_eq!(config.protocol.base_fee_bp, 100);
        assert!(config.protocol.operator_fee_bp.is_none());
        assert!(config.assets.is_empty());
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed = AppConfig::from_json(&json).unwrap();
        assert_eq!(parsed.api_port, config.api_port);
        assert_eq!(
            parsed.protocol.community_treasury,
            config.protocol.community_treasury
        );
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let json = r#"{
            "protocol": { "auctionDurationSecs": 28800, "operatorFeeBp": 1 },
            "assets": [
                { "address": "0x00000000000000000000000000000000000000a1", "kind": "fungible", "symbol": "USDX" }
            ]
        }"#;
        let config = AppConfig::from_json(json).unwrap();
        assert_eq!(config.api_port, 18545);
        assert_eq!(config.protocol.auction_duration_secs, 28_800);
        assert_eq!(config.protocol.operator_fee_bp, Some(1));
        assert_eq!(config.protocol.base_fee_bp, 100);
        assert_eq!(config.assets[0].kind, AssetKind::Fungible);
        assert_eq!(config.assets[0].custom_fee_bp, None);
    }

    #[test]
    fn test_zero_treasury_rejected() {
        let json = r#"{ "protocol": { "communityTreasury": "0x0000000000000000000000000000000000000000" } }"#;
        let err = AppConfig::from_json(json).unwrap_err();
        assert_eq!(err.error_code(), "config_error");
    }
}
