//! Parameter registry
//!
//! The lending module reads its global configuration through
//! [`ParameterRegistry`]. [`ParametersStorage`] is the in-memory registry
//! used by the service and tests: a manager-gated store with a base fee,
//! per-asset fee overrides and generic 32-byte custom parameters.

use std::collections::{HashMap, HashSet};

use dutchlend_core::{Address, BasisPoints, ProtocolConfig};
use serde::{Deserialize, Serialize};

use crate::constants::{params, DEFAULT_BASE_FEE_BP};
use crate::error::RegistryError;

/// Configuration the lending module consumes. Read-only from its side.
pub trait ParameterRegistry {
    /// Seconds over which an auction's rate decays from min to max
    fn auction_duration_seconds(&self) -> u64;

    /// Fee charged on funding, per-asset override or the base fee
    fn asset_fee_basis_points(&self, asset: &Address) -> BasisPoints;

    /// Operator share of the fee. `None` means split evenly.
    fn operator_fee_override(&self) -> Option<BasisPoints>;

    fn community_treasury(&self) -> Address;

    fn operator_treasury(&self) -> Address;
}

/// Raw 32-byte parameter value
pub type ParamWord = [u8; 32];

/// Encode an unsigned integer into the low bytes of a word
pub fn word_from_uint(value: u128) -> ParamWord {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Decode a word as an unsigned integer, saturating if the high half is set
pub fn word_to_uint(word: &ParamWord) -> u128 {
    if word[..16].iter().any(|b| *b != 0) {
        return u128::MAX;
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&word[16..]);
    u128::from_be_bytes(low)
}

pub fn word_from_address(address: &Address) -> ParamWord {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

pub fn word_to_address(word: &ParamWord) -> Address {
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&word[12..]);
    Address::new(bytes)
}

/// Per-asset fee override
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetCustomFee {
    pub enabled: bool,
    pub fee_bp: BasisPoints,
}

/// In-memory, manager-gated parameter store
#[derive(Debug, Clone)]
pub struct ParametersStorage {
    managers: HashSet<Address>,
    treasury: Address,
    base_fee_bp: BasisPoints,
    asset_custom_fees: HashMap<Address, AssetCustomFee>,
    custom_params: HashMap<u8, ParamWord>,
    asset_custom_params: HashMap<(Address, u8), ParamWord>,
}

impl ParametersStorage {
    /// New storage with `deployer` as the only manager
    pub fn new(deployer: Address, treasury: Address) -> Result<Self, RegistryError> {
        if treasury.is_zero() {
            return Err(RegistryError::ZeroAddress);
        }
        let mut managers = HashSet::new();
        managers.insert(deployer);
        Ok(Self {
            managers,
            treasury,
            base_fee_bp: DEFAULT_BASE_FEE_BP,
            asset_custom_fees: HashMap::new(),
            custom_params: HashMap::new(),
            asset_custom_params: HashMap::new(),
        })
    }

    /// Seed a storage from the protocol section of the app config
    pub fn from_config(config: &ProtocolConfig) -> Result<Self, RegistryError> {
        let manager = config.manager;
        let mut storage = Self::new(manager, config.community_treasury)?;
        storage.set_base_fee(&manager, config.base_fee_bp)?;
        storage.set_auction_duration(&manager, config.auction_duration_secs)?;
        if let Some(operator) = config.operator_treasury {
            storage.set_operator_treasury(&manager, operator)?;
        }
        storage.set_operator_fee(&manager, config.operator_fee_bp)?;
        Ok(storage)
    }

    fn ensure_manager(&self, caller: &Address) -> Result<(), RegistryError> {
        if self.managers.contains(caller) {
            Ok(())
        } else {
            Err(RegistryError::AuthFailed(*caller))
        }
    }

    pub fn is_manager(&self, account: &Address) -> bool {
        self.managers.contains(account)
    }

    pub fn treasury(&self) -> Address {
        self.treasury
    }

    pub fn base_fee_bp(&self) -> BasisPoints {
        self.base_fee_bp
    }

    pub fn set_manager(
        &mut self,
        caller: &Address,
        account: Address,
        is_active: bool,
    ) -> Result<(), RegistryError> {
        self.ensure_manager(caller)?;
        if is_active {
            self.managers.insert(account);
        } else {
            self.managers.remove(&account);
        }
        tracing::info!("Registry manager {} set to {}", account, is_active);
        Ok(())
    }

    pub fn set_treasury(&mut self, caller: &Address, treasury: Address) -> Result<(), RegistryError> {
        self.ensure_manager(caller)?;
        if treasury.is_zero() {
            return Err(RegistryError::ZeroAddress);
        }
        self.treasury = treasury;
        tracing::info!("Community treasury set to {}", treasury);
        Ok(())
    }

    pub fn set_base_fee(&mut self, caller: &Address, fee_bp: BasisPoints) -> Result<(), RegistryError> {
        self.ensure_manager(caller)?;
        self.base_fee_bp = fee_bp;
        tracing::info!("Base fee set to {} bp", fee_bp);
        Ok(())
    }

    pub fn set_asset_custom_fee(
        &mut self,
        caller: &Address,
        asset: Address,
        enabled: bool,
        fee_bp: BasisPoints,
    ) -> Result<(), RegistryError> {
        self.ensure_manager(caller)?;
        self.asset_custom_fees
            .insert(asset, AssetCustomFee { enabled, fee_bp });
        tracing::info!("Custom fee for {}: enabled={} fee={} bp", asset, enabled, fee_bp);
        Ok(())
    }

    pub fn asset_custom_fee(&self, asset: &Address) -> AssetCustomFee {
        self.asset_custom_fees.get(asset).copied().unwrap_or_default()
    }

    /// Effective fee for `asset`: the enabled override, else the base fee
    pub fn asset_fee(&self, asset: &Address) -> BasisPoints {
        match self.asset_custom_fees.get(asset) {
            Some(custom) if custom.enabled => custom.fee_bp,
            _ => self.base_fee_bp,
        }
    }

    pub fn custom_param(&self, key: u8) -> ParamWord {
        self.custom_params.get(&key).copied().unwrap_or_default()
    }

    pub fn custom_param_as_uint(&self, key: u8) -> u128 {
        word_to_uint(&self.custom_param(key))
    }

    pub fn custom_param_as_address(&self, key: u8) -> Address {
        word_to_address(&self.custom_param(key))
    }

    pub fn set_custom_param(
        &mut self,
        caller: &Address,
        key: u8,
        value: ParamWord,
    ) -> Result<(), RegistryError> {
        self.ensure_manager(caller)?;
        self.custom_params.insert(key, value);
        tracing::debug!("Custom param {} set to 0x{}", key, hex::encode(value));
        Ok(())
    }

    pub fn set_custom_param_as_uint(
        &mut self,
        caller: &Address,
        key: u8,
        value: u128,
    ) -> Result<(), RegistryError> {
        self.set_custom_param(caller, key, word_from_uint(value))
    }

    pub fn set_custom_param_as_address(
        &mut self,
        caller: &Address,
        key: u8,
        value: Address,
    ) -> Result<(), RegistryError> {
        self.set_custom_param(caller, key, word_from_address(&value))
    }

    pub fn asset_custom_param(&self, asset: &Address, key: u8) -> ParamWord {
        self.asset_custom_params
            .get(&(*asset, key))
            .copied()
            .unwrap_or_default()
    }

    pub fn set_asset_custom_param(
        &mut self,
        caller: &Address,
        asset: Address,
        key: u8,
        value: ParamWord,
    ) -> Result<(), RegistryError> {
        self.ensure_manager(caller)?;
        self.asset_custom_params.insert((asset, key), value);
        tracing::debug!("Custom param {} for {} set to 0x{}", key, asset, hex::encode(value));
        Ok(())
    }

    pub fn set_asset_custom_param_as_uint(
        &mut self,
        caller: &Address,
        asset: Address,
        key: u8,
        value: u128,
    ) -> Result<(), RegistryError> {
        self.set_asset_custom_param(caller, asset, key, word_from_uint(value))
    }

    pub fn set_asset_custom_param_as_address(
        &mut self,
        caller: &Address,
        asset: Address,
        key: u8,
        value: Address,
    ) -> Result<(), RegistryError> {
        self.set_asset_custom_param(caller, asset, key, word_from_address(&value))
    }

    pub fn set_auction_duration(&mut self, caller: &Address, seconds: u64) -> Result<(), RegistryError> {
        self.set_custom_param_as_uint(caller, params::AUCTION_DURATION, u128::from(seconds))
    }

    pub fn set_operator_treasury(
        &mut self,
        caller: &Address,
        treasury: Address,
    ) -> Result<(), RegistryError> {
        if treasury.is_zero() {
            return Err(RegistryError::ZeroAddress);
        }
        self.set_custom_param_as_address(caller, params::OPERATOR_TREASURY, treasury)
    }

    /// Set or clear the operator fee override. Stored as `bp + 1` so that a
    /// zero word reads back as unset, distinct from an explicit 0 bp.
    pub fn set_operator_fee(
        &mut self,
        caller: &Address,
        fee_bp: Option<BasisPoints>,
    ) -> Result<(), RegistryError> {
        let stored = fee_bp.map_or(0, |bp| u128::from(bp) + 1);
        self.set_custom_param_as_uint(caller, params::OPERATOR_FEE, stored)
    }
}

impl ParameterRegistry for ParametersStorage {
    fn auction_duration_seconds(&self) -> u64 {
        u64::try_from(self.custom_param_as_uint(params::AUCTION_DURATION)).unwrap_or(u64::MAX)
    }

    fn asset_fee_basis_points(&self, asset: &Address) -> BasisPoints {
        self.asset_fee(asset)
    }

    fn operator_fee_override(&self) -> Option<BasisPoints> {
        match self.custom_param_as_uint(params::OPERATOR_FEE) {
            0 => None,
            stored => Some(BasisPoints::try_from(stored - 1).unwrap_or(BasisPoints::MAX)),
        }
    }

    fn community_treasury(&self) -> Address {
        self.treasury
    }

    fn operator_treasury(&self) -> Address {
        let operator = self.custom_param_as_address(params::OPERATOR_TREASURY);
        if operator.is_zero() {
            self.treasury
        } else {
            operator
        }
    }
}
