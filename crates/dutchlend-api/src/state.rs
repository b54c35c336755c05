//! Application state shared across API handlers

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use auction_lending::{LendingModule, ParametersStorage, RegistryError, Vault};
use dutchlend_core::{AppConfig, Timestamp};
use thiserror::Error;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// The protocol instance served by the API
pub type Protocol = LendingModule<ParametersStorage, Vault>;

/// Errors raised while assembling the application state
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] dutchlend_core::Error),

    #[error("Registry setup failed: {0}")]
    Registry(#[from] RegistryError),
}

/// Source of block-time-like timestamps, in seconds
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock(AtomicU64);

impl ManualClock {
    pub fn new(now: Timestamp) -> Self {
        Self(AtomicU64::new(now))
    }

    pub fn set(&self, now: Timestamp) {
        self.0.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: u64) {
        self.0.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.0.load(Ordering::SeqCst)
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    protocol: RwLock<Protocol>,
    clock: Arc<dyn Clock>,
}

impl AppState {
    /// Build the registry and vault described by `config`, on the wall clock
    pub fn from_config(config: AppConfig) -> Result<Self, StateError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: AppConfig, clock: Arc<dyn Clock>) -> Result<Self, StateError> {
        let protocol = build_protocol(&config)?;
        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                protocol: RwLock::new(protocol),
                clock,
            }),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Current timestamp. Mutating handlers read it while holding
    /// [`Self::protocol_mut`], so operations see time in lock order.
    pub fn now(&self) -> Timestamp {
        self.inner.clock.now()
    }

    pub async fn protocol(&self) -> RwLockReadGuard<'_, Protocol> {
        self.inner.protocol.read().await
    }

    /// Exclusive access; mutations are serialized through this lock
    pub async fn protocol_mut(&self) -> RwLockWriteGuard<'_, Protocol> {
        self.inner.protocol.write().await
    }
}

fn build_protocol(config: &AppConfig) -> Result<Protocol, StateError> {
    let protocol_config = &config.protocol;
    let manager = protocol_config.manager;
    let mut registry = ParametersStorage::from_config(protocol_config)?;
    let mut vault = Vault::new(protocol_config.custody_address);

    for asset in &config.assets {
        tracing::info!(
            "Registering {} asset {} at {}",
            asset.kind,
            asset.symbol,
            asset.address
        );
        vault.register_asset(asset.address, asset.kind, asset.symbol.clone());
        if let Some(fee_bp) = asset.custom_fee_bp {
            registry.set_asset_custom_fee(&manager, asset.address, true, fee_bp)?;
        }
    }

    Ok(LendingModule::new(registry, vault))
}
