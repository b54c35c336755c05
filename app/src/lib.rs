//! DutchLend node: loads configuration and serves the HTTP API

use anyhow::Context;
use dutchlend_api::{start_server, AppState};
use dutchlend_core::{AppConfig, CONFIG_ENV_VAR};
use tracing_subscriber::filter::Directive;

/// Install the global tracing subscriber. `RUST_LOG` overrides the defaults.
pub fn init_tracing() {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    for directive in ["dutchlend=debug", "auction_lending=info", "info"] {
        if let Ok(directive) = directive.parse::<Directive>() {
            filter = filter.add_directive(directive);
        }
    }
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Run the node until the server stops
pub async fn run() -> anyhow::Result<()> {
    init_tracing();
    tracing::info!("Starting DutchLend node");

    let config = AppConfig::load()
        .with_context(|| format!("loading config (set {} to a JSON file)", CONFIG_ENV_VAR))?;
    tracing::info!(
        "Custody {}, community treasury {}, {} assets, auction window {}s",
        config.protocol.custody_address,
        config.protocol.community_treasury,
        config.assets.len(),
        config.protocol.auction_duration_secs
    );

    let state = AppState::from_config(config).context("building protocol state")?;
    start_server(state).await.context("API server failed")?;
    Ok(())
}
