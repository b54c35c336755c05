//! Protocol parameter endpoint

use axum::{extract::State, Json};

use auction_lending::ParameterRegistry;

use crate::dto::{AssetDto, ParametersResponse};
use crate::AppState;

/// GET /parameters - Registry values and registered assets
pub async fn get_parameters(State(state): State<AppState>) -> Json<ParametersResponse> {
    let protocol = state.protocol().await;
    let registry = protocol.registry();

    let assets = state
        .config()
        .assets
        .iter()
        .map(|asset| AssetDto {
            address: asset.address,
            kind: asset.kind,
            symbol: asset.symbol.clone(),
            fee_bp: registry.asset_fee_basis_points(&asset.address),
        })
        .collect();

    Json(ParametersResponse {
        custody_address: protocol.escrow().custody(),
        auction_duration_secs: registry.auction_duration_seconds(),
        base_fee_bp: registry.base_fee_bp(),
        community_treasury: registry.community_treasury(),
        operator_treasury: registry.operator_treasury(),
        operator_fee_bp: registry.operator_fee_override(),
        assets,
    })
}
