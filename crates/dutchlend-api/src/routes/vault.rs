//! In-memory vault endpoints
//!
//! Faucet-style minting and protocol approvals so that clients can fund
//! accounts before borrowing or lending against the reference vault.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use auction_lending::{AssetEscrow, EscrowError};
use dutchlend_core::{Address, AssetKind};

use super::{escrow_failure, parse_address, parse_amount_field, ApiFailure};
use crate::dto::{ApiError, ApproveRequest, BalanceResponse, MintRequest};
use crate::state::Protocol;
use crate::AppState;

type ApiResult<T> = Result<Json<T>, ApiFailure>;

/// Create vault routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/assets/:asset/mint", post(mint))
        .route("/assets/:asset/approve", post(approve))
        .route("/assets/:asset/balances/:account", get(get_balance))
}

fn asset_kind(protocol: &Protocol, asset: &Address) -> Result<AssetKind, ApiFailure> {
    protocol
        .escrow()
        .asset_kind(asset)
        .ok_or_else(|| escrow_failure(EscrowError::UnknownAsset(*asset)))
}

fn balance(protocol: &Protocol, asset: Address, account: Address) -> ApiResult<BalanceResponse> {
    let kind = asset_kind(protocol, &asset)?;
    let vault = protocol.escrow();
    Ok(Json(BalanceResponse {
        asset,
        account,
        kind,
        balance: vault.balance_of(&asset, &account).to_string(),
        allowance: match kind {
            AssetKind::Fungible => Some(vault.allowance(&asset, &account).to_string()),
            AssetKind::Unique => None,
        },
    }))
}

/// GET /vault/assets/:asset/balances/:account
pub async fn get_balance(
    State(state): State<AppState>,
    Path((asset, account)): Path<(String, String)>,
) -> ApiResult<BalanceResponse> {
    let asset = parse_address("asset", &asset)?;
    let account = parse_address("account", &account)?;
    balance(&*state.protocol().await, asset, account)
}

/// POST /vault/assets/:asset/mint - Credit an amount, or create a token id
pub async fn mint(
    State(state): State<AppState>,
    Path(asset): Path<String>,
    Json(request): Json<MintRequest>,
) -> ApiResult<BalanceResponse> {
    let asset = parse_address("asset", &asset)?;
    let to = parse_address("to", &request.to)?;
    let value = parse_amount_field("idOrAmount", &request.id_or_amount)?;

    let mut protocol = state.protocol_mut().await;
    let kind = asset_kind(&protocol, &asset)?;
    let vault = protocol.escrow_mut();
    let minted = match kind {
        AssetKind::Fungible => vault.mint_fungible(&asset, &to, value),
        AssetKind::Unique => vault.mint_unique(&asset, &to, value),
    };
    minted.map_err(escrow_failure)?;
    tracing::info!("Minted {} of {} to {}", value, asset, to);
    balance(&protocol, asset, to)
}

/// POST /vault/assets/:asset/approve - Allow the protocol to pull from `owner`
pub async fn approve(
    State(state): State<AppState>,
    Path(asset): Path<String>,
    Json(request): Json<ApproveRequest>,
) -> ApiResult<BalanceResponse> {
    let asset = parse_address("asset", &asset)?;
    let owner = parse_address("owner", &request.owner)?;

    let mut protocol = state.protocol_mut().await;
    let approved = match asset_kind(&protocol, &asset)? {
        AssetKind::Fungible => {
            let raw = request.amount.as_deref().ok_or_else(|| {
                (
                    StatusCode::BAD_REQUEST,
                    Json(ApiError::bad_request("amount is required for fungible assets")),
                )
            })?;
            let amount = parse_amount_field("amount", raw)?;
            protocol.escrow_mut().approve(&asset, &owner, amount)
        }
        AssetKind::Unique => {
            let approved = request.approved.unwrap_or(true);
            protocol
                .escrow_mut()
                .set_approval_for_all(&asset, &owner, approved)
        }
    };
    approved.map_err(escrow_failure)?;
    balance(&protocol, asset, owner)
}
