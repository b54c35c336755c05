//! API route handlers

pub mod health;
pub mod loans;
pub mod parameters;
pub mod vault;

use axum::{http::StatusCode, routing::get, Json, Router};

use auction_lending::{EscrowError, LendingError};
use dutchlend_core::{parse_amount, Address, Amount};

use crate::dto::ApiError;
use crate::AppState;

/// Error half of every handler's return type
pub type ApiFailure = (StatusCode, Json<ApiError>);

/// Create the API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/parameters", get(parameters::get_parameters))
        .merge(loans::router())
        .nest("/vault", vault::router())
        .with_state(state)
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

pub(crate) fn lending_failure(e: LendingError) -> ApiFailure {
    tracing::warn!("Rejected loan operation: {}", e);
    (
        status(e.status_code()),
        Json(ApiError::new(e.error_code(), e.to_string())),
    )
}

pub(crate) fn escrow_failure(e: EscrowError) -> ApiFailure {
    tracing::warn!("Rejected vault operation: {}", e);
    (
        status(e.status_code()),
        Json(ApiError::new(e.error_code(), e.to_string())),
    )
}

pub(crate) fn parse_address(field: &str, value: &str) -> Result<Address, ApiFailure> {
    value.parse().map_err(|e: dutchlend_core::Error| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiError::new(e.error_code(), format!("{}: {}", field, e))),
        )
    })
}

pub(crate) fn parse_amount_field(field: &str, value: &str) -> Result<Amount, ApiFailure> {
    parse_amount(value).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiError::new(e.error_code(), format!("{}: {}", field, e))),
        )
    })
}
