//! Data Transfer Objects for API requests and responses
//!
//! Amounts and token ids travel as decimal strings so that 128-bit values
//! survive JSON clients that parse numbers as doubles.

use auction_lending::{total_debt, Collateral, Loan, LoanId, LoanPage, LoanState};
use dutchlend_core::{Address, AssetKind, BasisPoints, Timestamp};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Generic API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("not_found", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("bad_request", message)
    }
}

// =============================================================================
// Parameters
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDto {
    pub address: Address,
    pub kind: AssetKind,
    pub symbol: String,
    /// Effective fee charged when this asset is borrowed
    pub fee_bp: BasisPoints,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParametersResponse {
    pub custody_address: Address,
    pub auction_duration_secs: u64,
    pub base_fee_bp: BasisPoints,
    pub community_treasury: Address,
    pub operator_treasury: Address,
    /// None when fees are split evenly
    pub operator_fee_bp: Option<BasisPoints>,
    pub assets: Vec<AssetDto>,
}

// =============================================================================
// Loans
// =============================================================================

/// Pagination query, `?offset=0&limit=20`
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}

/// Maximum page size served in one response
pub const MAX_PAGE_LIMIT: usize = 500;

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: default_limit(),
        }
    }
}

impl PageQuery {
    pub fn clamped_limit(&self) -> usize {
        self.limit.min(MAX_PAGE_LIMIT)
    }
}

/// `?at=<timestamp>` for rate quotes; defaults to now
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RateQuery {
    pub at: Option<Timestamp>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollateralDto {
    pub kind: AssetKind,
    pub asset: Address,
    /// Token id for unique assets, amount for fungible ones
    pub id_or_amount: String,
}

impl From<&Collateral> for CollateralDto {
    fn from(c: &Collateral) -> Self {
        Self {
            kind: c.kind(),
            asset: c.asset(),
            id_or_amount: c.id_or_amount().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanDto {
    pub id: LoanId,
    pub state: LoanState,
    pub borrower: Address,
    pub start_timestamp: Timestamp,
    pub interest_rate_min: BasisPoints,
    pub interest_rate_max: BasisPoints,
    pub duration_days: u16,
    pub collateral: CollateralDto,
    pub debt_asset: Address,
    pub debt_amount: String,
    pub lender: Option<Address>,
    pub issued_timestamp: Option<Timestamp>,
    pub interest_rate: Option<BasisPoints>,
    pub maturity_timestamp: Option<Timestamp>,
    /// Repayment amount at the locked-in rate
    pub total_debt: Option<String>,
}

impl LoanDto {
    pub fn from_loan(id: LoanId, loan: &Loan) -> Self {
        let funded = !matches!(
            loan.state,
            LoanState::NotCreated | LoanState::AuctionStarted | LoanState::AuctionCancelled
        );
        let info = &loan.auction_info;
        Self {
            id,
            state: loan.state,
            borrower: info.borrower,
            start_timestamp: info.start_timestamp,
            interest_rate_min: info.interest_rate_min,
            interest_rate_max: info.interest_rate_max,
            duration_days: loan.duration_days,
            collateral: CollateralDto::from(&loan.collateral),
            debt_asset: loan.debt_asset,
            debt_amount: loan.debt_amount.to_string(),
            lender: funded.then_some(loan.lender),
            issued_timestamp: funded.then_some(loan.issued_timestamp),
            interest_rate: funded.then_some(loan.interest_rate),
            maturity_timestamp: funded.then(|| loan.maturity_timestamp()),
            total_debt: funded
                .then(|| total_debt(loan.debt_amount, loan.interest_rate, loan.duration_days).ok())
                .flatten()
                .map(|v| v.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanPageResponse {
    pub offset: usize,
    pub limit: usize,
    /// Size of the whole listing, not of this page
    pub total: usize,
    pub loans: Vec<LoanDto>,
}

impl LoanPageResponse {
    pub fn new(page: &LoanPage, query: &PageQuery, total: usize) -> Self {
        Self {
            offset: query.offset,
            limit: query.clamped_limit(),
            total,
            loans: page
                .ids
                .iter()
                .zip(&page.loans)
                .map(|(id, loan)| LoanDto::from_loan(*id, loan))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanCountResponse {
    pub loans: usize,
    pub active_auctions: usize,
    pub active_loans: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateResponse {
    pub loan_id: LoanId,
    pub at: Timestamp,
    pub interest_rate: BasisPoints,
    pub apr_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartAuctionRequest {
    pub caller: String,
    pub duration_days: u16,
    pub interest_rate_min: BasisPoints,
    pub interest_rate_max: BasisPoints,
    pub collateral: CollateralDto,
    pub debt_asset: String,
    pub debt_amount: String,
}

/// Body for loan actions that need nothing but the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerRequest {
    pub caller: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CeilingRequest {
    pub caller: String,
    pub new_max: BasisPoints,
}

// =============================================================================
// Vault
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintRequest {
    pub to: String,
    /// Token id for unique assets, amount for fungible ones
    pub id_or_amount: String,
}

/// Fungible assets take `amount`; unique assets take `approved`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveRequest {
    pub owner: String,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub approved: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub asset: Address,
    pub account: Address,
    pub kind: AssetKind,
    /// Token count for unique assets
    pub balance: String,
    /// Remaining allowance granted to the protocol (fungible only)
    pub allowance: Option<String>,
}
