//! Error types for the auction lending protocol

use dutchlend_core::{Address, Amount, AssetKind};
use thiserror::Error;

use crate::escrow::Transfer;
use crate::state::{LoanId, LoanState};

/// Failures surfaced by asset escrow adapters
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EscrowError {
    #[error("Unknown asset {0}")]
    UnknownAsset(Address),

    #[error("Asset {asset} is {actual}, not {expected}")]
    WrongAssetKind {
        asset: Address,
        expected: AssetKind,
        actual: AssetKind,
    },

    #[error("Insufficient balance of {asset} for {account}: need {required}, have {available}")]
    InsufficientBalance {
        asset: Address,
        account: Address,
        required: Amount,
        available: Amount,
    },

    #[error("Insufficient allowance of {asset} from {owner}: need {required}, have {available}")]
    InsufficientAllowance {
        asset: Address,
        owner: Address,
        required: Amount,
        available: Amount,
    },

    #[error("{account} does not own token {token_id} of {asset}")]
    NotOwner {
        asset: Address,
        account: Address,
        token_id: Amount,
    },

    #[error("{owner} has not approved transfers of {asset}")]
    NotApproved { asset: Address, owner: Address },

    #[error("Token {token_id} of {asset} already exists")]
    AlreadyMinted { asset: Address, token_id: Amount },

    #[error("Unsolicited transfer of token {token_id} of {asset} into custody")]
    TransferNotAllowed { asset: Address, token_id: Amount },

    #[error("Balance overflow for {asset}")]
    Overflow { asset: Address },

    #[error("Settlement failed ({cause}) and undoing {leg:?} also failed: {undo}")]
    RollbackFailed {
        leg: Transfer,
        cause: Box<EscrowError>,
        undo: Box<EscrowError>,
    },
}

impl EscrowError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownAsset(_) => "unknown_asset",
            Self::WrongAssetKind { .. } => "wrong_asset_kind",
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::InsufficientAllowance { .. } => "insufficient_allowance",
            Self::NotOwner { .. } => "not_owner",
            Self::NotApproved { .. } => "not_approved",
            Self::AlreadyMinted { .. } => "already_minted",
            Self::TransferNotAllowed { .. } => "transfer_not_allowed",
            Self::Overflow { .. } => "arithmetic_overflow",
            Self::RollbackFailed { .. } => "rollback_failed",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::UnknownAsset(_) => 404,
            Self::AlreadyMinted { .. } => 409,
            Self::WrongAssetKind { .. } => 400,
            Self::RollbackFailed { .. } => 500,
            _ => 422,
        }
    }
}

/// Failures of the parameter registry's privileged setters
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Caller {0} is not a registry manager")]
    AuthFailed(Address),

    #[error("Zero address not allowed")]
    ZeroAddress,
}

impl RegistryError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AuthFailed(_) => "auth_failed",
            Self::ZeroAddress => "zero_address",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::AuthFailed(_) => 403,
            Self::ZeroAddress => 400,
        }
    }
}

/// Errors returned by the loan/auction state machine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LendingError {
    #[error("Loan {0} does not exist")]
    InvalidLoanId(LoanId),

    #[error("Loan {id} is {state}, operation not allowed")]
    InvalidLoanState { id: LoanId, state: LoanState },

    #[error("Caller {0} is not authorized for this loan")]
    AuthFailed(Address),

    #[error("Borrower cannot accept their own auction")]
    OwnAuction,

    #[error("Loan duration {0} days is outside 1..=730")]
    InvalidDuration(u16),

    #[error("Invalid interest rate range {min}..={max}")]
    InvalidInterestRate { min: u16, max: u16 },

    #[error("Invalid collateral: {0}")]
    InvalidCollateral(String),

    #[error("Invalid debt currency: {0}")]
    InvalidDebtCurrency(String),

    #[error("Collateral asset {asset} is {actual}, declared {declared}")]
    WrongAssetKind {
        asset: Address,
        declared: AssetKind,
        actual: AssetKind,
    },

    #[error("Asset {0} is not a supported collateral kind")]
    UnsupportedAssetKind(Address),

    #[error("Auction window ends at {ready_at}, now {now}")]
    TooEarly { ready_at: u64, now: u64 },

    #[error("New rate ceiling {new_max} must exceed {current_max}")]
    RateTooLow { new_max: u16, current_max: u16 },

    #[error("Loan {id} matures at {maturity}, cannot liquidate")]
    LoanStillActive { id: LoanId, maturity: u64 },

    #[error("Arithmetic overflow")]
    ArithmeticOverflow,

    #[error("Timestamp {now} precedes auction start {start}")]
    InvalidTiming { now: u64, start: u64 },

    #[error("Rate range {min}..={max} is inverted")]
    InvalidRange { min: u16, max: u16 },

    #[error("Escrow error: {0}")]
    Escrow(#[from] EscrowError),
}

impl LendingError {
    /// Get an HTTP-friendly error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidLoanId(_) => "invalid_loan_id",
            Self::InvalidLoanState { .. } => "invalid_loan_state",
            Self::AuthFailed(_) => "auth_failed",
            Self::OwnAuction => "own_auction",
            Self::InvalidDuration(_) => "invalid_loan_duration",
            Self::InvalidInterestRate { .. } => "invalid_interest_rate",
            Self::InvalidCollateral(_) => "invalid_collateral",
            Self::InvalidDebtCurrency(_) => "invalid_debt_currency",
            Self::WrongAssetKind { .. } => "wrong_asset_kind",
            Self::UnsupportedAssetKind(_) => "unsupported_asset_kind",
            Self::TooEarly { .. } => "too_early_update",
            Self::RateTooLow { .. } => "rate_too_low",
            Self::LoanStillActive { .. } => "loan_still_active",
            Self::ArithmeticOverflow => "arithmetic_overflow",
            Self::InvalidTiming { .. } => "invalid_timing",
            Self::InvalidRange { .. } => "invalid_range",
            Self::Escrow(e) => e.error_code(),
        }
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidLoanId(_) => 404,
            Self::AuthFailed(_) | Self::OwnAuction => 403,
            Self::InvalidDuration(_)
            | Self::InvalidInterestRate { .. }
            | Self::InvalidCollateral(_)
            | Self::InvalidDebtCurrency(_)
            | Self::WrongAssetKind { .. }
            | Self::UnsupportedAssetKind(_)
            | Self::RateTooLow { .. }
            | Self::InvalidRange { .. } => 400,
            Self::InvalidLoanState { .. }
            | Self::TooEarly { .. }
            | Self::LoanStillActive { .. }
            | Self::InvalidTiming { .. } => 409,
            Self::ArithmeticOverflow => 422,
            Self::Escrow(e) => e.status_code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lending_error_codes() {
        let err = LendingError::InvalidLoanId(7);
        assert_eq!(err.error_code(), "invalid_loan_id");
        assert_eq!(err.status_code(), 404);

        let err = LendingError::InvalidDuration(0);
        assert_eq!(err.error_code(), "invalid_loan_duration");
        assert_eq!(err.status_code(), 400);

        let err = LendingError::OwnAuction;
        assert_eq!(err.status_code(), 403);
    }

    #[test]
    fn test_escrow_error_passthrough() {
        let err: LendingError = EscrowError::TransferNotAllowed {
            asset: Address::from_low_u64(9),
            token_id: 3,
        }
        .into();
        assert_eq!(err.error_code(), "transfer_not_allowed");
        assert_eq!(err.status_code(), 422);
    }
}
