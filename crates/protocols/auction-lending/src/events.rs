//! Loan lifecycle events

use dutchlend_core::{Address, Amount, BasisPoints, Timestamp};
use serde::Serialize;

use crate::calculator::FeeSplit;
use crate::state::LoanId;

/// Emitted once per successful state transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum LoanEvent {
    #[serde(rename_all = "camelCase")]
    AuctionStarted { loan_id: LoanId, borrower: Address },
    #[serde(rename_all = "camelCase")]
    AuctionCancelled { loan_id: LoanId, borrower: Address },
    #[serde(rename_all = "camelCase")]
    AuctionInterestRateMaxUpdated {
        loan_id: LoanId,
        borrower: Address,
        new_max: BasisPoints,
        restarted_at: Timestamp,
    },
    #[serde(rename_all = "camelCase")]
    LoanIssued {
        loan_id: LoanId,
        lender: Address,
        interest_rate: BasisPoints,
        fees: FeeSplit,
    },
    #[serde(rename_all = "camelCase")]
    LoanRepaid {
        loan_id: LoanId,
        borrower: Address,
        total_debt: Amount,
    },
    #[serde(rename_all = "camelCase")]
    LoanLiquidated {
        loan_id: LoanId,
        liquidator: Address,
        lender: Address,
    },
}

impl LoanEvent {
    pub fn loan_id(&self) -> LoanId {
        match self {
            Self::AuctionStarted { loan_id, .. }
            | Self::AuctionCancelled { loan_id, .. }
            | Self::AuctionInterestRateMaxUpdated { loan_id, .. }
            | Self::LoanIssued { loan_id, .. }
            | Self::LoanRepaid { loan_id, .. }
            | Self::LoanLiquidated { loan_id, .. } => *loan_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::AuctionStarted { .. } => "AuctionStarted",
            Self::AuctionCancelled { .. } => "AuctionCancelled",
            Self::AuctionInterestRateMaxUpdated { .. } => "AuctionInterestRateMaxUpdated",
            Self::LoanIssued { .. } => "LoanIssued",
            Self::LoanRepaid { .. } => "LoanRepaid",
            Self::LoanLiquidated { .. } => "LoanLiquidated",
        }
    }
}
