//! Auction lending protocol state types

use std::fmt;

use dutchlend_core::constants::SECONDS_PER_DAY;
use dutchlend_core::{Address, Amount, AssetKind, BasisPoints, Timestamp};
use serde::{Deserialize, Serialize};

/// Loan identifier, equal to the loan's position in the ledger
pub type LoanId = u64;

/// Lifecycle of a loan.
///
/// `NotCreated -> AuctionStarted -> {AuctionCancelled | Issued}`,
/// `Issued -> {Finished | Liquidated}`. No state is re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LoanState {
    #[default]
    NotCreated,
    AuctionStarted,
    AuctionCancelled,
    Issued,
    Finished,
    Liquidated,
}

impl LoanState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotCreated => "notCreated",
            Self::AuctionStarted => "auctionStarted",
            Self::AuctionCancelled => "auctionCancelled",
            Self::Issued => "issued",
            Self::Finished => "finished",
            Self::Liquidated => "liquidated",
        }
    }

    /// Whether `next` is a legal successor of `self`
    pub fn can_transition_to(&self, next: LoanState) -> bool {
        matches!(
            (self, next),
            (Self::NotCreated, Self::AuctionStarted)
                | (Self::AuctionStarted, Self::AuctionCancelled)
                | (Self::AuctionStarted, Self::Issued)
                | (Self::Issued, Self::Finished)
                | (Self::Issued, Self::Liquidated)
        )
    }

    /// No further mutation is possible from this state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::NotCreated | Self::AuctionCancelled | Self::Finished | Self::Liquidated
        )
    }
}

impl fmt::Display for LoanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Auction parameters, fixed at creation except for ceiling extensions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionInfo {
    /// Creator of the auction; holds cancel and repay rights
    pub borrower: Address,
    /// Creation time, or the time of the latest ceiling extension
    pub start_timestamp: Timestamp,
    pub interest_rate_min: BasisPoints,
    pub interest_rate_max: BasisPoints,
}

/// Collateral posted by the borrower
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Collateral {
    #[serde(rename_all = "camelCase")]
    Fungible { asset: Address, amount: Amount },
    #[serde(rename_all = "camelCase")]
    Unique { asset: Address, token_id: Amount },
}

impl Collateral {
    /// Build from the flat (kind, asset, id-or-amount) triple
    pub fn new(kind: AssetKind, asset: Address, id_or_amount: Amount) -> Self {
        match kind {
            AssetKind::Fungible => Self::Fungible {
                asset,
                amount: id_or_amount,
            },
            AssetKind::Unique => Self::Unique {
                asset,
                token_id: id_or_amount,
            },
        }
    }

    pub fn kind(&self) -> AssetKind {
        match self {
            Self::Fungible { .. } => AssetKind::Fungible,
            Self::Unique { .. } => AssetKind::Unique,
        }
    }

    pub fn asset(&self) -> Address {
        match self {
            Self::Fungible { asset, .. } | Self::Unique { asset, .. } => *asset,
        }
    }

    pub fn id_or_amount(&self) -> Amount {
        match self {
            Self::Fungible { amount, .. } => *amount,
            Self::Unique { token_id, .. } => *token_id,
        }
    }
}

/// A loan record. Never deleted; terminal states stay as history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    pub auction_info: AuctionInfo,
    pub state: LoanState,
    /// Loan term once issued, 1..=730
    pub duration_days: u16,
    /// 0 until funded
    pub issued_timestamp: Timestamp,
    /// Rate locked in at funding, 0 until then
    pub interest_rate: BasisPoints,
    pub collateral: Collateral,
    /// Zero until funded
    pub lender: Address,
    pub debt_asset: Address,
    /// Principal supplied by the lender
    pub debt_amount: Amount,
}

impl Loan {
    pub fn borrower(&self) -> Address {
        self.auction_info.borrower
    }

    /// Time after which an issued loan may be liquidated
    pub fn maturity_timestamp(&self) -> Timestamp {
        self.issued_timestamp
            .saturating_add(u64::from(self.duration_days) * SECONDS_PER_DAY)
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// Caller identity and clock reading for one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    pub caller: Address,
    /// Read once per call and used throughout it
    pub now: Timestamp,
}

impl CallContext {
    pub fn new(caller: Address, now: Timestamp) -> Self {
        Self { caller, now }
    }
}

/// Borrower-supplied terms for a new auction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartAuctionParams {
    pub duration_days: u16,
    pub interest_rate_min: BasisPoints,
    pub interest_rate_max: BasisPoints,
    pub collateral: Collateral,
    pub debt_asset: Address,
    pub debt_amount: Amount,
}

/// One page of a paginated listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanPage {
    pub ids: Vec<LoanId>,
    pub loans: Vec<Loan>,
}

impl LoanPage {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
