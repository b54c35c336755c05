//! Dutch-auction collateralized lending
//!
//! A borrower locks collateral and opens an auction for a fixed principal.
//! The offered interest rate climbs linearly from a floor to a ceiling over
//! the auction window; the first lender to accept funds the loan at the
//! rate in force at that moment. The borrower repays principal plus
//! prorated interest before maturity, or anyone may hand the collateral to
//! the lender after it.
//!
//! # Layout
//!
//! - [`calculator`] - rate decay, interest and fee math
//! - [`module`] - the loan state machine
//! - [`views`] - ledger queries and pagination
//! - [`registry`] - protocol parameters and fee configuration
//! - [`escrow`] - asset movement and the in-memory [`Vault`]

pub mod calculator;
pub mod constants;
pub mod error;
pub mod escrow;
pub mod events;
pub mod index_set;
pub mod module;
pub mod registry;
pub mod state;
pub mod views;

pub use calculator::{
    calculate_apr_percent, current_interest_rate, fee_split, interest_for, total_debt, FeeSplit,
};
pub use error::{EscrowError, LendingError, RegistryError};
pub use escrow::{AssetEscrow, AssetInfo, Transfer, Vault};
pub use events::LoanEvent;
pub use index_set::{AccountIndex, LoanIdSet};
pub use module::LendingModule;
pub use registry::{AssetCustomFee, ParameterRegistry, ParametersStorage};
pub use state::{
    AuctionInfo, CallContext, Collateral, Loan, LoanId, LoanPage, LoanState, StartAuctionParams,
};
