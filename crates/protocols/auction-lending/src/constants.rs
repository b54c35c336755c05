//! Auction lending protocol constants and registry parameter keys.

use dutchlend_core::BasisPoints;

/// Shortest loan term in days
pub const MIN_DURATION_DAYS: u16 = 1;

/// Longest loan term in days (two years)
pub const MAX_DURATION_DAYS: u16 = 730;

/// Default protocol fee when no per-asset override is set (1%)
pub const DEFAULT_BASE_FEE_BP: BasisPoints = 100;

/// Registry custom parameter keys
pub mod params {
    /// Auction window in seconds (uint)
    pub const AUCTION_DURATION: u8 = 0;
    /// Operator treasury (address)
    pub const OPERATOR_TREASURY: u8 = 1;
    /// Operator fee override, stored as `bp + 1` so that 0 means unset (uint)
    pub const OPERATOR_FEE: u8 = 2;
}
