//! Pricing engine
//!
//! Pure fixed-point math for the Dutch-auction rate, loan debt, and fee split.
//! No I/O, no registry access - callers pass the parameters in.

use dutchlend_core::constants::{BASIS_POINTS_DENOM, DAYS_PER_YEAR};
use dutchlend_core::{Amount, BasisPoints, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::LendingError;

/// Interest rate implied by how far the auction has progressed.
///
/// Linear from `min` at `start` to `max` at `start + window`, floor-rounded,
/// then flat at `max`. A zero window prices at `max` immediately.
pub fn current_interest_rate(
    now: Timestamp,
    start: Timestamp,
    min: BasisPoints,
    max: BasisPoints,
    window: u64,
) -> Result<BasisPoints, LendingError> {
    if now < start {
        return Err(LendingError::InvalidTiming { now, start });
    }
    if min > max {
        return Err(LendingError::InvalidRange { min, max });
    }

    let elapsed = now - start;
    if elapsed >= window {
        return Ok(max);
    }

    // elapsed < window, so the increment is strictly below (max - min)
    let spread = u128::from(max - min);
    let increment = spread * u128::from(elapsed) / u128::from(window);
    Ok(min + increment as BasisPoints)
}

/// Simple interest prorated by day: `principal * rate * days / (10000 * 365)`.
///
/// Multiply first, divide once. Small principals can truncate to zero
/// interest (1000 units at 1% for 30 days owes exactly 1000).
pub fn interest_for(
    principal: Amount,
    rate_bp: BasisPoints,
    duration_days: u16,
) -> Result<Amount, LendingError> {
    principal
        .checked_mul(u128::from(rate_bp))
        .and_then(|v| v.checked_mul(u128::from(duration_days)))
        .map(|v| v / (BASIS_POINTS_DENOM * DAYS_PER_YEAR))
        .ok_or(LendingError::ArithmeticOverflow)
}

/// Principal plus prorated interest owed at repayment
pub fn total_debt(
    principal: Amount,
    rate_bp: BasisPoints,
    duration_days: u16,
) -> Result<Amount, LendingError> {
    let interest = interest_for(principal, rate_bp, duration_days)?;
    principal
        .checked_add(interest)
        .ok_or(LendingError::ArithmeticOverflow)
}

/// How a funded principal is divided between treasuries and the borrower
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeSplit {
    pub community: Amount,
    pub operator: Amount,
    /// Amount forwarded to the borrower
    pub net: Amount,
}

impl FeeSplit {
    pub fn total_fee(&self) -> Amount {
        self.community + self.operator
    }
}

fn bp_of(amount: Amount, bp: BasisPoints) -> Result<Amount, LendingError> {
    amount
        .checked_mul(u128::from(bp))
        .map(|v| v / BASIS_POINTS_DENOM)
        .ok_or(LendingError::ArithmeticOverflow)
}

/// Split `amount` into community fee, operator fee and net.
///
/// `operator_override` is tri-state: `None` splits the fee evenly (operator
/// takes the floor half, community the rest); `Some(bp)` gives the operator
/// `amount * bp / 10000` capped at the total fee, `Some(0)` included.
pub fn fee_split(
    amount: Amount,
    fee_bp: BasisPoints,
    operator_override: Option<BasisPoints>,
) -> Result<FeeSplit, LendingError> {
    let total_fee = bp_of(amount, fee_bp)?.min(amount);

    let operator = match operator_override {
        None => total_fee / 2,
        Some(op_bp) => bp_of(amount, op_bp)?.min(total_fee),
    };
    let community = total_fee - operator;

    Ok(FeeSplit {
        community,
        operator,
        net: amount - total_fee,
    })
}

/// Annual percentage for a basis-point rate, for display
pub fn calculate_apr_percent(rate_bp: BasisPoints) -> f64 {
    f64::from(rate_bp) / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: u64 = 3600;
    const WINDOW: u64 = 8 * HOUR;

    #[test]
    fn test_rate_decay_scenario() {
        // min 100, max 1100 over an 8h window
        assert_eq!(current_interest_rate(0, 0, 100, 1100, WINDOW).unwrap(), 100);
        assert_eq!(current_interest_rate(HOUR, 0, 100, 1100, WINDOW).unwrap(), 225);
        assert_eq!(current_interest_rate(2 * HOUR, 0, 100, 1100, WINDOW).unwrap(), 350);
        assert_eq!(current_interest_rate(4 * HOUR, 0, 100, 1100, WINDOW).unwrap(), 600);
        assert_eq!(current_interest_rate(WINDOW, 0, 100, 1100, WINDOW).unwrap(), 1100);
        assert_eq!(
            current_interest_rate(WINDOW * 3, 0, 100, 1100, WINDOW).unwrap(),
            1100
        );
    }

    #[test]
    fn test_rate_with_offset_start() {
        let start = 1_700_000_000;
        assert_eq!(
            current_interest_rate(start + 4 * HOUR, start, 100, 1100, WINDOW).unwrap(),
            600
        );
    }

    #[test]
    fn test_rate_floor_rounding() {
        // 1 bp spread, one second in: floor(1 * 1 / 28800) = 0
        assert_eq!(current_interest_rate(1, 0, 10, 11, WINDOW).unwrap(), 10);
        assert_eq!(current_interest_rate(WINDOW - 1, 0, 10, 11, WINDOW).unwrap(), 10);
        assert_eq!(current_interest_rate(WINDOW, 0, 10, 11, WINDOW).unwrap(), 11);
    }

    #[test]
    fn test_rate_monotonic_and_bounded() {
        let mut prev = 0;
        for t in (0..=WINDOW + HOUR).step_by(97) {
            let rate = current_interest_rate(t, 0, 1, u16::MAX, WINDOW).unwrap();
            assert!(rate >= prev);
            assert!((1..=u16::MAX).contains(&rate));
            prev = rate;
        }
    }

    #[test]
    fn test_rate_errors() {
        assert_eq!(
            current_interest_rate(5, 10, 1, 2, WINDOW),
            Err(LendingError::InvalidTiming { now: 5, start: 10 })
        );
        assert_eq!(
            current_interest_rate(10, 10, 3, 2, WINDOW),
            Err(LendingError::InvalidRange { min: 3, max: 2 })
        );
    }

    #[test]
    fn test_rate_zero_window() {
        assert_eq!(current_interest_rate(10, 10, 100, 200, 0).unwrap(), 200);
    }

    #[test]
    fn test_total_debt_scenarios() {
        assert_eq!(total_debt(1_000_000, 100, 365).unwrap(), 1_010_000);
        assert_eq!(total_debt(1_000_000, 100, 30).unwrap(), 1_000_821);
        assert_eq!(total_debt(1_000, 100, 30).unwrap(), 1_000);
    }

    #[test]
    fn test_total_debt_zero_rate() {
        for days in [1u16, 30, 365, 730] {
            assert_eq!(total_debt(123_456_789, 0, days).unwrap(), 123_456_789);
        }
    }

    #[test]
    fn test_total_debt_monotonic() {
        let base = total_debt(1_000_000, 500, 90).unwrap();
        assert!(total_debt(1_000_001, 500, 90).unwrap() >= base);
        assert!(total_debt(1_000_000, 501, 90).unwrap() >= base);
        assert!(total_debt(1_000_000, 500, 91).unwrap() >= base);
    }

    #[test]
    fn test_total_debt_overflow() {
        assert_eq!(
            total_debt(u128::MAX, 100, 30),
            Err(LendingError::ArithmeticOverflow)
        );
    }

    #[test]
    fn test_fee_split_even() {
        let split = fee_split(1_000_000, 100, None).unwrap();
        assert_eq!(
            split,
            FeeSplit {
                community: 5000,
                operator: 5000,
                net: 990_000
            }
        );
    }

    #[test]
    fn test_fee_split_odd_total_goes_to_community() {
        // total fee 101 -> operator 50, community 51
        let split = fee_split(10_100, 100, None).unwrap();
        assert_eq!(split.operator, 50);
        assert_eq!(split.community, 51);
        assert_eq!(split.net, 9_999);
    }

    #[test]
    fn test_fee_split_operator_override() {
        let split = fee_split(1_000_000, 100, Some(1)).unwrap();
        assert_eq!(
            split,
            FeeSplit {
                community: 9900,
                operator: 100,
                net: 990_000
            }
        );
    }

    #[test]
    fn test_fee_split_explicit_zero_override() {
        let split = fee_split(1_000_000, 100, Some(0)).unwrap();
        assert_eq!(split.operator, 0);
        assert_eq!(split.community, 10_000);
    }

    #[test]
    fn test_fee_split_override_clamped() {
        // operator asks for 5%, total fee is only 1%
        let split = fee_split(1_000_000, 100, Some(500)).unwrap();
        assert_eq!(split.operator, 10_000);
        assert_eq!(split.community, 0);
    }

    #[test]
    fn test_fee_split_conserves_amount() {
        for amount in [0u128, 1, 7, 999, 10_001, 1_000_000, 123_456_789_012] {
            for fee in [0u16, 1, 100, 250, 10_000] {
                for op in [None, Some(0), Some(1), Some(50), Some(10_000)] {
                    let s = fee_split(amount, fee, op).unwrap();
                    assert_eq!(s.community + s.operator + s.net, amount);
                }
            }
        }
    }

    #[test]
    fn test_fee_split_overflow() {
        assert_eq!(
            fee_split(u128::MAX, 100, None),
            Err(LendingError::ArithmeticOverflow)
        );
    }

    #[test]
    fn test_apr_percent() {
        assert!((calculate_apr_percent(1100) - 11.0).abs() < f64::EPSILON);
    }
}
