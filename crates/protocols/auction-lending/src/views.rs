//! Read-only queries over the loan ledger
//!
//! Listings page over `offset..offset + limit`, clamped to the collection.
//! Active sets reorder on removal, so a page taken after a mutation may not
//! line up with one taken before it.

use dutchlend_core::{Address, BasisPoints, Timestamp};

use crate::calculator;
use crate::error::LendingError;
use crate::escrow::AssetEscrow;
use crate::module::{LendingModule, Result};
use crate::registry::ParameterRegistry;
use crate::state::{Loan, LoanId, LoanPage, LoanState};

impl<R: ParameterRegistry, E: AssetEscrow> LendingModule<R, E> {
    pub fn loan(&self, id: LoanId) -> Result<&Loan> {
        let idx = self.index_of(id)?;
        Ok(&self.loans[idx])
    }

    pub fn loans_count(&self) -> usize {
        self.loans.len()
    }

    pub fn active_auctions_count(&self) -> usize {
        self.active_auctions.len()
    }

    pub fn active_loans_count(&self) -> usize {
        self.active_loans.len()
    }

    pub fn account_loans_count(&self, account: &Address) -> usize {
        self.account_loans.len_of(account)
    }

    /// Every loan ever created, in id order
    pub fn loans(&self, offset: usize, limit: usize) -> LoanPage {
        let start = offset.min(self.loans.len());
        let end = start.saturating_add(limit).min(self.loans.len());
        LoanPage {
            ids: (start..end).map(|idx| idx as LoanId).collect(),
            loans: self.loans[start..end].to_vec(),
        }
    }

    pub fn active_auctions(&self, offset: usize, limit: usize) -> LoanPage {
        self.page(self.active_auctions.paginate(offset, limit))
    }

    pub fn active_loans(&self, offset: usize, limit: usize) -> LoanPage {
        self.page(self.active_loans.paginate(offset, limit))
    }

    /// Loans where `account` is borrower or lender
    pub fn account_loans(&self, account: &Address, offset: usize, limit: usize) -> LoanPage {
        self.page(self.account_loans.paginate(account, offset, limit))
    }

    /// Rate an accept at `now` would lock in
    pub fn current_rate(&self, id: LoanId, now: Timestamp) -> Result<BasisPoints> {
        let loan = self.loan(id)?;
        if loan.state != LoanState::AuctionStarted {
            return Err(LendingError::InvalidLoanState {
                id,
                state: loan.state,
            });
        }
        let info = &loan.auction_info;
        calculator::current_interest_rate(
            now,
            info.start_timestamp,
            info.interest_rate_min,
            info.interest_rate_max,
            self.registry().auction_duration_seconds(),
        )
    }

    fn page(&self, ids: Vec<LoanId>) -> LoanPage {
        let loans = ids
            .iter()
            .filter_map(|id| usize::try_from(*id).ok())
            .filter_map(|idx| self.loans.get(idx).cloned())
            .collect();
        LoanPage { ids, loans }
    }
}

#[cfg(test)]
mod tests {
    use crate::module::tests::{Fixture, DAY, HOUR, T0};
    use crate::state::{LoanState, StartAuctionParams};
    use crate::LendingError;

    #[test]
    fn test_empty_listings() {
        let f = Fixture::new();
        assert_eq!(f.module.loans_count(), 0);
        assert!(f.module.loans(0, 10).is_empty());
        assert!(f.module.active_auctions(0, 10).is_empty());
        assert!(f.module.active_loans(5, 10).is_empty());
        assert!(f.module.account_loans(&f.borrower, 0, 10).is_empty());
        assert_eq!(f.module.loan(0), Err(LendingError::InvalidLoanId(0)));
    }

    #[test]
    fn test_loans_pagination() {
        let mut f = Fixture::new();
        for _ in 0..5 {
            f.start(f.params()).unwrap();
        }
        assert_eq!(f.module.loans(0, 2).ids, vec![0, 1]);
        assert_eq!(f.module.loans(3, 10).ids, vec![3, 4]);
        assert!(f.module.loans(5, 10).is_empty());
        assert!(f.module.loans(usize::MAX, usize::MAX).is_empty());
        assert_eq!(f.module.loans(1, usize::MAX).len(), 4);
    }

    #[test]
    fn test_active_sets_track_lifecycle() {
        let mut f = Fixture::new();
        for _ in 0..3 {
            f.start(f.params()).unwrap();
        }
        f.module.cancel_auction(&f.at(f.borrower, T0), 0).unwrap();
        f.module.accept(&f.at(f.lender, T0 + HOUR), 1).unwrap();

        // 0 removed: 2 swapped into its slot
        assert_eq!(f.module.active_auctions(0, 10).ids, vec![2]);
        assert_eq!(f.module.active_auctions_count(), 1);
        let active = f.module.active_loans(0, 10);
        assert_eq!(active.ids, vec![1]);
        assert_eq!(active.loans[0].state, LoanState::Issued);

        assert_eq!(f.module.account_loans_count(&f.borrower), 3);
        assert_eq!(f.module.account_loans_count(&f.lender), 1);
        assert_eq!(f.module.account_loans_count(&f.other), 0);

        // history keeps terminal loans
        f.module.repay(&f.at(f.borrower, T0 + DAY), 1).unwrap();
        assert!(f.module.active_loans(0, 10).is_empty());
        assert_eq!(f.module.account_loans(&f.lender, 0, 10).ids, vec![1]);
        assert_eq!(f.module.loans(0, 10).len(), 3);
    }

    #[test]
    fn test_current_rate() {
        let mut f = Fixture::new();
        let p = StartAuctionParams {
            interest_rate_min: 100,
            interest_rate_max: 1100,
            ..f.params()
        };
        let id = f.start(p).unwrap();
        assert_eq!(f.module.current_rate(id, T0).unwrap(), 100);
        assert_eq!(f.module.current_rate(id, T0 + 4 * HOUR).unwrap(), 600);
        assert_eq!(f.module.current_rate(id, T0 + 8 * HOUR).unwrap(), 1100);
        assert_eq!(f.module.current_rate(id, T0 + 100 * DAY).unwrap(), 1100);
        assert_eq!(
            f.module.current_rate(id, T0 - 1),
            Err(LendingError::InvalidTiming {
                now: T0 - 1,
                start: T0
            })
        );

        f.module.cancel_auction(&f.at(f.borrower, T0), id).unwrap();
        assert_eq!(
            f.module.current_rate(id, T0),
            Err(LendingError::InvalidLoanState {
                id,
                state: LoanState::AuctionCancelled
            })
        );
    }
}
