//! Loan/auction state machine
//!
//! Six operations drive a loan through its lifecycle:
//! 1. Start Auction - borrower locks collateral and opens a rate auction
//! 2. Cancel Auction - borrower withdraws an unfunded auction
//! 3. Update Interest Ceiling - borrower raises the max rate after the window
//! 4. Accept - lender funds the loan at the current auction rate
//! 5. Repay - borrower repays principal plus interest, collateral returned
//! 6. Liquidate - anyone hands an overdue loan's collateral to the lender
//!
//! Every operation checks the loan id first, then the caller's role, then the
//! loan state. Asset legs are settled as one batch before any ledger or index
//! write, so a failed operation leaves nothing behind.

use dutchlend_core::{Address, AssetKind};

use crate::calculator::{self, FeeSplit};
use crate::constants::{MAX_DURATION_DAYS, MIN_DURATION_DAYS};
use crate::error::LendingError;
use crate::escrow::{AssetEscrow, Transfer};
use crate::events::LoanEvent;
use crate::index_set::{AccountIndex, LoanIdSet};
use crate::registry::ParameterRegistry;
use crate::state::{AuctionInfo, CallContext, Loan, LoanId, LoanState, StartAuctionParams};

pub type Result<T> = std::result::Result<T, LendingError>;

/// The lending protocol: loan ledger, index sets, and the collaborators it
/// prices and settles through.
#[derive(Debug)]
pub struct LendingModule<R, E> {
    registry: R,
    escrow: E,
    /// Append-only; a loan's id is its position
    pub(crate) loans: Vec<Loan>,
    pub(crate) active_auctions: LoanIdSet,
    pub(crate) active_loans: LoanIdSet,
    pub(crate) account_loans: AccountIndex,
    events: Vec<LoanEvent>,
}

impl<R: ParameterRegistry, E: AssetEscrow> LendingModule<R, E> {
    pub fn new(registry: R, escrow: E) -> Self {
        Self {
            registry,
            escrow,
            loans: Vec::new(),
            active_auctions: LoanIdSet::new(),
            active_loans: LoanIdSet::new(),
            account_loans: AccountIndex::new(),
            events: Vec::new(),
        }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut R {
        &mut self.registry
    }

    pub fn escrow(&self) -> &E {
        &self.escrow
    }

    pub fn escrow_mut(&mut self) -> &mut E {
        &mut self.escrow
    }

    /// Events emitted since creation or the last `take_events`
    pub fn events(&self) -> &[LoanEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<LoanEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn index_of(&self, id: LoanId) -> Result<usize> {
        usize::try_from(id)
            .ok()
            .filter(|idx| *idx < self.loans.len())
            .ok_or(LendingError::InvalidLoanId(id))
    }

    fn ensure_borrower(loan: &Loan, caller: &Address) -> Result<()> {
        if loan.auction_info.borrower != *caller {
            return Err(LendingError::AuthFailed(*caller));
        }
        Ok(())
    }

    fn ensure_state(id: LoanId, loan: &Loan, expected: LoanState) -> Result<()> {
        if loan.state != expected {
            return Err(LendingError::InvalidLoanState {
                id,
                state: loan.state,
            });
        }
        Ok(())
    }

    /// Reject `loan` unless `next` is a legal successor of its state. Checked
    /// before any leg settles, so an illegal move never touches the escrow.
    fn ensure_can_transition(id: LoanId, loan: &Loan, next: LoanState) -> Result<()> {
        if !loan.state.can_transition_to(next) {
            return Err(LendingError::InvalidLoanState {
                id,
                state: loan.state,
            });
        }
        Ok(())
    }

    /// Only called after [`Self::ensure_can_transition`] passed for `next`.
    fn transition(&mut self, idx: usize, next: LoanState) {
        let loan = &mut self.loans[idx];
        debug_assert!(
            loan.state.can_transition_to(next),
            "illegal transition {} -> {}",
            loan.state,
            next
        );
        loan.state = next;
    }

    fn emit(&mut self, event: LoanEvent) {
        tracing::debug!("Loan {} event {}", event.loan_id(), event.name());
        self.events.push(event);
    }

    fn settle(&mut self, legs: &[Transfer]) -> Result<()> {
        tracing::debug!("Settling {} transfer legs", legs.len());
        self.escrow.settle(legs)?;
        Ok(())
    }

    /// Fee split for funding `loan` under the current registry parameters
    pub fn quote_fees(&self, loan: &Loan) -> Result<FeeSplit> {
        calculator::fee_split(
            loan.debt_amount,
            self.registry.asset_fee_basis_points(&loan.debt_asset),
            self.registry.operator_fee_override(),
        )
    }

    // =========================================================================
    // Start Auction
    // =========================================================================

    pub fn start_auction(&mut self, ctx: &CallContext, params: StartAuctionParams) -> Result<LoanId> {
        if !(MIN_DURATION_DAYS..=MAX_DURATION_DAYS).contains(&params.duration_days) {
            return Err(LendingError::InvalidDuration(params.duration_days));
        }

        let (min, max) = (params.interest_rate_min, params.interest_rate_max);
        if min == 0 || min > max {
            return Err(LendingError::InvalidInterestRate { min, max });
        }

        let collateral = params.collateral;
        let collateral_asset = collateral.asset();
        if collateral_asset.is_zero() {
            return Err(LendingError::InvalidCollateral(
                "collateral asset is the zero address".to_string(),
            ));
        }
        if let (AssetKind::Fungible, 0) = (collateral.kind(), collateral.id_or_amount()) {
            return Err(LendingError::InvalidCollateral(
                "collateral amount must be positive".to_string(),
            ));
        }
        match self.escrow.asset_kind(&collateral_asset) {
            None => return Err(LendingError::UnsupportedAssetKind(collateral_asset)),
            Some(actual) if actual != collateral.kind() => {
                return Err(LendingError::WrongAssetKind {
                    asset: collateral_asset,
                    declared: collateral.kind(),
                    actual,
                })
            }
            Some(_) => {}
        }

        if params.debt_asset.is_zero() {
            return Err(LendingError::InvalidDebtCurrency(
                "debt asset is the zero address".to_string(),
            ));
        }
        if params.debt_amount == 0 {
            return Err(LendingError::InvalidDebtCurrency(
                "debt amount must be positive".to_string(),
            ));
        }
        if self.escrow.asset_kind(&params.debt_asset) != Some(AssetKind::Fungible) {
            return Err(LendingError::InvalidDebtCurrency(format!(
                "{} is not a fungible asset",
                params.debt_asset
            )));
        }

        let loan = Loan {
            auction_info: AuctionInfo {
                borrower: ctx.caller,
                start_timestamp: ctx.now,
                interest_rate_min: min,
                interest_rate_max: max,
            },
            state: LoanState::AuctionStarted,
            duration_days: params.duration_days,
            issued_timestamp: 0,
            interest_rate: 0,
            collateral,
            lender: Address::ZERO,
            debt_asset: params.debt_asset,
            debt_amount: params.debt_amount,
        };

        // Funding and repayment must stay representable at the highest rate
        calculator::total_debt(loan.debt_amount, max, loan.duration_days)?;
        self.quote_fees(&loan)?;

        self.settle(&[Transfer::lock(
            collateral.kind(),
            collateral_asset,
            ctx.caller,
            collateral.id_or_amount(),
        )])?;

        let id = self.loans.len() as LoanId;
        self.loans.push(loan);
        self.active_auctions.insert(id);
        self.account_loans.insert(ctx.caller, id);

        tracing::info!(
            "Auction {} started by {}: {} of {} for {} bp..{} bp over {} days",
            id,
            ctx.caller,
            params.debt_amount,
            params.debt_asset,
            min,
            max,
            params.duration_days
        );
        self.emit(LoanEvent::AuctionStarted {
            loan_id: id,
            borrower: ctx.caller,
        });
        Ok(id)
    }

    // =========================================================================
    // Cancel Auction
    // =========================================================================

    pub fn cancel_auction(&mut self, ctx: &CallContext, id: LoanId) -> Result<()> {
        let idx = self.index_of(id)?;
        let loan = &self.loans[idx];
        Self::ensure_borrower(loan, &ctx.caller)?;
        Self::ensure_can_transition(id, loan, LoanState::AuctionCancelled)?;

        let collateral = loan.collateral;
        self.settle(&[Transfer::release(
            collateral.kind(),
            collateral.asset(),
            ctx.caller,
            collateral.id_or_amount(),
        )])?;

        self.transition(idx, LoanState::AuctionCancelled);
        self.active_auctions.remove(id);

        tracing::info!("Auction {} cancelled by {}", id, ctx.caller);
        self.emit(LoanEvent::AuctionCancelled {
            loan_id: id,
            borrower: ctx.caller,
        });
        Ok(())
    }

    // =========================================================================
    // Update Interest Ceiling
    // =========================================================================

    /// Raise the auction's max rate once the current window has fully run,
    /// restarting the decay from now. The min rate is kept.
    pub fn update_interest_ceiling(
        &mut self,
        ctx: &CallContext,
        id: LoanId,
        new_max: u16,
    ) -> Result<()> {
        let idx = self.index_of(id)?;
        let loan = &self.loans[idx];
        Self::ensure_borrower(loan, &ctx.caller)?;
        Self::ensure_state(id, loan, LoanState::AuctionStarted)?;

        let ready_at = loan
            .auction_info
            .start_timestamp
            .saturating_add(self.registry.auction_duration_seconds());
        if ctx.now < ready_at {
            return Err(LendingError::TooEarly {
                ready_at,
                now: ctx.now,
            });
        }

        let current_max = loan.auction_info.interest_rate_max;
        if new_max <= current_max {
            return Err(LendingError::RateTooLow {
                new_max,
                current_max,
            });
        }
        calculator::total_debt(loan.debt_amount, new_max, loan.duration_days)?;

        let info = &mut self.loans[idx].auction_info;
        info.start_timestamp = ctx.now;
        info.interest_rate_max = new_max;

        tracing::info!(
            "Auction {} ceiling raised {} -> {} bp, window restarted at {}",
            id,
            current_max,
            new_max,
            ctx.now
        );
        self.emit(LoanEvent::AuctionInterestRateMaxUpdated {
            loan_id: id,
            borrower: ctx.caller,
            new_max,
            restarted_at: ctx.now,
        });
        Ok(())
    }

    // =========================================================================
    // Accept
    // =========================================================================

    /// Fund an open auction at the rate its elapsed time implies.
    ///
    /// The lender pays the borrower the net principal and each treasury its
    /// fee share directly; nothing passes through custody.
    pub fn accept(&mut self, ctx: &CallContext, id: LoanId) -> Result<()> {
        let idx = self.index_of(id)?;
        let loan = &self.loans[idx];
        if loan.auction_info.borrower == ctx.caller {
            return Err(LendingError::OwnAuction);
        }
        Self::ensure_can_transition(id, loan, LoanState::Issued)?;

        let info = &loan.auction_info;
        let rate = calculator::current_interest_rate(
            ctx.now,
            info.start_timestamp,
            info.interest_rate_min,
            info.interest_rate_max,
            self.registry.auction_duration_seconds(),
        )?;
        let fees = self.quote_fees(loan)?;
        tracing::debug!(
            "Loan {} priced at {} bp, fees community={} operator={} net={}",
            id,
            rate,
            fees.community,
            fees.operator,
            fees.net
        );

        let asset = loan.debt_asset;
        let borrower = info.borrower;
        let lender = ctx.caller;
        let legs: Vec<Transfer> = [
            (borrower, fees.net),
            (self.registry.community_treasury(), fees.community),
            (self.registry.operator_treasury(), fees.operator),
        ]
        .into_iter()
        .filter(|(_, amount)| *amount > 0)
        .map(|(to, amount)| Transfer::MoveFungible {
            asset,
            from: lender,
            to,
            amount,
        })
        .collect();
        self.settle(&legs)?;

        let loan = &mut self.loans[idx];
        loan.issued_timestamp = ctx.now;
        loan.interest_rate = rate;
        loan.lender = lender;
        self.transition(idx, LoanState::Issued);
        self.active_auctions.remove(id);
        self.active_loans.insert(id);
        self.account_loans.insert(lender, id);

        tracing::info!("Loan {} issued by {} at {} bp", id, lender, rate);
        self.emit(LoanEvent::LoanIssued {
            loan_id: id,
            lender,
            interest_rate: rate,
            fees,
        });
        Ok(())
    }

    // =========================================================================
    // Repay
    // =========================================================================

    /// Pay the lender principal plus interest (no fee) and take back the
    /// collateral.
    pub fn repay(&mut self, ctx: &CallContext, id: LoanId) -> Result<()> {
        let idx = self.index_of(id)?;
        let loan = &self.loans[idx];
        Self::ensure_borrower(loan, &ctx.caller)?;
        Self::ensure_can_transition(id, loan, LoanState::Finished)?;

        let total = calculator::total_debt(loan.debt_amount, loan.interest_rate, loan.duration_days)?;
        let collateral = loan.collateral;
        let legs = [
            Transfer::MoveFungible {
                asset: loan.debt_asset,
                from: ctx.caller,
                to: loan.lender,
                amount: total,
            },
            Transfer::release(
                collateral.kind(),
                collateral.asset(),
                ctx.caller,
                collateral.id_or_amount(),
            ),
        ];
        self.settle(&legs)?;

        self.transition(idx, LoanState::Finished);
        self.active_loans.remove(id);

        tracing::info!("Loan {} repaid by {}: {}", id, ctx.caller, total);
        self.emit(LoanEvent::LoanRepaid {
            loan_id: id,
            borrower: ctx.caller,
            total_debt: total,
        });
        Ok(())
    }

    // =========================================================================
    // Liquidate
    // =========================================================================

    /// Forfeit an overdue loan's collateral to its lender. Anyone may call
    /// this; no debt asset moves.
    pub fn liquidate(&mut self, ctx: &CallContext, id: LoanId) -> Result<()> {
        let idx = self.index_of(id)?;
        let loan = &self.loans[idx];
        Self::ensure_can_transition(id, loan, LoanState::Liquidated)?;

        let maturity = loan.maturity_timestamp();
        if ctx.now <= maturity {
            return Err(LendingError::LoanStillActive { id, maturity });
        }

        let lender = loan.lender;
        let collateral = loan.collateral;
        self.settle(&[Transfer::release(
            collateral.kind(),
            collateral.asset(),
            lender,
            collateral.id_or_amount(),
        )])?;

        self.transition(idx, LoanState::Liquidated);
        self.active_loans.remove(id);

        tracing::info!("Loan {} liquidated by {} in favour of {}", id, ctx.caller, lender);
        self.emit(LoanEvent::LoanLiquidated {
            loan_id: id,
            liquidator: ctx.caller,
            lender,
        });
        Ok(())
    }
}
