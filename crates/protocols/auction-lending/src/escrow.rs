//! Asset escrow
//!
//! The lending module moves assets only through [`AssetEscrow`]. Collateral is
//! pulled into custody and pushed back out; debt-asset legs go straight from
//! one account to another so the protocol never holds them.
//!
//! An operation hands its legs to [`AssetEscrow::settle`] as one batch, which
//! must apply all of them or none.

use std::collections::{HashMap, HashSet};

use dutchlend_core::{Address, Amount, AssetKind};
use serde::{Deserialize, Serialize};

use crate::error::EscrowError;

/// One asset movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Transfer {
    /// `from` -> custody
    PullFungible {
        asset: Address,
        from: Address,
        amount: Amount,
    },
    /// custody -> `to`
    PushFungible {
        asset: Address,
        to: Address,
        amount: Amount,
    },
    PullUnique {
        asset: Address,
        from: Address,
        token_id: Amount,
    },
    PushUnique {
        asset: Address,
        to: Address,
        token_id: Amount,
    },
    /// `from` -> `to`, never touching custody
    MoveFungible {
        asset: Address,
        from: Address,
        to: Address,
        amount: Amount,
    },
}

impl Transfer {
    /// The leg that undoes this one
    pub fn inverse(&self) -> Transfer {
        match *self {
            Self::PullFungible {
                asset,
                from,
                amount,
            } => Self::PushFungible {
                asset,
                to: from,
                amount,
            },
            Self::PushFungible { asset, to, amount } => Self::PullFungible {
                asset,
                from: to,
                amount,
            },
            Self::PullUnique {
                asset,
                from,
                token_id,
            } => Self::PushUnique {
                asset,
                to: from,
                token_id,
            },
            Self::PushUnique {
                asset,
                to,
                token_id,
            } => Self::PullUnique {
                asset,
                from: to,
                token_id,
            },
            Self::MoveFungible {
                asset,
                from,
                to,
                amount,
            } => Self::MoveFungible {
                asset,
                from: to,
                to: from,
                amount,
            },
        }
    }

    /// Collateral leg returning `collateral` from custody to `to`
    pub fn release(kind: AssetKind, asset: Address, to: Address, id_or_amount: Amount) -> Self {
        match kind {
            AssetKind::Fungible => Self::PushFungible {
                asset,
                to,
                amount: id_or_amount,
            },
            AssetKind::Unique => Self::PushUnique {
                asset,
                to,
                token_id: id_or_amount,
            },
        }
    }

    /// Collateral leg pulling into custody from `from`
    pub fn lock(kind: AssetKind, asset: Address, from: Address, id_or_amount: Amount) -> Self {
        match kind {
            AssetKind::Fungible => Self::PullFungible {
                asset,
                from,
                amount: id_or_amount,
            },
            AssetKind::Unique => Self::PullUnique {
                asset,
                from,
                token_id: id_or_amount,
            },
        }
    }
}

/// Transfer primitives the lending module consumes
pub trait AssetEscrow {
    /// Kind of a known asset, `None` if the adapter does not recognise it
    fn asset_kind(&self, asset: &Address) -> Option<AssetKind>;

    fn pull_fungible(&mut self, asset: &Address, from: &Address, amount: Amount)
        -> Result<(), EscrowError>;

    fn push_fungible(&mut self, asset: &Address, to: &Address, amount: Amount)
        -> Result<(), EscrowError>;

    fn pull_unique(&mut self, asset: &Address, from: &Address, token_id: Amount)
        -> Result<(), EscrowError>;

    fn push_unique(&mut self, asset: &Address, to: &Address, token_id: Amount)
        -> Result<(), EscrowError>;

    fn transfer_fungible(
        &mut self,
        asset: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), EscrowError>;

    fn apply(&mut self, transfer: &Transfer) -> Result<(), EscrowError> {
        match transfer {
            Transfer::PullFungible {
                asset,
                from,
                amount,
            } => self.pull_fungible(asset, from, *amount),
            Transfer::PushFungible { asset, to, amount } => self.push_fungible(asset, to, *amount),
            Transfer::PullUnique {
                asset,
                from,
                token_id,
            } => self.pull_unique(asset, from, *token_id),
            Transfer::PushUnique {
                asset,
                to,
                token_id,
            } => self.push_unique(asset, to, *token_id),
            Transfer::MoveFungible {
                asset,
                from,
                to,
                amount,
            } => self.transfer_fungible(asset, from, to, *amount),
        }
    }

    /// Undo a leg this escrow applied earlier.
    ///
    /// Unlike replaying [`Transfer::inverse`] through [`apply`](Self::apply),
    /// this must not consult approvals, and it must hand back any allowance
    /// the original leg spent.
    fn revert(&mut self, transfer: &Transfer) -> Result<(), EscrowError>;

    /// Apply every leg or none.
    ///
    /// The default applies legs in order and, on the first failure, reverts
    /// the applied legs newest first. If an undo fails the books are left
    /// partially settled and the result is [`EscrowError::RollbackFailed`].
    /// Adapters that can snapshot their state should override this.
    fn settle(&mut self, transfers: &[Transfer]) -> Result<(), EscrowError> {
        for (i, transfer) in transfers.iter().enumerate() {
            let Err(cause) = self.apply(transfer) else {
                continue;
            };
            let mut failed = None;
            for done in transfers[..i].iter().rev() {
                if let Err(undo) = self.revert(done) {
                    tracing::error!("Failed to roll back {:?}: {}", done, undo);
                    failed.get_or_insert((*done, undo));
                }
            }
            return Err(match failed {
                Some((leg, undo)) => EscrowError::RollbackFailed {
                    leg,
                    cause: Box::new(cause),
                    undo: Box::new(undo),
                },
                None => cause,
            });
        }
        Ok(())
    }
}

/// Metadata for an asset registered with the vault
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetInfo {
    pub kind: AssetKind,
    pub symbol: String,
}

#[derive(Debug, Clone, Default)]
struct Books {
    assets: HashMap<Address, AssetInfo>,
    /// (asset, account) -> balance
    balances: HashMap<(Address, Address), Amount>,
    /// (asset, owner) -> amount the protocol may pull
    allowances: HashMap<(Address, Address), Amount>,
    /// (asset, token) -> owner
    owners: HashMap<(Address, Amount), Address>,
    /// (asset, owner) pairs that let the protocol pull unique tokens
    operator_approvals: HashSet<(Address, Address)>,
}

/// In-memory escrow holding fungible balances and unique-token ownership.
///
/// `custody` is the account the lending module holds collateral under.
/// Pulls spend allowances granted to the protocol; user-initiated unique
/// transfers into custody are refused.
#[derive(Debug, Clone)]
pub struct Vault {
    custody: Address,
    books: Books,
}

impl Vault {
    pub fn new(custody: Address) -> Self {
        Self {
            custody,
            books: Books::default(),
        }
    }

    pub fn custody(&self) -> Address {
        self.custody
    }

    pub fn register_asset(&mut self, asset: Address, kind: AssetKind, symbol: impl Into<String>) {
        let symbol = symbol.into();
        tracing::debug!("Registering {} asset {} ({})", kind, asset, symbol);
        self.books.assets.insert(asset, AssetInfo { kind, symbol });
    }

    pub fn asset_info(&self, asset: &Address) -> Option<&AssetInfo> {
        self.books.assets.get(asset)
    }

    fn expect_kind(&self, asset: &Address, expected: AssetKind) -> Result<(), EscrowError> {
        let info = self
            .books
            .assets
            .get(asset)
            .ok_or(EscrowError::UnknownAsset(*asset))?;
        if info.kind != expected {
            return Err(EscrowError::WrongAssetKind {
                asset: *asset,
                expected,
                actual: info.kind,
            });
        }
        Ok(())
    }

    /// Fungible balance, or number of tokens held for a unique asset
    pub fn balance_of(&self, asset: &Address, account: &Address) -> Amount {
        match self.books.assets.get(asset).map(|info| info.kind) {
            Some(AssetKind::Unique) => self
                .books
                .owners
                .iter()
                .filter(|((a, _), owner)| a == asset && *owner == account)
                .count() as Amount,
            _ => self
                .books
                .balances
                .get(&(*asset, *account))
                .copied()
                .unwrap_or(0),
        }
    }

    pub fn owner_of(&self, asset: &Address, token_id: Amount) -> Option<Address> {
        self.books.owners.get(&(*asset, token_id)).copied()
    }

    pub fn allowance(&self, asset: &Address, owner: &Address) -> Amount {
        self.books
            .allowances
            .get(&(*asset, *owner))
            .copied()
            .unwrap_or(0)
    }

    pub fn mint_fungible(
        &mut self,
        asset: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), EscrowError> {
        self.expect_kind(asset, AssetKind::Fungible)?;
        self.credit(asset, to, amount)
    }

    pub fn mint_unique(
        &mut self,
        asset: &Address,
        to: &Address,
        token_id: Amount,
    ) -> Result<(), EscrowError> {
        self.expect_kind(asset, AssetKind::Unique)?;
        if self.books.owners.contains_key(&(*asset, token_id)) {
            return Err(EscrowError::AlreadyMinted {
                asset: *asset,
                token_id,
            });
        }
        self.books.owners.insert((*asset, token_id), *to);
        Ok(())
    }

    /// Let the protocol pull up to `amount` of `asset` from `owner`
    pub fn approve(
        &mut self,
        asset: &Address,
        owner: &Address,
        amount: Amount,
    ) -> Result<(), EscrowError> {
        self.expect_kind(asset, AssetKind::Fungible)?;
        self.books.allowances.insert((*asset, *owner), amount);
        Ok(())
    }

    /// Let the protocol pull any token of `asset` owned by `owner`
    pub fn set_approval_for_all(
        &mut self,
        asset: &Address,
        owner: &Address,
        approved: bool,
    ) -> Result<(), EscrowError> {
        self.expect_kind(asset, AssetKind::Unique)?;
        if approved {
            self.books.operator_approvals.insert((*asset, *owner));
        } else {
            self.books.operator_approvals.remove(&(*asset, *owner));
        }
        Ok(())
    }

    /// Owner-initiated unique transfer. Custody only accepts tokens it pulls
    /// itself, so sending one there directly is refused.
    pub fn transfer_unique(
        &mut self,
        asset: &Address,
        from: &Address,
        to: &Address,
        token_id: Amount,
    ) -> Result<(), EscrowError> {
        self.expect_kind(asset, AssetKind::Unique)?;
        if *to == self.custody {
            return Err(EscrowError::TransferNotAllowed {
                asset: *asset,
                token_id,
            });
        }
        self.move_unique(asset, from, to, token_id)
    }

    fn credit(&mut self, asset: &Address, account: &Address, amount: Amount) -> Result<(), EscrowError> {
        let balance = self.books.balances.entry((*asset, *account)).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or(EscrowError::Overflow { asset: *asset })?;
        Ok(())
    }

    fn debit(&mut self, asset: &Address, account: &Address, amount: Amount) -> Result<(), EscrowError> {
        let available = self.balance_of(asset, account);
        if available < amount {
            return Err(EscrowError::InsufficientBalance {
                asset: *asset,
                account: *account,
                required: amount,
                available,
            });
        }
        self.books
            .balances
            .insert((*asset, *account), available - amount);
        Ok(())
    }

    fn spend_allowance(&mut self, asset: &Address, owner: &Address, amount: Amount) -> Result<(), EscrowError> {
        let available = self.allowance(asset, owner);
        if available < amount {
            return Err(EscrowError::InsufficientAllowance {
                asset: *asset,
                owner: *owner,
                required: amount,
                available,
            });
        }
        self.books
            .allowances
            .insert((*asset, *owner), available - amount);
        Ok(())
    }

    fn restore_allowance(&mut self, asset: &Address, owner: &Address, amount: Amount) {
        let allowance = self.books.allowances.entry((*asset, *owner)).or_insert(0);
        *allowance = allowance.saturating_add(amount);
    }

    fn move_fungible(
        &mut self,
        asset: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), EscrowError> {
        self.debit(asset, from, amount)?;
        self.credit(asset, to, amount)
    }

    fn move_unique(
        &mut self,
        asset: &Address,
        from: &Address,
        to: &Address,
        token_id: Amount,
    ) -> Result<(), EscrowError> {
        match self.books.owners.get(&(*asset, token_id)) {
            Some(owner) if owner == from => {
                self.books.owners.insert((*asset, token_id), *to);
                Ok(())
            }
            _ => Err(EscrowError::NotOwner {
                asset: *asset,
                account: *from,
                token_id,
            }),
        }
    }
}

impl AssetEscrow for Vault {
    fn asset_kind(&self, asset: &Address) -> Option<AssetKind> {
        self.books.assets.get(asset).map(|info| info.kind)
    }

    fn pull_fungible(&mut self, asset: &Address, from: &Address, amount: Amount) -> Result<(), EscrowError> {
        self.expect_kind(asset, AssetKind::Fungible)?;
        self.spend_allowance(asset, from, amount)?;
        let custody = self.custody;
        self.move_fungible(asset, from, &custody, amount)
    }

    fn push_fungible(&mut self, asset: &Address, to: &Address, amount: Amount) -> Result<(), EscrowError> {
        self.expect_kind(asset, AssetKind::Fungible)?;
        let custody = self.custody;
        self.move_fungible(asset, &custody, to, amount)
    }

    fn pull_unique(&mut self, asset: &Address, from: &Address, token_id: Amount) -> Result<(), EscrowError> {
        self.expect_kind(asset, AssetKind::Unique)?;
        if !self.books.operator_approvals.contains(&(*asset, *from)) {
            return Err(EscrowError::NotApproved {
                asset: *asset,
                owner: *from,
            });
        }
        let custody = self.custody;
        self.move_unique(asset, from, &custody, token_id)
    }

    fn push_unique(&mut self, asset: &Address, to: &Address, token_id: Amount) -> Result<(), EscrowError> {
        self.expect_kind(asset, AssetKind::Unique)?;
        let custody = self.custody;
        self.move_unique(asset, &custody, to, token_id)
    }

    fn transfer_fungible(
        &mut self,
        asset: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), EscrowError> {
        self.expect_kind(asset, AssetKind::Fungible)?;
        self.spend_allowance(asset, from, amount)?;
        self.move_fungible(asset, from, to, amount)
    }

    fn revert(&mut self, transfer: &Transfer) -> Result<(), EscrowError> {
        let custody = self.custody;
        match *transfer {
            Transfer::PullFungible {
                asset,
                from,
                amount,
            } => {
                self.move_fungible(&asset, &custody, &from, amount)?;
                self.restore_allowance(&asset, &from, amount);
            }
            Transfer::PushFungible { asset, to, amount } => {
                self.move_fungible(&asset, &to, &custody, amount)?;
            }
            Transfer::PullUnique {
                asset,
                from,
                token_id,
            } => self.move_unique(&asset, &custody, &from, token_id)?,
            Transfer::PushUnique {
                asset,
                to,
                token_id,
            } => self.move_unique(&asset, &to, &custody, token_id)?,
            Transfer::MoveFungible {
                asset,
                from,
                to,
                amount,
            } => {
                self.move_fungible(&asset, &to, &from, amount)?;
                self.restore_allowance(&asset, &from, amount);
            }
        }
        Ok(())
    }

    fn settle(&mut self, transfers: &[Transfer]) -> Result<(), EscrowError> {
        let snapshot = self.books.clone();
        for transfer in transfers {
            if let Err(e) = self.apply(transfer) {
                tracing::debug!("Settlement failed on {:?}: {}, restoring books", transfer, e);
                self.books = snapshot;
                return Err(e);
            }
        }
        Ok(())
    }
}
