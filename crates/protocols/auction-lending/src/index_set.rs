//! Loan id index sets
//!
//! Each set is an `IndexSet`: ids in a dense vector with a hashed reverse
//! index. Insert appends; remove swaps the victim with the last entry and
//! pops, so both are O(1). Iteration order is insertion order only until the
//! first removal: after that, the former last entry sits in the removed slot.
//! Callers must not rely on stable ordering across mutations.

use std::collections::HashMap;

use dutchlend_core::Address;
use indexmap::IndexSet;

use crate::state::LoanId;

/// Ordered set of loan ids with O(1) insert, remove and paginated reads
#[derive(Debug, Clone, Default)]
pub struct LoanIdSet {
    ids: IndexSet<LoanId>,
}

impl LoanIdSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: LoanId) -> bool {
        self.ids.contains(&id)
    }

    /// Append `id`. Returns false if it was already present.
    pub fn insert(&mut self, id: LoanId) -> bool {
        self.ids.insert(id)
    }

    /// Remove `id` by swapping in the last entry. Returns false if absent.
    pub fn remove(&mut self, id: LoanId) -> bool {
        self.ids.swap_remove(&id)
    }

    /// Up to `limit` ids starting at `offset`; empty when `offset >= len`
    pub fn paginate(&self, offset: usize, limit: usize) -> Vec<LoanId> {
        if offset >= self.ids.len() {
            return Vec::new();
        }
        let end = offset.saturating_add(limit).min(self.ids.len());
        self.ids
            .get_range(offset..end)
            .map(|page| page.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Current position of `id`
    pub fn position(&self, id: LoanId) -> Option<usize> {
        self.ids.get_index_of(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = LoanId> + '_ {
        self.ids.iter().copied()
    }
}

/// Per-account loan sets.
///
/// A loan id lands in the borrower's set at auction start and, separately,
/// in the lender's set at funding. The same id can therefore appear under two
/// accounts.
#[derive(Debug, Clone, Default)]
pub struct AccountIndex {
    sets: HashMap<Address, LoanIdSet>,
}

impl AccountIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, account: Address, id: LoanId) -> bool {
        self.sets.entry(account).or_default().insert(id)
    }

    pub fn get(&self, account: &Address) -> Option<&LoanIdSet> {
        self.sets.get(account)
    }

    pub fn len_of(&self, account: &Address) -> usize {
        self.sets.get(account).map_or(0, LoanIdSet::len)
    }

    pub fn paginate(&self, account: &Address, offset: usize, limit: usize) -> Vec<LoanId> {
        self.sets
            .get(account)
            .map(|set| set.paginate(offset, limit))
            .unwrap_or_default()
    }
}
