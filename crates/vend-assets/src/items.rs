//! Unique-ownership item registry.
//!
//! Items move through the [`ItemRegistry`] trait: each item has exactly one
//! holder, and the registry enforces that only the current holder — having
//! pre-authorized the ledger, or being the ledger itself — can be the
//! source of a transfer. [`InMemoryItems`] is the reference implementation.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use tracing::debug;

use crate::account::{AccountId, ItemId};
use crate::error::{AssetError, Result};

/// A unique-ownership ledger the escrow ledger can move items through.
pub trait ItemRegistry: Send + Sync {
    /// Transfer `item` from `from` to `to` on behalf of the ledger.
    ///
    /// # Errors
    ///
    /// Returns an error if `from` is not the current holder, or holds the
    /// item but never authorized the ledger to move it. Transfers out of
    /// the ledger's own custody account need no grant (the escrow-return
    /// path).
    fn transfer_authorized(&self, from: &AccountId, to: &AccountId, item: ItemId) -> Result<()>;

    /// Current holder of `item`.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::UnknownItem`] if the item is not registered.
    fn owner_of(&self, item: ItemId) -> Result<AccountId>;
}

#[derive(Debug, Default)]
struct ItemState {
    owners: HashMap<ItemId, AccountId>,
    /// Items whose holder granted the operator transfer rights.
    /// Cleared on every transfer so a stale grant cannot be replayed.
    authorized: HashSet<ItemId>,
    unavailable: bool,
}

/// In-memory item registry with per-item authorization.
///
/// Bound to a single operator account at construction, in a Vend
/// deployment the escrow ledger's custody account.
#[derive(Debug)]
pub struct InMemoryItems {
    operator: AccountId,
    state: RwLock<ItemState>,
}

impl InMemoryItems {
    /// Create an item registry whose authorized operator is `operator`.
    #[must_use]
    pub fn new(operator: AccountId) -> Self {
        Self {
            operator,
            state: RwLock::new(ItemState::default()),
        }
    }

    /// Register a new item under `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::AlreadyRegistered`] if the id is taken.
    pub fn register(&self, item: ItemId, owner: &AccountId) -> Result<()> {
        let mut state = self.state.write();
        if state.owners.contains_key(&item) {
            return Err(AssetError::AlreadyRegistered(item));
        }
        state.owners.insert(item, owner.clone());
        Ok(())
    }

    /// Grant the operator the right to move `item` once.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::UnknownItem`] if the item is not registered.
    pub fn authorize(&self, item: ItemId) -> Result<()> {
        let mut state = self.state.write();
        if !state.owners.contains_key(&item) {
            return Err(AssetError::UnknownItem(item));
        }
        state.authorized.insert(item);
        Ok(())
    }

    /// Make every subsequent call fail with [`AssetError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.write().unavailable = unavailable;
    }
}

impl ItemRegistry for InMemoryItems {
    fn transfer_authorized(&self, from: &AccountId, to: &AccountId, item: ItemId) -> Result<()> {
        let mut state = self.state.write();
        if state.unavailable {
            return Err(AssetError::unavailable("item registry offline"));
        }

        let holder = state
            .owners
            .get(&item)
            .ok_or(AssetError::UnknownItem(item))?;
        if holder != from {
            return Err(AssetError::NotOwner {
                item,
                claimed: from.clone(),
                holder: holder.clone(),
            });
        }
        if from != &self.operator && !state.authorized.contains(&item) {
            return Err(AssetError::not_authorized(
                from.clone(),
                format!("{item} was never authorized for transfer"),
            ));
        }

        state.owners.insert(item, to.clone());
        state.authorized.remove(&item);
        debug!(%from, %to, %item, "item transferred");
        Ok(())
    }

    fn owner_of(&self, item: ItemId) -> Result<AccountId> {
        let state = self.state.read();
        if state.unavailable {
            return Err(AssetError::unavailable("item registry offline"));
        }
        state
            .owners
            .get(&item)
            .cloned()
            .ok_or(AssetError::UnknownItem(item))
    }
}
