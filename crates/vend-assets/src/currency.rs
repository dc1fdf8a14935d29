//! Fungible currency service.
//!
//! The escrow ledger pays sellers through the [`CurrencyService`] trait.
//! The service enforces its own authorization model: a transfer out of an
//! account succeeds only if that account pre-authorized the ledger for at
//! least the transferred amount. [`InMemoryCurrency`] is the reference
//! implementation used in tests and local deployments.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;

use crate::account::AccountId;
use crate::amount::Amount;
use crate::error::{AssetError, Result};

/// A fungible-balance service the ledger can move currency through.
///
/// Implementations must apply each transfer atomically: either the full
/// amount moves and authorization is consumed, or nothing changes.
pub trait CurrencyService: Send + Sync {
    /// Transfer `amount` from `from` to `to` on behalf of the ledger.
    ///
    /// # Errors
    ///
    /// Returns an error if `from` lacks balance or never authorized the
    /// ledger for `amount`. Transfers out of the ledger's own account are
    /// always authorized.
    fn transfer_authorized(&self, from: &AccountId, to: &AccountId, amount: Amount) -> Result<()>;

    /// Current amount `owner` has authorized the ledger to move.
    fn authorized_amount(&self, owner: &AccountId) -> Amount;
}

#[derive(Debug, Default)]
struct CurrencyState {
    balances: HashMap<AccountId, Amount>,
    /// Per-owner grant toward the operator; consumed by transfers.
    authorizations: HashMap<AccountId, Amount>,
    unavailable: bool,
}

/// In-memory currency ledger with explicit authorization bookkeeping.
///
/// Bound to a single operator account at construction: authorizations are
/// grants toward that operator, which in a Vend deployment is the escrow
/// ledger's custody account.
#[derive(Debug)]
pub struct InMemoryCurrency {
    operator: AccountId,
    state: RwLock<CurrencyState>,
}

impl InMemoryCurrency {
    /// Create a currency service whose authorized operator is `operator`.
    #[must_use]
    pub fn new(operator: AccountId) -> Self {
        Self {
            operator,
            state: RwLock::new(CurrencyState::default()),
        }
    }

    /// Credit `amount` to `owner`, creating the account if needed.
    pub fn mint(&self, owner: &AccountId, amount: Amount) {
        let mut state = self.state.write();
        let balance = state.balances.entry(owner.clone()).or_default();
        *balance = balance.saturating_add(amount);
    }

    /// Set `owner`'s authorization toward the operator to `amount`.
    ///
    /// Replaces any previous grant rather than accumulating.
    pub fn authorize(&self, owner: &AccountId, amount: Amount) {
        self.state
            .write()
            .authorizations
            .insert(owner.clone(), amount);
    }

    /// Current balance of `owner`.
    #[must_use]
    pub fn balance_of(&self, owner: &AccountId) -> Amount {
        self.state
            .read()
            .balances
            .get(owner)
            .copied()
            .unwrap_or_default()
    }

    /// Make every subsequent call fail with [`AssetError::Unavailable`].
    ///
    /// Lets tests exercise the ledger's behavior when a collaborator is
    /// unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.write().unavailable = unavailable;
    }
}

impl CurrencyService for InMemoryCurrency {
    fn transfer_authorized(&self, from: &AccountId, to: &AccountId, amount: Amount) -> Result<()> {
        let mut state = self.state.write();
        if state.unavailable {
            return Err(AssetError::unavailable("currency service offline"));
        }

        let operator_funds = from == &self.operator;
        if !operator_funds {
            let granted = state
                .authorizations
                .get(from)
                .copied()
                .unwrap_or_default();
            if granted < amount {
                return Err(AssetError::not_authorized(
                    from.clone(),
                    format!("granted {granted}, transfer needs {amount}"),
                ));
            }
        }

        let have = state.balances.get(from).copied().unwrap_or_default();
        let Some(remainder) = have.checked_sub(amount) else {
            return Err(AssetError::InsufficientBalance { have, need: amount });
        };

        state.balances.insert(from.clone(), remainder);
        let credit = state.balances.entry(to.clone()).or_default();
        *credit = credit.saturating_add(amount);
        if !operator_funds {
            let granted = state.authorizations.entry(from.clone()).or_default();
            *granted = granted.saturating_sub(amount);
        }

        debug!(%from, %to, %amount, "currency transferred");
        Ok(())
    }

    fn authorized_amount(&self, owner: &AccountId) -> Amount {
        self.state
            .read()
            .authorizations
            .get(owner)
            .copied()
            .unwrap_or_default()
    }
}
