//! The escrow ledger.
//!
//! [`EscrowLedger`] owns the record table and the id counter, and
//! delegates all asset movement to the injected currency and item
//! services. A single mutex serializes every operation: the status check
//! and the transfers it guards happen under one guard, so at most one
//! terminal transition can ever succeed per transaction id.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use vend_assets::{AccountId, Amount, AssetError, CurrencyService, ItemId, ItemRegistry};

use crate::error::{LedgerError, Result};
use crate::events::{StatusChange, StatusListener};
use crate::transaction::{Status, Transaction, TransactionId};

#[derive(Debug, Default)]
struct LedgerState {
    transactions: HashMap<TransactionId, Transaction>,
    next_id: u64,
}

/// The escrow ledger: record table, id counter, and the three operations.
///
/// Constructed once per deployment and passed explicitly to whatever
/// process hosts it. There is no ambient global instance.
pub struct EscrowLedger {
    /// The account escrowed items are parked under.
    custody: AccountId,
    currency: Arc<dyn CurrencyService>,
    items: Arc<dyn ItemRegistry>,
    listeners: Vec<Arc<dyn StatusListener>>,
    state: Mutex<LedgerState>,
}

impl EscrowLedger {
    /// Create a ledger holding escrowed items under `custody`.
    ///
    /// The asset services must recognize `custody` as the ledger's
    /// identity: transfers out of it need no prior grant.
    #[must_use]
    pub fn new(
        custody: AccountId,
        currency: Arc<dyn CurrencyService>,
        items: Arc<dyn ItemRegistry>,
    ) -> Self {
        Self {
            custody,
            currency,
            items,
            listeners: Vec::new(),
            state: Mutex::new(LedgerState::default()),
        }
    }

    /// Attach a status-change listener.
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn StatusListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// The ledger's custody account.
    #[must_use]
    pub fn custody(&self) -> &AccountId {
        &self.custody
    }

    /// Number of transactions ever opened.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().transactions.len()
    }

    /// Check if no transaction was ever opened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().transactions.is_empty()
    }

    /// Open a transaction: lock `item` in escrow at `price`.
    ///
    /// Moves the item from `seller` into custody and creates the record in
    /// one indivisible effect: if the registry rejects the transfer, no
    /// record is created and no id is consumed.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::TransferRejected`] if the seller does not
    /// hold the item or never authorized the ledger to move it.
    pub fn open(&self, seller: &AccountId, item: ItemId, price: Amount) -> Result<TransactionId> {
        let mut state = self.state.lock();

        self.items
            .transfer_authorized(seller, &self.custody, item)
            .inspect_err(|e| warn!(%seller, %item, error = %e, "open rejected"))?;

        let id = TransactionId::new(state.next_id);
        state.next_id += 1;
        state
            .transactions
            .insert(id, Transaction::new(id, seller.clone(), item, price));

        info!(%id, %seller, %item, %price, "opened transaction");
        self.emit(StatusChange::now(id, Status::Open));
        Ok(id)
    }

    /// Execute an open transaction: `buyer` pays the seller and receives
    /// the item.
    ///
    /// Effects, in order: currency moves `price` from buyer to seller,
    /// the item moves from custody to buyer, the record flips to
    /// `Executed`. A rejected transfer aborts the whole operation with the
    /// record still `Open`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] for an unknown id,
    /// [`LedgerError::InvalidState`] if the record is not open, and
    /// [`LedgerError::TransferRejected`] if either asset service declines.
    pub fn execute(&self, id: TransactionId, buyer: &AccountId) -> Result<()> {
        let mut state = self.state.lock();
        let tx = state
            .transactions
            .get_mut(&id)
            .ok_or(LedgerError::NotFound(id))?;
        if tx.status != Status::Open {
            warn!(%id, %buyer, status = %tx.status, "execute rejected: not open");
            return Err(LedgerError::InvalidState {
                id,
                status: tx.status,
            });
        }

        // The open invariant says the item is in custody; confirm before
        // moving any currency so the item leg can only fail if the
        // registry itself is unreachable.
        let holder = self.items.owner_of(tx.item)?;
        if holder != self.custody {
            return Err(LedgerError::TransferRejected(AssetError::NotOwner {
                item: tx.item,
                claimed: self.custody.clone(),
                holder,
            }));
        }

        self.currency
            .transfer_authorized(buyer, &tx.seller, tx.price)
            .inspect_err(|e| warn!(%id, %buyer, error = %e, "execute rejected: payment"))?;
        self.items
            .transfer_authorized(&self.custody, buyer, tx.item)
            .inspect_err(|e| warn!(%id, %buyer, error = %e, "execute rejected: delivery"))?;

        tx.transition_to(Status::Executed)?;
        info!(%id, %buyer, "executed transaction");
        self.emit(StatusChange::now(id, Status::Executed));
        Ok(())
    }

    /// Cancel an open transaction: the seller reclaims the escrowed item.
    ///
    /// Only the account that opened the transaction may cancel it.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotFound`] for an unknown id,
    /// [`LedgerError::InvalidState`] if the record is not open,
    /// [`LedgerError::Unauthorized`] if `caller` is not the seller, and
    /// [`LedgerError::TransferRejected`] if the return transfer is
    /// declined (the registry being unreachable, in practice, since the
    /// ledger already holds the item).
    pub fn cancel(&self, id: TransactionId, caller: &AccountId) -> Result<()> {
        let mut state = self.state.lock();
        let tx = state
            .transactions
            .get_mut(&id)
            .ok_or(LedgerError::NotFound(id))?;
        if tx.status != Status::Open {
            warn!(%id, %caller, status = %tx.status, "cancel rejected: not open");
            return Err(LedgerError::InvalidState {
                id,
                status: tx.status,
            });
        }
        if caller != &tx.seller {
            warn!(%id, %caller, seller = %tx.seller, "cancel rejected: not the seller");
            return Err(LedgerError::Unauthorized {
                id,
                caller: caller.clone(),
            });
        }

        self.items
            .transfer_authorized(&self.custody, &tx.seller, tx.item)
            .inspect_err(|e| warn!(%id, error = %e, "cancel rejected: return transfer"))?;

        tx.transition_to(Status::Cancelled)?;
        info!(%id, "cancelled transaction");
        self.emit(StatusChange::now(id, Status::Cancelled));
        Ok(())
    }

    /// Look up a transaction by id.
    ///
    /// Read-only; returns a clone of the record, or `None` if the id was
    /// never issued. Available regardless of status.
    #[must_use]
    pub fn get(&self, id: TransactionId) -> Option<Transaction> {
        self.state.lock().transactions.get(&id).cloned()
    }

    fn emit(&self, event: StatusChange) {
        for listener in &self.listeners {
            listener.on_status_change(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingListener;
    use vend_assets::{InMemoryCurrency, InMemoryItems};

    const ITEM: ItemId = ItemId::new(42);
    const PRICE: Amount = Amount::from_units(100);

    struct Harness {
        seller: AccountId,
        buyer: AccountId,
        custody: AccountId,
        currency: Arc<InMemoryCurrency>,
        items: Arc<InMemoryItems>,
        events: Arc<RecordingListener>,
        ledger: EscrowLedger,
    }

    impl Harness {
        /// Seller holds item 42 with a grant in place; buyer has 500
        /// units, 300 of them authorized.
        fn new() -> Self {
            let custody = AccountId::new("vend-custody");
            let seller = AccountId::new("seller");
            let buyer = AccountId::new("buyer");
            let currency = Arc::new(InMemoryCurrency::new(custody.clone()));
            let items = Arc::new(InMemoryItems::new(custody.clone()));
            let events = Arc::new(RecordingListener::new());

            items.register(ITEM, &seller).expect("register item");
            items.authorize(ITEM).expect("authorize item");
            currency.mint(&buyer, Amount::from_units(500));
            currency.authorize(&buyer, Amount::from_units(300));

            let ledger = EscrowLedger::new(custody.clone(), currency.clone(), items.clone())
                .with_listener(events.clone());
            Self {
                seller,
                buyer,
                custody,
                currency,
                items,
                events,
                ledger,
            }
        }

        fn open(&self) -> TransactionId {
            self.ledger
                .open(&self.seller, ITEM, PRICE)
                .expect("open should succeed")
        }

        fn statuses(&self) -> Vec<Status> {
            self.events.events().iter().map(|e| e.status).collect()
        }
    }

    #[test]
    fn test_open_escrows_item_and_creates_record() {
        let h = Harness::new();
        let id = h.open();

        assert_eq!(id, TransactionId::new(0));
        assert_eq!(h.items.owner_of(ITEM).expect("owner"), h.custody);

        let tx = h.ledger.get(id).expect("record exists");
        assert_eq!(tx.seller, h.seller);
        assert_eq!(tx.item, ITEM);
        assert_eq!(tx.price, PRICE);
        assert_eq!(tx.status, Status::Open);
        assert_eq!(h.statuses(), vec![Status::Open]);
    }

    #[test]
    fn test_failed_open_consumes_no_id() {
        let h = Harness::new();
        let mallory = AccountId::new("mallory");

        let err = h
            .ledger
            .open(&mallory, ITEM, PRICE)
            .expect_err("mallory does not hold the item");
        assert!(matches!(err, LedgerError::TransferRejected(_)));
        assert!(h.ledger.is_empty());
        assert!(h.events.is_empty());

        // The next successful open still gets id 0.
        assert_eq!(h.open(), TransactionId::new(0));
    }

    #[test]
    fn test_execute_pays_seller_and_delivers_item() {
        let h = Harness::new();
        let id = h.open();

        h.ledger.execute(id, &h.buyer).expect("execute");

        assert_eq!(h.currency.balance_of(&h.buyer), Amount::from_units(400));
        assert_eq!(h.currency.balance_of(&h.seller), Amount::from_units(100));
        assert_eq!(h.items.owner_of(ITEM).expect("owner"), h.buyer);
        assert_eq!(h.ledger.get(id).expect("record").status, Status::Executed);
        assert_eq!(h.statuses(), vec![Status::Open, Status::Executed]);
    }

    #[test]
    fn test_execute_rejected_without_authorized_funds() {
        let h = Harness::new();
        let id = h.open();
        let broke = AccountId::new("broke");

        let err = h
            .ledger
            .execute(id, &broke)
            .expect_err("no funds, no grant");
        assert!(matches!(err, LedgerError::TransferRejected(_)));

        // Nothing moved, record still open.
        assert_eq!(h.items.owner_of(ITEM).expect("owner"), h.custody);
        assert_eq!(h.currency.balance_of(&h.seller), Amount::ZERO);
        assert_eq!(h.ledger.get(id).expect("record").status, Status::Open);
        assert_eq!(h.statuses(), vec![Status::Open]);

        // Still executable by a funded buyer afterwards.
        h.ledger.execute(id, &h.buyer).expect("retry by real buyer");
    }

    #[test]
    fn test_execute_twice_rejected_without_second_payment() {
        let h = Harness::new();
        let id = h.open();
        h.ledger.execute(id, &h.buyer).expect("first execute");

        let err = h.ledger.execute(id, &h.buyer).expect_err("already executed");
        assert_eq!(
            err,
            LedgerError::InvalidState {
                id,
                status: Status::Executed,
            }
        );
        // Paid exactly once.
        assert_eq!(h.currency.balance_of(&h.seller), Amount::from_units(100));
        assert_eq!(h.statuses(), vec![Status::Open, Status::Executed]);
    }

    #[test]
    fn test_cancel_returns_item_to_seller() {
        let h = Harness::new();
        let id = h.open();

        h.ledger.cancel(id, &h.seller).expect("cancel");

        assert_eq!(h.items.owner_of(ITEM).expect("owner"), h.seller);
        assert_eq!(h.ledger.get(id).expect("record").status, Status::Cancelled);
        assert_eq!(h.statuses(), vec![Status::Open, Status::Cancelled]);

        let err = h.ledger.execute(id, &h.buyer).expect_err("cancelled");
        assert!(matches!(err, LedgerError::InvalidState { .. }));
    }

    #[test]
    fn test_cancel_by_non_seller_unauthorized() {
        let h = Harness::new();
        let id = h.open();

        let err = h
            .ledger
            .cancel(id, &h.buyer)
            .expect_err("only the seller cancels");
        assert_eq!(
            err,
            LedgerError::Unauthorized {
                id,
                caller: h.buyer.clone(),
            }
        );
        assert_eq!(h.items.owner_of(ITEM).expect("owner"), h.custody);
        assert_eq!(h.ledger.get(id).expect("record").status, Status::Open);
    }

    #[test]
    fn test_cancel_after_execute_invalid_state() {
        let h = Harness::new();
        let id = h.open();
        h.ledger.execute(id, &h.buyer).expect("execute");

        let err = h.ledger.cancel(id, &h.seller).expect_err("terminal");
        assert_eq!(
            err,
            LedgerError::InvalidState {
                id,
                status: Status::Executed,
            }
        );
        assert_eq!(h.items.owner_of(ITEM).expect("owner"), h.buyer);
    }

    #[test]
    fn test_unknown_id_not_found() {
        let h = Harness::new();
        let ghost = TransactionId::new(7);

        assert!(h.ledger.get(ghost).is_none());
        assert_eq!(
            h.ledger.execute(ghost, &h.buyer).expect_err("no record"),
            LedgerError::NotFound(ghost)
        );
        assert_eq!(
            h.ledger.cancel(ghost, &h.seller).expect_err("no record"),
            LedgerError::NotFound(ghost)
        );
    }

    #[test]
    fn test_zero_price_executes_without_currency_grant() {
        let h = Harness::new();
        let penniless = AccountId::new("penniless");
        let id = h
            .ledger
            .open(&h.seller, ITEM, Amount::ZERO)
            .expect("open free listing");

        h.ledger.execute(id, &penniless).expect("free execute");
        assert_eq!(h.items.owner_of(ITEM).expect("owner"), penniless);
    }

    #[test]
    fn test_registry_outage_aborts_cancel() {
        let h = Harness::new();
        let id = h.open();
        h.items.set_unavailable(true);

        let err = h.ledger.cancel(id, &h.seller).expect_err("registry down");
        assert!(matches!(
            err,
            LedgerError::TransferRejected(AssetError::Unavailable(_))
        ));
        assert_eq!(h.ledger.get(id).expect("record").status, Status::Open);

        h.items.set_unavailable(false);
        h.ledger.cancel(id, &h.seller).expect("works once back up");
    }

    #[test]
    fn test_registry_outage_aborts_execute_before_payment() {
        let h = Harness::new();
        let id = h.open();
        h.items.set_unavailable(true);

        let err = h.ledger.execute(id, &h.buyer).expect_err("registry down");
        assert!(matches!(
            err,
            LedgerError::TransferRejected(AssetError::Unavailable(_))
        ));
        // The custody pre-flight failed first, so no currency moved.
        assert_eq!(h.currency.balance_of(&h.buyer), Amount::from_units(500));
        assert_eq!(h.ledger.get(id).expect("record").status, Status::Open);
    }

    #[test]
    fn test_ids_strictly_increase_across_outcomes() {
        let h = Harness::new();
        let extra = ItemId::new(43);
        h.items.register(extra, &h.seller).expect("register");
        h.items.authorize(extra).expect("authorize");

        let first = h.open();
        h.ledger.cancel(first, &h.seller).expect("cancel");
        let second = h
            .ledger
            .open(&h.seller, extra, PRICE)
            .expect("open second listing");

        assert!(second > first);
        assert_eq!(second, TransactionId::new(1));
        assert_eq!(h.ledger.len(), 2);
    }
}
