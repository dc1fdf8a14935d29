//! Escrow transaction records and their state machine.
//!
//! A transaction is created Open, with the listed item already in escrow
//! custody, and is mutated exactly once: to Executed when a buyer pays, or
//! to Cancelled when the seller reclaims the item. Records are never
//! deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use vend_assets::{AccountId, Amount, ItemId};

use crate::error::{LedgerError, Result};

/// Sequential transaction identifier, assigned by the ledger at open time.
///
/// Ids start at 0, increase strictly, and are never reused; a failed open
/// consumes no id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionId(u64);

impl TransactionId {
    /// Create a transaction id from its raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw id value.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx-{}", self.0)
    }
}

/// The state of an escrow transaction.
///
/// Each state has exactly one canonical string form (see [`Status::as_str`]),
/// so status comparisons can never drift between casings of the same tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Item locked in escrow custody, awaiting a buyer or cancellation.
    Open,
    /// Buyer paid the seller and received the item.
    Executed,
    /// Seller reclaimed the item.
    Cancelled,
}

impl Status {
    /// Checks if a transition to the target state is valid.
    #[must_use]
    pub const fn can_transition_to(&self, target: &Self) -> bool {
        matches!(
            (self, target),
            (Self::Open, Self::Executed | Self::Cancelled)
        )
    }

    /// Check if the status admits no further transition.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Executed | Self::Cancelled)
    }

    /// Returns the canonical string form of this status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Executed => "executed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An escrow transaction record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Ledger-assigned sequential id.
    pub id: TransactionId,
    /// Account that opened the transaction.
    pub seller: AccountId,
    /// The escrowed item.
    pub item: ItemId,
    /// Currency required to execute. Zero is allowed.
    pub price: Amount,
    /// Current state.
    pub status: Status,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last status change.
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a new record in the Open state.
    #[must_use]
    pub fn new(id: TransactionId, seller: AccountId, item: ItemId, price: Amount) -> Self {
        let now = Utc::now();
        Self {
            id,
            seller,
            item,
            price,
            status: Status::Open,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attempts to transition to a new state.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidState`] if the current status does
    /// not admit the transition.
    pub fn transition_to(&mut self, target: Status) -> Result<()> {
        if !self.status.can_transition_to(&target) {
            return Err(LedgerError::InvalidState {
                id: self.id,
                status: self.status,
            });
        }
        self.status = target;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn record() -> Transaction {
        Transaction::new(
            TransactionId::new(0),
            AccountId::new("seller"),
            ItemId::new(42),
            Amount::from_units(100),
        )
    }

    #[test]
    fn test_new_record_is_open() {
        let tx = record();
        assert_eq!(tx.status, Status::Open);
        assert!(!tx.status.is_terminal());
        assert_eq!(tx.created_at, tx.updated_at);
    }

    #[test_case(Status::Open, Status::Executed => true; "open to executed")]
    #[test_case(Status::Open, Status::Cancelled => true; "open to cancelled")]
    #[test_case(Status::Open, Status::Open => false; "open is not re-enterable")]
    #[test_case(Status::Executed, Status::Cancelled => false; "executed is terminal")]
    #[test_case(Status::Executed, Status::Open => false; "executed cannot reopen")]
    #[test_case(Status::Cancelled, Status::Executed => false; "cancelled is terminal")]
    #[test_case(Status::Cancelled, Status::Open => false; "cancelled cannot reopen")]
    fn test_transition_relation(from: Status, to: Status) -> bool {
        from.can_transition_to(&to)
    }

    #[test]
    fn test_transition_to_updates_timestamp() {
        let mut tx = record();
        tx.transition_to(Status::Executed).expect("open to executed");
        assert_eq!(tx.status, Status::Executed);
        assert!(tx.updated_at >= tx.created_at);
    }

    #[test]
    fn test_terminal_transition_rejected() {
        let mut tx = record();
        tx.transition_to(Status::Cancelled).expect("open to cancelled");
        let before = tx.clone();

        let err = tx.transition_to(Status::Executed).expect_err("terminal");
        assert!(matches!(
            err,
            LedgerError::InvalidState {
                status: Status::Cancelled,
                ..
            }
        ));
        // Rejected transitions leave the record untouched.
        assert_eq!(tx, before);
    }

    #[test]
    fn test_status_canonical_tags() {
        assert_eq!(Status::Open.as_str(), "open");
        assert_eq!(Status::Executed.to_string(), "executed");
        assert_eq!(
            serde_json::to_string(&Status::Cancelled).expect("serialize"),
            "\"cancelled\""
        );
    }

    #[test]
    fn test_record_serde_shape() {
        let tx = record();
        let json = serde_json::to_value(&tx).expect("serialize");
        assert_eq!(json["id"], 0);
        assert_eq!(json["seller"], "seller");
        assert_eq!(json["price"], 100);
        assert_eq!(json["status"], "open");
        let parsed: Transaction = serde_json::from_value(json).expect("deserialize");
        assert_eq!(parsed, tx);
    }
}
