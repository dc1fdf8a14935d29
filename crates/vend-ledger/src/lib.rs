//! # vend-ledger
//!
//! Escrow transaction state machine for the Vend listing market.
//!
//! This crate provides:
//! - The [`Transaction`] record and its `Open → {Executed | Cancelled}`
//!   state machine
//! - The [`EscrowLedger`] with its three operations: open, execute, cancel
//! - Status-change notifications and listener plumbing
//!
//! The ledger never keeps balances or item ownership itself. It holds
//! escrowed items under a custody account in the external item registry
//! and sequences authorized transfers through the [`vend_assets`] traits,
//! advancing its own record state only when the relevant transfer
//! succeeded. Every operation is all-or-nothing: a rejected transfer
//! leaves the record exactly as it was.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use vend_assets::{AccountId, Amount, InMemoryCurrency, InMemoryItems, ItemId};
//! use vend_ledger::{EscrowLedger, Status};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let custody = AccountId::new("vend-custody");
//! let currency = Arc::new(InMemoryCurrency::new(custody.clone()));
//! let items = Arc::new(InMemoryItems::new(custody.clone()));
//!
//! // Seller holds item 42 and lets the ledger escrow it; buyer holds
//! // funds and lets the ledger spend 100 of them.
//! let seller = AccountId::new("seller");
//! let buyer = AccountId::new("buyer");
//! items.register(ItemId::new(42), &seller)?;
//! items.authorize(ItemId::new(42))?;
//! currency.mint(&buyer, Amount::from_units(100));
//! currency.authorize(&buyer, Amount::from_units(100));
//!
//! let ledger = EscrowLedger::new(custody, currency.clone(), items.clone());
//! let id = ledger.open(&seller, ItemId::new(42), Amount::from_units(100))?;
//! ledger.execute(id, &buyer)?;
//!
//! let record = ledger.get(id).expect("record is permanent");
//! assert_eq!(record.status, Status::Executed);
//! assert_eq!(currency.balance_of(&seller), Amount::from_units(100));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod events;
pub mod ledger;
pub mod transaction;

pub use error::{LedgerError, Result};
pub use events::{RecordingListener, StatusChange, StatusListener, TracingListener};
pub use ledger::EscrowLedger;
pub use transaction::{Status, Transaction, TransactionId};
