//! # vend-assets
//!
//! Asset-side vocabulary and collaborator contracts for the Vend escrow
//! market.
//!
//! This crate provides:
//! - Core identifiers and amounts (`AccountId`, `ItemId`, `Amount`)
//! - The [`CurrencyService`] and [`ItemRegistry`] capability traits the
//!   escrow ledger depends on
//! - In-memory reference implementations with explicit authorization
//!   bookkeeping, usable as test doubles and for local deployments
//!
//! The escrow ledger never keeps balances or ownership itself; it moves
//! assets exclusively through these interfaces, and each service enforces
//! its own authorization model.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod account;
pub mod amount;
pub mod currency;
pub mod error;
pub mod items;

pub use account::{AccountId, ItemId};
pub use amount::Amount;
pub use currency::{CurrencyService, InMemoryCurrency};
pub use error::{AssetError, Result};
pub use items::{InMemoryItems, ItemRegistry};
