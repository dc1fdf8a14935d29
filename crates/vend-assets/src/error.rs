//! Error types for asset service operations.

use crate::account::{AccountId, ItemId};
use crate::amount::Amount;
use thiserror::Error;

/// Result type alias for asset service operations.
pub type Result<T> = std::result::Result<T, AssetError>;

/// Errors that an asset service can return when asked to move an asset.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssetError {
    /// The source account does not hold enough currency.
    #[error("insufficient balance: have {have}, need {need}")]
    InsufficientBalance {
        /// Current balance of the source account.
        have: Amount,
        /// Amount the transfer requires.
        need: Amount,
    },

    /// The caller was never granted authority over the asset.
    #[error("not authorized: {account}: {reason}")]
    NotAuthorized {
        /// Account whose authorization was insufficient.
        account: AccountId,
        /// Description of the missing grant.
        reason: String,
    },

    /// The item is not registered.
    #[error("unknown item: {0}")]
    UnknownItem(ItemId),

    /// An item id was registered a second time.
    #[error("item already registered: {0}")]
    AlreadyRegistered(ItemId),

    /// The presumed holder of an item does not actually hold it.
    #[error("{item} is not held by {claimed}, current holder is {holder}")]
    NotOwner {
        /// Item the transfer referenced.
        item: ItemId,
        /// Account the transfer claimed as holder.
        claimed: AccountId,
        /// Actual current holder.
        holder: AccountId,
    },

    /// The service could not be reached.
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl AssetError {
    /// Create a not-authorized error.
    #[must_use]
    pub fn not_authorized(account: AccountId, reason: impl Into<String>) -> Self {
        Self::NotAuthorized {
            account,
            reason: reason.into(),
        }
    }

    /// Create an unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}
