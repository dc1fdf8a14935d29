//! Error types for escrow ledger operations.

use thiserror::Error;
use vend_assets::{AccountId, AssetError};

use crate::transaction::{Status, TransactionId};

/// Result type alias for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors that can occur during escrow ledger operations.
///
/// Every error is surfaced synchronously and implies that no record state
/// was mutated by the failing operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// No transaction exists under the given id.
    #[error("transaction not found: {0}")]
    NotFound(TransactionId),

    /// The transaction is not in the state the operation requires.
    #[error("invalid state: {id} is {status}, operation requires open")]
    InvalidState {
        /// Transaction the operation referenced.
        id: TransactionId,
        /// Its current status.
        status: Status,
    },

    /// The caller is not the party entitled to perform the action.
    #[error("unauthorized: {caller} is not the seller of {id}")]
    Unauthorized {
        /// Transaction the operation referenced.
        id: TransactionId,
        /// The rejected caller.
        caller: AccountId,
    },

    /// An asset service declined a transfer.
    #[error("transfer rejected: {0}")]
    TransferRejected(#[from] AssetError),
}
