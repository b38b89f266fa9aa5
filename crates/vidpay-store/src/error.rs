//! Error types for vidpay storage.

use vidpay_core::{AdViewRejection, MonetizationError};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record.
        entity: &'static str,
        /// Lookup key.
        id: String,
    },

    /// Record already exists.
    #[error("{entity} already exists: {id}")]
    AlreadyExists {
        /// Kind of record.
        entity: &'static str,
        /// Conflicting key.
        id: String,
    },

    /// Wallet balance too low for a debit.
    #[error("insufficient balance: balance={balance}, required={required}")]
    InsufficientBalance {
        /// Current balance in micros.
        balance: i64,
        /// Required amount in micros.
        required: i64,
    },

    /// Idempotency key or payment ID already used.
    #[error("duplicate request: {request_id}")]
    DuplicateRequest {
        /// The replayed key.
        request_id: String,
    },

    /// Ad view not eligible for monetization.
    #[error("ad view rejected: {0}")]
    AdViewRejected(AdViewRejection),

    /// Domain rule violated while applying a change.
    #[error(transparent)]
    Domain(#[from] MonetizationError),
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
