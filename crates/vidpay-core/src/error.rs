//! Error types for vidpay domain rules.

use crate::ids::IdError;
use crate::transaction::{TransactionStatus, TransactionType};

/// Result type for vidpay domain operations.
pub type Result<T> = std::result::Result<T, MonetizationError>;

/// Errors raised by domain validation and state transitions.
#[derive(Debug, thiserror::Error)]
pub enum MonetizationError {
    /// CPM outside the allowed range, or not positive.
    #[error("invalid CPM {cpm}: must be between {min} and {max}")]
    InvalidCpm {
        /// The rejected CPM.
        cpm: i64,
        /// Lowest accepted CPM.
        min: i64,
        /// Highest accepted CPM.
        max: i64,
    },

    /// Invalid amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Withdrawal below the minimum.
    #[error("minimum withdrawal amount is {minimum_units}")]
    BelowMinimumWithdrawal {
        /// The minimum in currency units.
        minimum_units: i64,
    },

    /// Withdrawal requested without bank details on file.
    #[error("bank details are not set up")]
    MissingBankDetails,

    /// Bank details failed validation.
    #[error("invalid bank details: {0}")]
    InvalidBankDetails(String),

    /// Transaction is not in a state that allows the requested change.
    #[error("transaction is {transaction_type:?}/{status:?}, expected pending withdrawal")]
    InvalidTransactionState {
        /// Actual transaction type.
        transaction_type: TransactionType,
        /// Actual status.
        status: TransactionStatus,
    },

    /// Channel below the subscriber or watch-hour thresholds.
    #[error("monetization requires {required_subscribers} subscribers and {required_watch_hours} watch hours")]
    MonetizationRequirementsNotMet {
        /// Subscribers required.
        required_subscribers: u64,
        /// Watch hours required.
        required_watch_hours: f64,
        /// Current subscribers.
        current_subscribers: u64,
        /// Current watch hours.
        current_watch_hours: f64,
    },

    /// Unknown premium plan.
    #[error("unknown premium plan: {0}")]
    UnknownPlan(String),

    /// Unknown role name.
    #[error("invalid role: {0}")]
    InvalidRole(String),

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),
}
