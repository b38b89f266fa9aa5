//! Money-movement transactions.
//!
//! Every credit to or debit from a wallet, and every premium purchase,
//! creates a [`Transaction`]. Earnings and subscriptions are created
//! `completed`; withdrawals start `pending` and are resolved by an admin.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ad_view::AdView;
use crate::error::{MonetizationError, Result};
use crate::revenue::MICROS_PER_UNIT;
use crate::user::BankDetails;
use crate::{AdViewId, TransactionId, UserId, VideoId};

/// Smallest withdrawal, in currency units.
pub const MIN_WITHDRAWAL_UNITS: i64 = 1000;

/// Smallest withdrawal, in micros.
pub const MIN_WITHDRAWAL_MICROS: i64 = MIN_WITHDRAWAL_UNITS * MICROS_PER_UNIT;

/// Default reason recorded when an admin rejects without one.
pub const DEFAULT_REJECTION_REASON: &str = "Rejected by admin";

/// A money-movement record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction ID (ULID for time-ordering).
    pub id: TransactionId,

    /// The user whose money moved: the creator for earnings and
    /// withdrawals, the subscriber for premium purchases.
    pub user_id: UserId,

    /// Amount in micros. Always positive; the type gives the direction.
    pub amount_micros: i64,

    /// Type of transaction.
    pub transaction_type: TransactionType,

    /// Current status.
    pub status: TransactionStatus,

    /// Source video for earnings.
    pub video_id: Option<VideoId>,

    /// Source ad view for earnings.
    pub ad_view_id: Option<AdViewId>,

    /// Payout details for withdrawals.
    pub withdrawal: Option<WithdrawalDetails>,

    /// Purchase details for premium subscriptions.
    pub subscription: Option<SubscriptionDetails>,

    /// Admin who resolved a withdrawal.
    pub approved_by: Option<UserId>,

    /// When the withdrawal was resolved.
    pub approved_at: Option<DateTime<Utc>>,

    /// When the transaction was created.
    pub created_at: DateTime<Utc>,

    /// When the transaction was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    fn base(
        user_id: UserId,
        amount_micros: i64,
        transaction_type: TransactionType,
        status: TransactionStatus,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TransactionId::generate(),
            user_id,
            amount_micros,
            transaction_type,
            status,
            video_id: None,
            ad_view_id: None,
            withdrawal: None,
            subscription: None,
            approved_by: None,
            approved_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Completed earning for the creator share of an ad view.
    #[must_use]
    pub fn earning(ad_view: &AdView) -> Self {
        let mut tx = Self::base(
            ad_view.creator_id,
            ad_view.creator_revenue_micros,
            TransactionType::Earning,
            TransactionStatus::Completed,
            ad_view.created_at,
        );
        tx.video_id = Some(ad_view.video_id);
        tx.ad_view_id = Some(ad_view.ad_view_id);
        tx
    }

    /// Pending withdrawal paid out to `bank_details`.
    ///
    /// # Errors
    ///
    /// Returns [`MonetizationError::BelowMinimumWithdrawal`] when the amount
    /// is under [`MIN_WITHDRAWAL_MICROS`].
    pub fn withdrawal(
        user_id: UserId,
        amount_micros: i64,
        bank_details: BankDetails,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        validate_withdrawal_amount(amount_micros)?;

        let mut tx = Self::base(
            user_id,
            amount_micros,
            TransactionType::Withdrawal,
            TransactionStatus::Pending,
            now,
        );
        tx.withdrawal = Some(WithdrawalDetails {
            bank_reference: format!("BANK_{}", now.timestamp_millis()),
            bank_details,
            payout_reference: None,
            failure_reason: None,
        });
        Ok(tx)
    }

    /// Completed premium purchase.
    #[must_use]
    pub fn premium_subscription(
        user_id: UserId,
        amount_micros: i64,
        subscription: SubscriptionDetails,
        now: DateTime<Utc>,
    ) -> Self {
        let mut tx = Self::base(
            user_id,
            amount_micros,
            TransactionType::PremiumSubscription,
            TransactionStatus::Completed,
            now,
        );
        tx.subscription = Some(subscription);
        tx
    }

    /// Whether this is a withdrawal awaiting an admin decision.
    #[must_use]
    pub fn is_pending_withdrawal(&self) -> bool {
        self.transaction_type == TransactionType::Withdrawal
            && self.status == TransactionStatus::Pending
    }

    fn ensure_pending_withdrawal(&self) -> Result<()> {
        if self.is_pending_withdrawal() {
            Ok(())
        } else {
            Err(MonetizationError::InvalidTransactionState {
                transaction_type: self.transaction_type,
                status: self.status,
            })
        }
    }

    /// Approve a pending withdrawal and mark it paid out.
    ///
    /// # Errors
    ///
    /// Returns [`MonetizationError::InvalidTransactionState`] unless this is
    /// a pending withdrawal.
    pub fn approve_withdrawal(&mut self, admin_id: UserId, now: DateTime<Utc>) -> Result<()> {
        self.ensure_pending_withdrawal()?;

        self.status = TransactionStatus::Completed;
        self.approved_by = Some(admin_id);
        self.approved_at = Some(now);
        self.updated_at = now;
        if let Some(details) = self.withdrawal.as_mut() {
            details.payout_reference = Some(format!("PAYOUT_{}", self.id));
        }
        Ok(())
    }

    /// Reject a pending withdrawal. Returns the amount to refund.
    ///
    /// # Errors
    ///
    /// Returns [`MonetizationError::InvalidTransactionState`] unless this is
    /// a pending withdrawal.
    pub fn reject_withdrawal(
        &mut self,
        admin_id: UserId,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<i64> {
        self.ensure_pending_withdrawal()?;

        self.status = TransactionStatus::Rejected;
        self.approved_by = Some(admin_id);
        self.approved_at = Some(now);
        self.updated_at = now;
        let reason = reason
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_string());
        if let Some(details) = self.withdrawal.as_mut() {
            details.failure_reason = Some(reason);
        }
        Ok(self.amount_micros)
    }
}

/// Check a requested withdrawal amount.
///
/// # Errors
///
/// Returns [`MonetizationError::BelowMinimumWithdrawal`] when the amount is
/// under the minimum.
pub fn validate_withdrawal_amount(amount_micros: i64) -> Result<()> {
    if amount_micros < MIN_WITHDRAWAL_MICROS {
        return Err(MonetizationError::BelowMinimumWithdrawal {
            minimum_units: MIN_WITHDRAWAL_UNITS,
        });
    }
    Ok(())
}

/// Payout details of a withdrawal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalDetails {
    /// Snapshot of the bank account at request time.
    pub bank_details: BankDetails,
    /// Reference assigned at request time.
    pub bank_reference: String,
    /// Payout reference assigned on approval.
    pub payout_reference: Option<String>,
    /// Reason recorded on rejection.
    pub failure_reason: Option<String>,
}

/// Purchase details of a premium subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionDetails {
    /// Plan purchased.
    pub plan_id: String,
    /// Provider order ID.
    pub order_id: String,
    /// Provider payment ID.
    pub payment_id: String,
    /// Amount paid in minor units (paise).
    pub amount_minor: i64,
    /// Start of the entitlement.
    pub starts_at: DateTime<Utc>,
    /// End of the entitlement.
    pub ends_at: DateTime<Utc>,
}

/// Type of transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Creator share of an ad view.
    Earning,

    /// Creator payout.
    Withdrawal,

    /// Premium purchase.
    PremiumSubscription,
}

impl TransactionType {
    /// Wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Earning => "earning",
            Self::Withdrawal => "withdrawal",
            Self::PremiumSubscription => "premium_subscription",
        }
    }
}

/// Status of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Awaiting admin decision.
    Pending,
    /// Approved, payout not yet confirmed.
    Approved,
    /// Done.
    Completed,
    /// Failed.
    Failed,
    /// Rejected by an admin; amount refunded.
    Rejected,
}

impl TransactionStatus {
    /// Wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Rejected => "rejected",
        }
    }
}
