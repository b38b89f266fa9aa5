//! Append-only audit log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::revenue::RevenueSplit;
use crate::{AdViewId, AuditId, TransactionId, UserId, VideoId};

/// Currency recorded on audit entries.
pub const DEFAULT_CURRENCY: &str = "INR";

/// Risk flag attached to ad views attempted inside the cooldown window.
pub const REPEAT_AD_VIEW_FLAG: &str = "repeat_ad_view_within_cooldown";

/// Risk score given to repeat ad view attempts.
pub const REPEAT_AD_VIEW_RISK_SCORE: u8 = 50;

/// One monetization event attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Entry ID (ULID, sorts by time).
    pub id: AuditId,
    /// Kind of event.
    pub event_type: AuditEventType,
    /// Who initiated the action.
    pub user_id: UserId,
    /// Initiator's email at the time.
    pub user_email: Option<String>,
    /// Client IP address.
    pub ip_address: Option<String>,
    /// Client user agent.
    pub user_agent: Option<String>,
    /// Amount involved, in micros.
    pub amount_micros: i64,
    /// Currency code.
    pub currency: String,
    /// Related video.
    pub video_id: Option<VideoId>,
    /// Related transaction.
    pub transaction_id: Option<TransactionId>,
    /// Related ad view.
    pub ad_view_id: Option<AdViewId>,
    /// Revenue split for ad views.
    pub revenue: Option<RevenueSplit>,
    /// Outcome.
    pub status: AuditStatus,
    /// Why the attempt failed.
    pub failure_reason: Option<String>,
    /// Risk score, 0 to 100.
    pub risk_score: u8,
    /// Risk flags.
    pub risk_flags: Vec<String>,
    /// When the event happened.
    pub timestamp: DateTime<Utc>,
    /// Free-form metadata.
    pub metadata: serde_json::Value,
}

impl AuditEntry {
    /// Start an entry.
    #[must_use]
    pub fn new(
        event_type: AuditEventType,
        user_id: UserId,
        status: AuditStatus,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AuditId::generate(),
            event_type,
            user_id,
            user_email: None,
            ip_address: None,
            user_agent: None,
            amount_micros: 0,
            currency: DEFAULT_CURRENCY.to_string(),
            video_id: None,
            transaction_id: None,
            ad_view_id: None,
            revenue: None,
            status,
            failure_reason: None,
            risk_score: 0,
            risk_flags: Vec::new(),
            timestamp,
            metadata: serde_json::Value::Null,
        }
    }

    /// Set the initiator's email.
    #[must_use]
    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.user_email = email;
        self
    }

    /// Set the client IP and user agent.
    #[must_use]
    pub fn with_client(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }

    /// Set the amount.
    #[must_use]
    pub fn with_amount(mut self, amount_micros: i64) -> Self {
        self.amount_micros = amount_micros;
        self
    }

    /// Set the related video.
    #[must_use]
    pub fn with_video(mut self, video_id: VideoId) -> Self {
        self.video_id = Some(video_id);
        self
    }

    /// Set the related transaction.
    #[must_use]
    pub fn with_transaction(mut self, transaction_id: TransactionId) -> Self {
        self.transaction_id = Some(transaction_id);
        self
    }

    /// Set the related ad view.
    #[must_use]
    pub fn with_ad_view(mut self, ad_view_id: AdViewId) -> Self {
        self.ad_view_id = Some(ad_view_id);
        self
    }

    /// Record the revenue split.
    #[must_use]
    pub fn with_revenue(mut self, split: RevenueSplit) -> Self {
        self.revenue = Some(split);
        self
    }

    /// Record a failure reason.
    #[must_use]
    pub fn with_failure(mut self, reason: impl Into<String>) -> Self {
        self.failure_reason = Some(reason.into());
        self
    }

    /// Add a risk flag, keeping the highest score.
    #[must_use]
    pub fn with_risk(mut self, flag: impl Into<String>, score: u8) -> Self {
        self.risk_flags.push(flag.into());
        self.risk_score = self.risk_score.max(score.min(100));
        self
    }

    /// Attach metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Kind of audited event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// Ad view attempt.
    AdView,
    /// Earning credited.
    Earning,
    /// Withdrawal requested.
    Withdrawal,
    /// Premium purchase.
    PremiumSubscription,
    /// Withdrawal paid out.
    Payout,
    /// Wallet adjusted outside an ad view (refunds).
    BalanceUpdate,
}

impl AuditEventType {
    /// Wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AdView => "ad_view",
            Self::Earning => "earning",
            Self::Withdrawal => "withdrawal",
            Self::PremiumSubscription => "premium_subscription",
            Self::Payout => "payout",
            Self::BalanceUpdate => "balance_update",
        }
    }
}

/// Outcome of an audited event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    /// Succeeded.
    Success,
    /// Rejected or failed.
    Failed,
    /// Awaiting resolution.
    Pending,
    /// Rejected and suspicious.
    Flagged,
}

impl AuditStatus {
    /// Wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Pending => "pending",
            Self::Flagged => "flagged",
        }
    }
}

/// Filter over audit entries. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    /// Event type.
    pub event_type: Option<AuditEventType>,
    /// Status.
    pub status: Option<AuditStatus>,
    /// Initiator.
    pub user_id: Option<UserId>,
    /// Inclusive lower bound on the timestamp.
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the timestamp.
    pub end: Option<DateTime<Utc>>,
}

impl AuditFilter {
    /// Whether `entry` passes the filter.
    #[must_use]
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        self.event_type.map_or(true, |t| entry.event_type == t)
            && self.status.map_or(true, |s| entry.status == s)
            && self.user_id.map_or(true, |u| entry.user_id == u)
            && self.start.map_or(true, |start| entry.timestamp >= start)
            && self.end.map_or(true, |end| entry.timestamp <= end)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn builder_records_revenue_and_amount() {
        let split = RevenueSplit::from_cpm(100).unwrap();
        let entry = AuditEntry::new(
            AuditEventType::AdView,
            UserId::generate(),
            AuditStatus::Success,
            Utc::now(),
        )
        .with_amount(split.creator_micros)
        .with_revenue(split);

        assert_eq!(entry.amount_micros, 55_000);
        assert_eq!(entry.currency, "INR");
        assert_eq!(entry.revenue.unwrap().creator_micros, 55_000);
    }

    #[test]
    fn risk_score_keeps_maximum() {
        let entry = AuditEntry::new(
            AuditEventType::AdView,
            UserId::generate(),
            AuditStatus::Flagged,
            Utc::now(),
        )
        .with_risk(REPEAT_AD_VIEW_FLAG, REPEAT_AD_VIEW_RISK_SCORE)
        .with_risk("other", 10);

        assert_eq!(entry.risk_score, 50);
        assert_eq!(entry.risk_flags.len(), 2);
    }

    #[test]
    fn filter_matches_all_fields() {
        let now = Utc::now();
        let user = UserId::generate();
        let entry = AuditEntry::new(AuditEventType::Payout, user, AuditStatus::Success, now);

        assert!(AuditFilter::default().matches(&entry));
        assert!(AuditFilter {
            event_type: Some(AuditEventType::Payout),
            user_id: Some(user),
            start: Some(now - Duration::minutes(1)),
            end: Some(now),
            ..AuditFilter::default()
        }
        .matches(&entry));
        assert!(!AuditFilter {
            status: Some(AuditStatus::Flagged),
            ..AuditFilter::default()
        }
        .matches(&entry));
        assert!(!AuditFilter {
            start: Some(now + Duration::seconds(1)),
            ..AuditFilter::default()
        }
        .matches(&entry));
    }

    #[test]
    fn event_type_wire_name() {
        assert_eq!(
            serde_json::to_string(&AuditEventType::BalanceUpdate).unwrap(),
            "\"balance_update\""
        );
        assert_eq!(AuditStatus::Flagged.as_str(), "flagged");
    }
}
