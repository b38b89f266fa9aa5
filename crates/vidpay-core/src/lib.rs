//! Core types and rules for vidpay.
//!
//! This crate holds the monetization domain of the video platform:
//!
//! - **Identifiers**: `UserId`, `VideoId`, `TransactionId`, `AdViewId`, `AuditId`
//! - **Revenue**: `RevenueSplit` (CPM to per-view revenue, 55/45 split)
//! - **Profiles**: `User`, `Role`, `BankDetails`, `ChannelStats`
//! - **Videos**: `Video`, `VideoUpload`
//! - **Sessions**: `ViewSession` and the 24-hour cooldown
//! - **Ad views**: `AdView`, `AdViewRejection`, `check_ad_eligibility`
//! - **Ledger**: `Transaction`, `TransactionType`, `TransactionStatus`
//! - **Audit**: `AuditEntry`, `AuditEventType`, `AuditStatus`
//! - **Premium**: `PremiumPlan`, `PremiumOrder`, `PREMIUM_PLANS`
//!
//! # Money
//!
//! Amounts are `i64` micros: **1 currency unit = 1 000 000 micros**.
//! A CPM of 100 yields 100 000 micros per view, of which 55 000 go to the
//! creator and 45 000 to the platform.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod ad_view;
pub mod audit;
pub mod error;
pub mod ids;
pub mod premium;
pub mod revenue;
pub mod session;
pub mod transaction;
pub mod user;
pub mod video;

pub use ad_view::{check_ad_eligibility, AdView, AdViewRejection};
pub use audit::{
    AuditEntry, AuditEventType, AuditFilter, AuditStatus, DEFAULT_CURRENCY, REPEAT_AD_VIEW_FLAG,
    REPEAT_AD_VIEW_RISK_SCORE,
};
pub use error::{MonetizationError, Result};
pub use ids::{AdViewId, AuditId, IdError, TransactionId, UserId, VideoId};
pub use premium::{
    default_plan, find_plan, PremiumOrder, PremiumPlan, DEFAULT_PLAN_ID, PREMIUM_CURRENCY,
    PREMIUM_PLANS,
};
pub use revenue::{
    micros_to_units, revenue_per_view_micros, units_to_micros, validate_cpm, RevenueSplit,
    CREATOR_SHARE_PERCENT, DEFAULT_CPM, MAX_CPM, MICROS_PER_UNIT, MIN_CPM, PLATFORM_SHARE_PERCENT,
};
pub use session::{cooldown_window, SessionEligibility, ViewSession, COOLDOWN_HOURS};
pub use transaction::{
    validate_withdrawal_amount, SubscriptionDetails, Transaction, TransactionStatus,
    TransactionType, WithdrawalDetails, MIN_WITHDRAWAL_MICROS, MIN_WITHDRAWAL_UNITS,
};
pub use user::{
    mask_account_number, BankDetails, Capability, ChannelStats, Role, User, MIN_SUBSCRIBERS,
    MIN_WATCH_HOURS,
};
pub use video::{Video, VideoUpload};
