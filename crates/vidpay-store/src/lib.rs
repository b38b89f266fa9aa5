//! `RocksDB` storage layer for vidpay.
//!
//! This crate persists users, videos, view sessions, ad views, transactions,
//! premium orders and the audit log using `RocksDB` column families.
//!
//! # Atomicity
//!
//! Every operation that moves money is a single compound method. It locks
//! each entity it touches (see [`locks`]), re-checks its guard under the
//! lock (cooldown, balance, pending status, payment not yet used) and
//! commits all records in one `WriteBatch`.
//!
//! # Example
//!
//! ```no_run
//! use vidpay_store::{RocksStore, Store};
//! use vidpay_core::{User, UserId};
//!
//! let store = RocksStore::open("/tmp/vidpay-db").unwrap();
//!
//! let user = User::new(UserId::generate());
//! store.create_user(&user).unwrap();
//!
//! let retrieved = store.get_user(&user.user_id).unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod locks;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;

use chrono::{DateTime, Utc};
use vidpay_core::{
    AdView, AuditEntry, AuditFilter, BankDetails, ChannelStats, PremiumOrder, PremiumPlan, Role,
    Transaction, TransactionId, TransactionStatus, TransactionType, User, UserId, Video, VideoId,
    ViewSession,
};

/// Client details copied into sessions and audit entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    /// Client IP address.
    pub ip_address: Option<String>,
    /// Client user agent.
    pub user_agent: Option<String>,
}

/// A completed ad impression to monetize.
#[derive(Debug, Clone)]
pub struct AdViewRecording {
    /// Video the ad ran on.
    pub video_id: VideoId,
    /// Viewer.
    pub viewer_id: UserId,
    /// Viewer's client.
    pub client: ClientInfo,
    /// Client-supplied idempotency key.
    pub idempotency_key: Option<String>,
    /// Time of the request.
    pub now: DateTime<Utc>,
}

/// Result of a monetized ad view.
#[derive(Debug, Clone)]
pub struct RecordedAdView {
    /// The stored ad view.
    pub ad_view: AdView,
    /// The earning transaction.
    pub transaction_id: TransactionId,
    /// Creator wallet balance after the credit, in micros.
    pub creator_balance_micros: i64,
}

/// A creator's payout request.
#[derive(Debug, Clone)]
pub struct WithdrawalRequest {
    /// Creator.
    pub user_id: UserId,
    /// Amount in micros.
    pub amount_micros: i64,
    /// Creator's client.
    pub client: ClientInfo,
    /// Client-supplied idempotency key.
    pub idempotency_key: Option<String>,
    /// Time of the request.
    pub now: DateTime<Utc>,
}

/// Result of counting watch time.
#[derive(Debug, Clone)]
pub struct WatchTimeReceipt {
    /// Hours added to the creator's channel.
    pub hours_added: f64,
    /// The creator's channel stats after the update.
    pub stats: ChannelStats,
}

/// Result of an accepted withdrawal request.
#[derive(Debug, Clone)]
pub struct WithdrawalReceipt {
    /// The pending withdrawal.
    pub transaction: Transaction,
    /// Wallet balance after the debit, in micros.
    pub remaining_balance_micros: i64,
}

/// An admin decision on a pending withdrawal.
#[derive(Debug, Clone)]
pub struct WithdrawalResolution {
    /// Withdrawal to resolve.
    pub transaction_id: TransactionId,
    /// Deciding admin.
    pub admin_id: UserId,
    /// Approve (pay out) or reject (refund).
    pub approve: bool,
    /// Rejection reason.
    pub reason: Option<String>,
    /// Admin's client.
    pub client: ClientInfo,
    /// Time of the decision.
    pub now: DateTime<Utc>,
}

/// A verified premium payment to activate.
#[derive(Debug, Clone)]
pub struct PremiumActivation {
    /// Paying user.
    pub user_id: UserId,
    /// Plan bought.
    pub plan: PremiumPlan,
    /// Provider order ID.
    pub order_id: String,
    /// Provider payment ID.
    pub payment_id: String,
    /// Amount captured, in minor units.
    pub amount_minor: i64,
    /// User's client.
    pub client: ClientInfo,
    /// Time of verification.
    pub now: DateTime<Utc>,
}

/// Result of a premium activation.
#[derive(Debug, Clone)]
pub struct PremiumReceipt {
    /// Updated user.
    pub user: User,
    /// The subscription transaction.
    pub transaction: Transaction,
}

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer, allowing for different implementations
/// (e.g., `RocksDB`, in-memory for testing).
pub trait Store: Send + Sync {
    // =========================================================================
    // User Operations
    // =========================================================================

    /// Insert a new user profile.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyExists` if the user is already registered.
    fn create_user(&self, user: &User) -> Result<()>;

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_user(&self, user_id: &UserId) -> Result<Option<User>>;

    /// List all users, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_users(&self) -> Result<Vec<User>>;

    /// Change a user's role.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user doesn't exist.
    fn update_user_role(&self, user_id: &UserId, role: Role) -> Result<User>;

    /// Replace a user's payout bank details.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user doesn't exist.
    fn update_bank_details(&self, user_id: &UserId, bank_details: BankDetails) -> Result<User>;

    /// Switch monetization on or off for a user and all of their videos.
    ///
    /// Returns the updated user and the number of videos changed.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the user doesn't exist.
    /// - `StoreError::Domain` if enabling and the channel is not eligible.
    fn set_monetization(
        &self,
        user_id: &UserId,
        enable: bool,
        now: DateTime<Utc>,
    ) -> Result<(User, usize)>;

    // =========================================================================
    // Video Operations
    // =========================================================================

    /// Insert a new video and its creator index entry.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyExists` if the video ID is taken.
    fn create_video(&self, video: &Video) -> Result<()>;

    /// Get a video by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_video(&self, video_id: &VideoId) -> Result<Option<Video>>;

    /// List all videos.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_videos(&self) -> Result<Vec<Video>>;

    /// List a creator's videos.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_videos_by_creator(&self, creator_id: &UserId) -> Result<Vec<Video>>;

    /// Count all videos.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn count_videos(&self) -> Result<usize>;

    /// Set a video's CPM. Only the owner may do so.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the video doesn't exist or belongs to
    ///   someone else.
    /// - `StoreError::Domain` if the CPM is out of range.
    fn update_cpm(&self, video_id: &VideoId, owner_id: &UserId, cpm: i64) -> Result<Video>;

    /// Count one play of a video and add watch time to its creator.
    ///
    /// Returns the hours added and the creator's updated channel stats.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the video or creator doesn't exist.
    fn add_watch_time(&self, video_id: &VideoId, watch_seconds: u64) -> Result<WatchTimeReceipt>;

    // =========================================================================
    // View Session Operations
    // =========================================================================

    /// Get the session for a (video, viewer) pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_session(&self, video_id: &VideoId, viewer_id: &UserId) -> Result<Option<ViewSession>>;

    /// Create the session for a pair, or refresh it when its window has
    /// lapsed and no cooldown is active.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn start_view_session(
        &self,
        video_id: &VideoId,
        viewer_id: &UserId,
        client: &ClientInfo,
        now: DateTime<Utc>,
    ) -> Result<ViewSession>;

    /// Delete sessions that can no longer gate anything.
    ///
    /// Returns the number of sessions removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn purge_stale_sessions(&self, now: DateTime<Utc>) -> Result<usize>;

    // =========================================================================
    // Ad View Operations
    // =========================================================================

    /// Monetize one completed ad impression.
    ///
    /// Writes the ad view, creator credit, video counters, earning
    /// transaction, session cooldown and audit entry atomically.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the video, viewer or creator doesn't exist.
    /// - `StoreError::AdViewRejected` if the view is not eligible.
    /// - `StoreError::DuplicateRequest` if the idempotency key was used.
    fn record_ad_view(&self, recording: &AdViewRecording) -> Result<RecordedAdView>;

    /// List a video's ad views, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_ad_views_by_video(
        &self,
        video_id: &VideoId,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<AdView>>;

    /// Count all ad views.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn count_ad_views(&self) -> Result<usize>;

    // =========================================================================
    // Transaction Operations
    // =========================================================================

    /// Get a transaction by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_transaction(&self, transaction_id: &TransactionId) -> Result<Option<Transaction>>;

    /// List a user's transactions of an optional type, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_transactions_by_user(
        &self,
        user_id: &UserId,
        transaction_type: Option<TransactionType>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Transaction>>;

    /// List all transactions matching an optional type and status, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_transactions(
        &self,
        transaction_type: Option<TransactionType>,
        status: Option<TransactionStatus>,
    ) -> Result<Vec<Transaction>>;

    /// Debit a creator's wallet and open a pending withdrawal.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the user doesn't exist.
    /// - `StoreError::Domain` if the amount is below the minimum or no bank
    ///   details are on file.
    /// - `StoreError::InsufficientBalance` if the balance is too low.
    /// - `StoreError::DuplicateRequest` if the idempotency key was used.
    fn request_withdrawal(&self, request: &WithdrawalRequest) -> Result<WithdrawalReceipt>;

    /// Approve or reject a pending withdrawal. Rejection refunds the wallet.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the transaction or its user doesn't exist.
    /// - `StoreError::Domain` if it is not a pending withdrawal.
    fn resolve_withdrawal(&self, resolution: &WithdrawalResolution) -> Result<Transaction>;

    // =========================================================================
    // Premium Operations
    // =========================================================================

    /// Record an issued premium order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_premium_order(&self, order: &PremiumOrder) -> Result<()>;

    /// Get a premium order by provider order ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_premium_order(&self, order_id: &str) -> Result<Option<PremiumOrder>>;

    /// Grant premium for a verified payment and record the purchase.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the user doesn't exist.
    /// - `StoreError::DuplicateRequest` if the payment was already used.
    fn activate_premium(&self, activation: &PremiumActivation) -> Result<PremiumReceipt>;

    // =========================================================================
    // Audit Operations
    // =========================================================================

    /// Append an audit entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn append_audit(&self, entry: &AuditEntry) -> Result<()>;

    /// Page through matching audit entries, newest first.
    ///
    /// Returns the page and the total number of matches.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_audit(
        &self,
        filter: &AuditFilter,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<AuditEntry>, usize)>;
}
