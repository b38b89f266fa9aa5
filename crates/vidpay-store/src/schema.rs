//! Database schema definitions and column families.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// User profiles, keyed by `user_id`.
    pub const USERS: &str = "users";

    /// Videos, keyed by `video_id`.
    pub const VIDEOS: &str = "videos";

    /// Index: videos by creator, keyed by `creator_id || video_id`.
    /// Value is empty (index only).
    pub const VIDEOS_BY_CREATOR: &str = "videos_by_creator";

    /// View sessions, keyed by `video_id || viewer_id`.
    pub const VIEW_SESSIONS: &str = "view_sessions";

    /// Ad views, keyed by `ad_view_id` (ULID).
    pub const AD_VIEWS: &str = "ad_views";

    /// Index: ad views by video, keyed by `video_id || ad_view_id`.
    pub const AD_VIEWS_BY_VIDEO: &str = "ad_views_by_video";

    /// Transactions, keyed by `transaction_id` (ULID).
    pub const TRANSACTIONS: &str = "transactions";

    /// Index: transactions by user, keyed by `user_id || transaction_id`.
    pub const TRANSACTIONS_BY_USER: &str = "transactions_by_user";

    /// Audit log, keyed by `audit_id` (ULID). Append-only.
    pub const AUDIT_LOG: &str = "audit_log";

    /// Used idempotency keys, keyed by `operation:user_id:key`.
    pub const IDEMPOTENCY: &str = "idempotency";

    /// Premium orders, keyed by provider order ID.
    pub const PREMIUM_ORDERS: &str = "premium_orders";

    /// Verified premium payments, keyed by provider payment ID.
    /// Value is the transaction ID.
    pub const PREMIUM_PAYMENTS: &str = "premium_payments";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::USERS,
        cf::VIDEOS,
        cf::VIDEOS_BY_CREATOR,
        cf::VIEW_SESSIONS,
        cf::AD_VIEWS,
        cf::AD_VIEWS_BY_VIDEO,
        cf::TRANSACTIONS,
        cf::TRANSACTIONS_BY_USER,
        cf::AUDIT_LOG,
        cf::IDEMPOTENCY,
        cf::PREMIUM_ORDERS,
        cf::PREMIUM_PAYMENTS,
    ]
}
