//! Key encoding utilities for `RocksDB`.
//!
//! Primary keys are the raw 16 bytes of an ID. Index keys concatenate two
//! IDs; ULID suffixes keep index entries in creation order.

use vidpay_core::{AdViewId, AuditId, TransactionId, UserId, VideoId};

use crate::error::{Result, StoreError};

/// Create a user key.
#[must_use]
pub fn user_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Create a video key.
#[must_use]
pub fn video_key(video_id: &VideoId) -> Vec<u8> {
    video_id.as_bytes().to_vec()
}

/// Create a creator-video index key.
///
/// Format: `creator_id (16 bytes) || video_id (16 bytes)`
#[must_use]
pub fn creator_video_key(creator_id: &UserId, video_id: &VideoId) -> Vec<u8> {
    pair(creator_id.as_bytes(), video_id.as_bytes())
}

/// Create a view session key.
///
/// Format: `video_id (16 bytes) || viewer_id (16 bytes)`
#[must_use]
pub fn session_key(video_id: &VideoId, viewer_id: &UserId) -> Vec<u8> {
    pair(video_id.as_bytes(), viewer_id.as_bytes())
}

/// Create an ad view key.
#[must_use]
pub fn ad_view_key(ad_view_id: &AdViewId) -> Vec<u8> {
    ad_view_id.to_bytes().to_vec()
}

/// Create a video-ad-view index key.
///
/// Format: `video_id (16 bytes) || ad_view_id (16 bytes)`
#[must_use]
pub fn video_ad_view_key(video_id: &VideoId, ad_view_id: &AdViewId) -> Vec<u8> {
    pair(video_id.as_bytes(), &ad_view_id.to_bytes())
}

/// Create a transaction key.
#[must_use]
pub fn transaction_key(transaction_id: &TransactionId) -> Vec<u8> {
    transaction_id.to_bytes().to_vec()
}

/// Create a user-transaction index key.
///
/// Format: `user_id (16 bytes) || transaction_id (16 bytes)`
#[must_use]
pub fn user_transaction_key(user_id: &UserId, transaction_id: &TransactionId) -> Vec<u8> {
    pair(user_id.as_bytes(), &transaction_id.to_bytes())
}

/// Create an audit entry key.
#[must_use]
pub fn audit_key(audit_id: &AuditId) -> Vec<u8> {
    audit_id.to_bytes().to_vec()
}

/// Create an idempotency key scoped to a user and operation.
#[must_use]
pub fn idempotency_key(operation: &str, user_id: &UserId, key: &str) -> Vec<u8> {
    format!("{operation}:{user_id}:{key}").into_bytes()
}

/// Create a premium order key.
#[must_use]
pub fn premium_order_key(order_id: &str) -> Vec<u8> {
    order_id.as_bytes().to_vec()
}

/// Create a premium payment key.
#[must_use]
pub fn premium_payment_key(payment_id: &str) -> Vec<u8> {
    payment_id.as_bytes().to_vec()
}

fn pair(first: &[u8; 16], second: &[u8; 16]) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(first);
    key.extend_from_slice(second);
    key
}

/// Second 16-byte half of an index key.
fn suffix(key: &[u8]) -> Result<[u8; 16]> {
    key.get(16..32)
        .and_then(|bytes| <[u8; 16]>::try_from(bytes).ok())
        .ok_or_else(|| StoreError::Database(format!("malformed index key ({} bytes)", key.len())))
}

/// Extract the video ID from a creator-video index key.
///
/// # Errors
///
/// Returns `StoreError::Database` if the key is shorter than 32 bytes.
pub fn video_id_from_index(key: &[u8]) -> Result<VideoId> {
    suffix(key).map(VideoId::from_bytes)
}

/// Extract the ad view ID from a video-ad-view index key.
///
/// # Errors
///
/// Returns `StoreError::Database` if the key is shorter than 32 bytes.
pub fn ad_view_id_from_index(key: &[u8]) -> Result<AdViewId> {
    suffix(key).map(AdViewId::from_bytes)
}

/// Extract the transaction ID from a user-transaction index key.
///
/// # Errors
///
/// Returns `StoreError::Database` if the key is shorter than 32 bytes.
pub fn transaction_id_from_index(key: &[u8]) -> Result<TransactionId> {
    suffix(key).map(TransactionId::from_bytes)
}
