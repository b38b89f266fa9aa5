//! API handlers.

// Allow precision loss in handlers - amounts displayed are well within f64 precision
#![allow(clippy::cast_precision_loss)]

pub mod accounts;
pub mod admin;
pub mod ads;
pub mod creator;
pub mod health;
pub mod premium;
pub mod videos;
pub mod wallet;

use serde::Serialize;

use vidpay_core::{TransactionId, UserId, VideoId};

use crate::error::ApiError;

pub(crate) fn parse_video_id(raw: &str) -> Result<VideoId, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid video ID".into()))
}

pub(crate) fn parse_user_id(raw: &str) -> Result<UserId, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid user ID".into()))
}

pub(crate) fn parse_transaction_id(raw: &str) -> Result<TransactionId, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid transaction ID".into()))
}

/// Pagination metadata.
#[derive(Debug, Serialize)]
pub struct Pagination {
    /// Current page (1-based).
    pub page: usize,
    /// Page size.
    pub limit: usize,
    /// Total matching items.
    pub total: usize,
    /// Number of pages.
    pub pages: usize,
}

impl Pagination {
    /// Pagination for `total` items at `page`/`limit`.
    #[must_use]
    pub fn new(page: usize, limit: usize, total: usize) -> Self {
        Self {
            page,
            limit,
            total,
            pages: total.div_ceil(limit.max(1)),
        }
    }
}

/// Clamp a 1-based page and a page size, returning `(page, limit, offset)`.
pub(crate) fn page_window(
    page: Option<usize>,
    limit: Option<usize>,
    default_limit: usize,
    max_limit: usize,
) -> (usize, usize, usize) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(default_limit).clamp(1, max_limit);
    (page, limit, (page - 1).saturating_mul(limit))
}
