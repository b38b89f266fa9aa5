//! Razorpay API types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Body of `POST /orders`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderBody<'a> {
    /// Amount in paise.
    pub amount: i64,
    /// Currency code.
    pub currency: &'a str,
    /// Our receipt reference.
    pub receipt: &'a str,
    /// Notes stored with the order.
    pub notes: &'a BTreeMap<String, String>,
}

/// Razorpay order object.
#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    /// Order ID (`order_...`).
    pub id: String,
    /// Amount in paise.
    pub amount: i64,
    /// Currency code.
    pub currency: String,
    /// Receipt reference.
    #[serde(default)]
    pub receipt: Option<String>,
    /// Order status (created, attempted, paid).
    #[serde(default)]
    pub status: Option<String>,
}

/// Razorpay payment object.
#[derive(Debug, Clone, Deserialize)]
pub struct Payment {
    /// Payment ID (`pay_...`).
    pub id: String,
    /// Amount in paise.
    pub amount: i64,
    /// Currency code.
    #[serde(default)]
    pub currency: String,
    /// Status (created, authorized, captured, refunded, failed).
    pub status: String,
    /// Order the payment belongs to.
    #[serde(default)]
    pub order_id: Option<String>,
}

/// Razorpay error response.
#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayErrorResponse {
    /// Error details.
    pub error: RazorpayErrorBody,
}

/// Razorpay error body.
#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayErrorBody {
    /// Error code (e.g. `BAD_REQUEST_ERROR`).
    pub code: String,
    /// Error description.
    #[serde(default)]
    pub description: String,
}
