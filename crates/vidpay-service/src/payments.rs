//! Payment provider abstraction.
//!
//! The premium flow talks to a provider through [`PaymentProvider`]. The
//! service holds `Option<Arc<dyn PaymentProvider>>`, decided once at startup;
//! `None` means payments are disabled and premium purchase endpoints answer
//! 503.

use std::collections::BTreeMap;

use async_trait::async_trait;

/// Error type for payment provider operations.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// HTTP request failed or timed out.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider returned an error.
    #[error("payment provider error: {code} - {description}")]
    Api {
        /// Provider error code.
        code: String,
        /// Provider error description.
        description: String,
    },

    /// Client misconfigured.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Order to create with the provider.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    /// Amount in minor units.
    pub amount_minor: i64,
    /// Currency code.
    pub currency: String,
    /// Our receipt reference.
    pub receipt: String,
    /// Free-form notes stored with the order.
    pub notes: BTreeMap<String, String>,
}

/// An order created by the provider.
#[derive(Debug, Clone)]
pub struct ProviderOrder {
    /// Provider order ID.
    pub id: String,
    /// Amount in minor units.
    pub amount_minor: i64,
    /// Currency code.
    pub currency: String,
}

/// A payment as reported by the provider.
#[derive(Debug, Clone)]
pub struct ProviderPayment {
    /// Provider payment ID.
    pub id: String,
    /// Order the payment belongs to.
    pub order_id: Option<String>,
    /// Amount in minor units.
    pub amount_minor: i64,
    /// Currency code.
    pub currency: String,
    /// Provider status (`captured`, `authorized`, `failed`, ...).
    pub status: String,
}

impl ProviderPayment {
    /// Whether the funds were captured.
    #[must_use]
    pub fn is_captured(&self) -> bool {
        self.status == "captured"
    }
}

/// A payment provider used for premium purchases.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Public key ID handed to checkout clients.
    fn key_id(&self) -> &str;

    /// Create an order for the client to pay.
    async fn create_order(&self, request: &OrderRequest) -> Result<ProviderOrder, PaymentError>;

    /// Look up a payment.
    async fn fetch_payment(&self, payment_id: &str) -> Result<ProviderPayment, PaymentError>;

    /// Check the signature returned to the client after checkout.
    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool;
}
