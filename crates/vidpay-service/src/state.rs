//! Application state.

use std::sync::Arc;
use std::time::Duration;

use vidpay_store::RocksStore;

use crate::config::ServiceConfig;
use crate::payments::PaymentProvider;
use crate::razorpay::RazorpayClient;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<RocksStore>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Payment provider for premium purchases (optional).
    pub payments: Option<Arc<dyn PaymentProvider>>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<RocksStore>, config: ServiceConfig) -> Self {
        // Create Razorpay client if configured
        let payments = config
            .razorpay_credentials()
            .and_then(|(key_id, key_secret)| {
                match RazorpayClient::new(
                    key_id,
                    key_secret,
                    config.razorpay_api_url.as_str(),
                    Duration::from_secs(config.payment_timeout_seconds),
                ) {
                    Ok(client) => {
                        tracing::info!(key_id = %key_id, "Razorpay integration enabled");
                        Some(Arc::new(client) as Arc<dyn PaymentProvider>)
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to build Razorpay client");
                        None
                    }
                }
            });

        if payments.is_none() {
            tracing::warn!("Razorpay not configured - premium purchases will not be available");
        }

        Self {
            store,
            config,
            payments,
        }
    }

    /// Replace the payment provider.
    #[must_use]
    pub fn with_payments(mut self, provider: Arc<dyn PaymentProvider>) -> Self {
        self.payments = Some(provider);
        self
    }

    /// Check if a payment provider is configured.
    #[must_use]
    pub fn has_payments(&self) -> bool {
        self.payments.is_some()
    }
}
