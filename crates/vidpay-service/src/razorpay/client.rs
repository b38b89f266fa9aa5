//! Razorpay API client implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::types::{CreateOrderBody, Order, Payment, RazorpayErrorResponse};
use crate::crypto;
use crate::payments::{
    OrderRequest, PaymentError, PaymentProvider, ProviderOrder, ProviderPayment,
};

/// Razorpay API base URL.
pub const DEFAULT_API_URL: &str = "https://api.razorpay.com/v1";

/// Razorpay API client.
#[derive(Debug, Clone)]
pub struct RazorpayClient {
    client: Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl RazorpayClient {
    /// Create a new Razorpay client.
    ///
    /// # Arguments
    ///
    /// * `key_id` - Public key ID (`rzp_test_...` or `rzp_live_...`)
    /// * `key_secret` - Key secret, also used to verify checkout signatures
    /// * `base_url` - API base URL, normally [`DEFAULT_API_URL`]
    /// * `timeout` - Per-request timeout
    pub fn new(
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, PaymentError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PaymentError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key_id: key_id.into(),
            key_secret: key_secret.into(),
        })
    }

    /// Create an order.
    pub async fn create_order(&self, request: &OrderRequest) -> Result<Order, PaymentError> {
        let body = CreateOrderBody {
            amount: request.amount_minor,
            currency: &request.currency,
            receipt: &request.receipt,
            notes: &request.notes,
        };

        let response = self
            .client
            .post(format!("{}/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Get a payment by ID.
    pub async fn get_payment(&self, payment_id: &str) -> Result<Payment, PaymentError> {
        let response = self
            .client
            .get(format!("{}/payments/{}", self.base_url, payment_id))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Handle API response, parsing errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, PaymentError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let error_body = response.text().await.unwrap_or_default();

        if let Ok(error_response) = serde_json::from_str::<RazorpayErrorResponse>(&error_body) {
            return Err(PaymentError::Api {
                code: error_response.error.code,
                description: error_response.error.description,
            });
        }

        Err(PaymentError::Api {
            code: "unknown".to_string(),
            description: format!("HTTP {status}: {error_body}"),
        })
    }
}

#[async_trait]
impl PaymentProvider for RazorpayClient {
    fn key_id(&self) -> &str {
        &self.key_id
    }

    async fn create_order(&self, request: &OrderRequest) -> Result<ProviderOrder, PaymentError> {
        let order = RazorpayClient::create_order(self, request).await?;
        Ok(ProviderOrder {
            id: order.id,
            amount_minor: order.amount,
            currency: order.currency,
        })
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<ProviderPayment, PaymentError> {
        let payment = self.get_payment(payment_id).await?;
        Ok(ProviderPayment {
            id: payment.id,
            order_id: payment.order_id,
            amount_minor: payment.amount,
            currency: payment.currency,
            status: payment.status,
        })
    }

    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        crypto::verify_payment_signature(&self.key_secret, order_id, payment_id, signature)
    }
}
