//! Premium subscription handlers.
//!
//! Flow: the client creates an order, pays it through the provider's
//! checkout, then posts the signed confirmation back. Verification checks
//! the signature, the stored order and the provider's capture status and
//! amount before granting premium.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use vidpay_core::{
    default_plan, find_plan, AuditEntry, AuditEventType, AuditStatus, PremiumOrder, PremiumPlan,
    User, DEFAULT_PLAN_ID, PREMIUM_CURRENCY, PREMIUM_PLANS,
};
use vidpay_store::{ClientInfo, PremiumActivation, Store};

use crate::auth::CurrentUser;
use crate::context::RequestContext;
use crate::error::ApiError;
use crate::payments::{OrderRequest, PaymentProvider};
use crate::state::AppState;

/// Plans response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PremiumPlansResponse {
    /// Available plans.
    pub plans: &'static [PremiumPlan],
    /// Plan used when none is named.
    pub default_plan_id: &'static str,
    /// Currency charged.
    pub currency: &'static str,
}

/// List premium plans.
pub async fn premium_plans() -> Json<PremiumPlansResponse> {
    Json(PremiumPlansResponse {
        plans: &PREMIUM_PLANS,
        default_plan_id: DEFAULT_PLAN_ID,
        currency: PREMIUM_CURRENCY,
    })
}

fn provider(state: &AppState) -> Result<&dyn PaymentProvider, ApiError> {
    state
        .payments
        .as_deref()
        .ok_or(ApiError::PaymentsNotConfigured)
}

/// Create order request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    /// Plan to buy (default `monthly`).
    pub plan_id: Option<String>,
}

/// Create order response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    /// Provider order ID.
    pub order_id: String,
    /// Amount in minor units.
    pub amount: i64,
    /// Currency code.
    pub currency: String,
    /// Plan ID.
    pub plan_id: &'static str,
    /// Plan name.
    pub plan_name: &'static str,
    /// Price in whole rupees.
    pub price_inr: i64,
    /// Public key for the checkout widget.
    pub key_id: String,
}

/// Create a provider order for a premium plan.
pub async fn create_premium_order(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Json(body): Json<CreateOrderRequest>,
) -> Result<Json<CreateOrderResponse>, ApiError> {
    let plan = find_plan(body.plan_id.as_deref())?;
    let provider = provider(&state)?;
    let user = &current.user;
    let now = Utc::now();

    if user.has_active_premium(now) {
        return Err(ApiError::Validation {
            code: "already_premium",
            message: "Already a premium member".into(),
            details: Some(serde_json::json!({
                "premiumExpiryDate": user.premium_expiry.map(|d| d.to_rfc3339()),
            })),
        });
    }

    let mut notes = BTreeMap::new();
    notes.insert("userId".to_string(), user.user_id.to_string());
    notes.insert("type".to_string(), "premium_subscription".to_string());
    notes.insert("planId".to_string(), plan.id.to_string());
    notes.insert("planMonths".to_string(), plan.months.to_string());

    let request = OrderRequest {
        amount_minor: plan.amount_minor(),
        currency: PREMIUM_CURRENCY.to_string(),
        receipt: PremiumOrder::receipt_for(user.user_id, now),
        notes,
    };

    let order = provider.create_order(&request).await.map_err(|e| {
        tracing::error!(user_id = %user.user_id, plan_id = plan.id, error = %e, "Failed to create premium order");
        ApiError::ExternalService("Failed to create payment order".into())
    })?;

    state.store.put_premium_order(&PremiumOrder {
        order_id: order.id.clone(),
        user_id: user.user_id,
        plan_id: plan.id.to_string(),
        amount_minor: plan.amount_minor(),
        currency: request.currency,
        receipt: request.receipt,
        created_at: now,
    })?;

    tracing::info!(
        user_id = %user.user_id,
        order_id = %order.id,
        plan_id = plan.id,
        amount_minor = plan.amount_minor(),
        "Premium order created"
    );

    Ok(Json(CreateOrderResponse {
        order_id: order.id,
        amount: order.amount_minor,
        currency: order.currency,
        plan_id: plan.id,
        plan_name: plan.name,
        price_inr: plan.price_inr,
        key_id: provider.key_id().to_string(),
    }))
}

/// Verify payment request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    /// Provider order ID.
    pub razorpay_order_id: Option<String>,
    /// Provider payment ID.
    pub razorpay_payment_id: Option<String>,
    /// Checkout signature.
    pub razorpay_signature: Option<String>,
    /// Plan bought (default `monthly`).
    pub plan_id: Option<String>,
}

/// Verify payment response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentResponse {
    /// Whether premium is now active.
    pub is_premium: bool,
    /// When premium ends.
    pub premium_expiry_date: String,
    /// Plan ID.
    pub plan_id: &'static str,
    /// Plan name.
    pub plan_name: &'static str,
    /// Subscription transaction.
    pub transaction_id: String,
}

fn required(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Verify a signed checkout confirmation and grant premium.
pub async fn verify_premium_payment(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    context: RequestContext,
    Json(body): Json<VerifyPaymentRequest>,
) -> Result<Json<VerifyPaymentResponse>, ApiError> {
    let (Some(order_id), Some(payment_id), Some(signature)) = (
        required(body.razorpay_order_id),
        required(body.razorpay_payment_id),
        required(body.razorpay_signature),
    ) else {
        return Err(ApiError::BadRequest("Missing payment details".into()));
    };

    let plan = find_plan(body.plan_id.as_deref())?;
    let provider = provider(&state)?;
    let user = &current.user;

    let attempt = FailedVerification {
        state: &state,
        user,
        client: &context.client,
        plan,
        order_id: &order_id,
        payment_id: &payment_id,
    };

    if !provider.verify_signature(&order_id, &payment_id, &signature) {
        return Err(attempt.reject("Invalid signature"));
    }

    let order_matches = state
        .store
        .get_premium_order(&order_id)?
        .is_some_and(|order| order.matches(user.user_id, plan));
    if !order_matches {
        return Err(attempt.reject("Order does not match this user or plan"));
    }

    let payment = match provider.fetch_payment(&payment_id).await {
        Ok(payment) => payment,
        Err(e) => {
            tracing::error!(payment_id = %payment_id, error = %e, "Payment lookup failed");
            return Err(attempt.reject("Failed to verify payment with payment provider"));
        }
    };

    if payment.order_id.as_deref().is_some_and(|id| id != order_id) {
        return Err(attempt.reject("Payment does not belong to this order"));
    }
    if !payment.is_captured() {
        return Err(attempt.reject(&format!(
            "Payment not successful. Status: {}",
            payment.status
        )));
    }
    if payment.amount_minor != plan.amount_minor() {
        return Err(attempt.reject("Payment amount mismatch"));
    }

    let receipt = state.store.activate_premium(&PremiumActivation {
        user_id: user.user_id,
        plan: *plan,
        order_id: order_id.clone(),
        payment_id: payment_id.clone(),
        amount_minor: payment.amount_minor,
        client: context.client.clone(),
        now: Utc::now(),
    })?;

    let expiry = receipt
        .user
        .premium_expiry
        .ok_or_else(|| ApiError::Internal("premium activated without expiry".into()))?;

    tracing::info!(
        user_id = %user.user_id,
        plan_id = plan.id,
        order_id = %order_id,
        payment_id = %payment_id,
        expires_at = %expiry,
        "Premium activated"
    );

    Ok(Json(VerifyPaymentResponse {
        is_premium: true,
        premium_expiry_date: expiry.to_rfc3339(),
        plan_id: plan.id,
        plan_name: plan.name,
        transaction_id: receipt.transaction.id.to_string(),
    }))
}

/// A verification attempt to audit if it fails.
struct FailedVerification<'a> {
    state: &'a AppState,
    user: &'a User,
    client: &'a ClientInfo,
    plan: &'a PremiumPlan,
    order_id: &'a str,
    payment_id: &'a str,
}

impl FailedVerification<'_> {
    /// Audit the failure and build the error response.
    fn reject(&self, reason: &str) -> ApiError {
        tracing::warn!(
            user_id = %self.user.user_id,
            order_id = %self.order_id,
            payment_id = %self.payment_id,
            reason,
            "Premium payment verification failed"
        );

        let entry = AuditEntry::new(
            AuditEventType::PremiumSubscription,
            self.user.user_id,
            AuditStatus::Failed,
            Utc::now(),
        )
        .with_email(self.user.email.clone())
        .with_client(self.client.ip_address.clone(), self.client.user_agent.clone())
        .with_amount(self.plan.amount_micros())
        .with_failure(reason)
        .with_metadata(serde_json::json!({
            "planId": self.plan.id,
            "orderId": self.order_id,
            "paymentId": self.payment_id,
        }));

        if let Err(e) = self.state.store.append_audit(&entry) {
            tracing::error!(error = %e, "Failed to audit premium verification failure");
        }

        ApiError::PaymentVerification(reason.to_string())
    }
}

/// Premium status response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PremiumStatusResponse {
    /// Whether premium is active now.
    pub is_premium: bool,
    /// When premium ends (or ended).
    pub premium_expiry_date: Option<String>,
    /// Price of the default plan in rupees.
    pub premium_price_inr: i64,
    /// Available plans.
    pub plans: &'static [PremiumPlan],
}

/// The caller's premium status.
pub async fn premium_status(current: CurrentUser) -> Result<Json<PremiumStatusResponse>, ApiError> {
    let user = &current.user;
    Ok(Json(PremiumStatusResponse {
        is_premium: user.has_active_premium(Utc::now()),
        premium_expiry_date: user.premium_expiry.map(|d| d.to_rfc3339()),
        premium_price_inr: default_plan().price_inr,
        plans: &PREMIUM_PLANS,
    }))
}

/// Payment config response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfigResponse {
    /// Public key for the checkout widget.
    pub razorpay_key_id: String,
}

/// Public payment configuration.
pub async fn payment_config(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PaymentConfigResponse>, ApiError> {
    let provider = provider(&state)?;
    Ok(Json(PaymentConfigResponse {
        razorpay_key_id: provider.key_id().to_string(),
    }))
}
