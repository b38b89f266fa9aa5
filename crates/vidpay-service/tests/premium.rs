//! Premium plan, order and payment verification tests.

mod common;

use axum::http::StatusCode;
use common::{FakePaymentProvider, TestHarness};
use serde_json::json;
use vidpay_core::{AuditEventType, AuditFilter, AuditStatus, UserId};
use vidpay_store::Store;

async fn create_order(harness: &TestHarness, user: UserId, plan: &str) -> serde_json::Value {
    let response = harness
        .server
        .post("/v1/monetization/create-premium-order")
        .add_header("authorization", TestHarness::auth_header(user))
        .json(&json!({ "planId": plan }))
        .await;
    response.assert_status_ok();
    response.json()
}

fn fake(harness: &TestHarness) -> &FakePaymentProvider {
    harness.payments.as_deref().expect("payments enabled")
}

async fn verify(
    harness: &TestHarness,
    user: UserId,
    order_id: &str,
    payment_id: &str,
    signature: &str,
    plan: &str,
) -> axum_test::TestResponse {
    harness
        .server
        .post("/v1/monetization/verify-premium-payment")
        .add_header("authorization", TestHarness::auth_header(user))
        .json(&json!({
            "razorpayOrderId": order_id,
            "razorpayPaymentId": payment_id,
            "razorpaySignature": signature,
            "planId": plan,
        }))
        .await
}

// ============================================================================
// Plans and config
// ============================================================================

#[tokio::test]
async fn premium_plans_are_public() {
    let harness = TestHarness::new();

    let response = harness.server.get("/v1/monetization/premium-plans").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let plans = body["plans"].as_array().unwrap();
    assert_eq!(plans.len(), 3);
    assert_eq!(plans[1]["id"], "quarterly");
    assert_eq!(plans[1]["priceInr"], 499);
    assert_eq!(plans[1]["recommended"], true);
    assert_eq!(body["defaultPlanId"], "monthly");
    assert_eq!(body["currency"], "INR");
}

#[tokio::test]
async fn config_without_provider_is_unavailable() {
    let harness = TestHarness::new();

    let response = harness.server.get("/v1/monetization/config").await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "payments_not_configured");
}

#[tokio::test]
async fn config_exposes_public_key() {
    let harness = TestHarness::with_payments();

    let body: serde_json::Value = harness.server.get("/v1/monetization/config").await.json();

    assert_eq!(body["razorpayKeyId"], "rzp_test_fake");
}

// ============================================================================
// Orders
// ============================================================================

#[tokio::test]
async fn create_order_without_provider_is_unavailable() {
    let harness = TestHarness::new();
    let user = harness.register_viewer().await;

    let response = harness
        .server
        .post("/v1/monetization/create-premium-order")
        .add_header("authorization", TestHarness::auth_header(user))
        .json(&json!({}))
        .await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn create_order_defaults_to_monthly() {
    let harness = TestHarness::with_payments();
    let user = harness.register_viewer().await;

    let response = harness
        .server
        .post("/v1/monetization/create-premium-order")
        .add_header("authorization", TestHarness::auth_header(user))
        .json(&json!({}))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["orderId"], "order_1");
    assert_eq!(body["amount"], 19900);
    assert_eq!(body["currency"], "INR");
    assert_eq!(body["planId"], "monthly");
    assert_eq!(body["keyId"], "rzp_test_fake");

    let orders = fake(&harness).orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].notes["userId"], user.to_string());
    assert_eq!(orders[0].notes["planMonths"], "1");

    let stored = harness.store.get_premium_order("order_1").unwrap().unwrap();
    assert_eq!(stored.user_id, user);
    assert_eq!(stored.amount_minor, 19900);
}

#[tokio::test]
async fn create_order_rejects_unknown_plan() {
    let harness = TestHarness::with_payments();
    let user = harness.register_viewer().await;

    let response = harness
        .server
        .post("/v1/monetization/create-premium-order")
        .add_header("authorization", TestHarness::auth_header(user))
        .json(&json!({ "planId": "lifetime" }))
        .await;

    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "invalid_plan");
}

// ============================================================================
// Verification
// ============================================================================

#[tokio::test]
async fn verified_payment_grants_premium() {
    let harness = TestHarness::with_payments();
    let user = harness.register_viewer().await;
    let order = create_order(&harness, user, "quarterly").await;
    let order_id = order["orderId"].as_str().unwrap();

    fake(&harness).add_payment("pay_1", order_id, 49_900, "captured");
    let signature = FakePaymentProvider::sign(order_id, "pay_1");

    let response = verify(&harness, user, order_id, "pay_1", &signature, "quarterly").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["isPremium"], true);
    assert_eq!(body["planId"], "quarterly");

    let stored = harness.user(user);
    let expiry = stored.premium_expiry.unwrap();
    assert!(expiry > chrono::Utc::now() + chrono::Duration::days(85));
    assert!(expiry < chrono::Utc::now() + chrono::Duration::days(95));

    let status: serde_json::Value = harness
        .server
        .get("/v1/monetization/premium-status")
        .add_header("authorization", TestHarness::auth_header(user))
        .await
        .json();
    assert_eq!(status["isPremium"], true);
    assert_eq!(status["premiumPriceInr"], 199);

    let tx_id = body["transactionId"].as_str().unwrap().parse().unwrap();
    let tx = harness.store.get_transaction(&tx_id).unwrap().unwrap();
    assert_eq!(tx.amount_micros, 499_000_000);
}

#[tokio::test]
async fn premium_member_cannot_order_again() {
    let harness = TestHarness::with_payments();
    let user = harness.seed_user(|u| {
        u.is_premium = true;
        u.premium_expiry = Some(chrono::Utc::now() + chrono::Duration::days(10));
    });

    let response = harness
        .server
        .post("/v1/monetization/create-premium-order")
        .add_header("authorization", TestHarness::auth_header(user))
        .json(&json!({ "planId": "monthly" }))
        .await;

    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "already_premium");
    assert!(fake(&harness).orders().is_empty());
}

#[tokio::test]
async fn reused_payment_is_rejected() {
    let harness = TestHarness::with_payments();
    let user = harness.register_viewer().await;
    let order = create_order(&harness, user, "monthly").await;
    let order_id = order["orderId"].as_str().unwrap();
    fake(&harness).add_payment("pay_1", order_id, 19_900, "captured");
    let signature = FakePaymentProvider::sign(order_id, "pay_1");

    verify(&harness, user, order_id, "pay_1", &signature, "monthly")
        .await
        .assert_status_ok();
    let response = verify(&harness, user, order_id, "pay_1", &signature, "monthly").await;

    response.assert_status(StatusCode::CONFLICT);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "duplicate_request");
}

#[tokio::test]
async fn invalid_signature_is_rejected_and_audited() {
    let harness = TestHarness::with_payments();
    let user = harness.register_viewer().await;
    let order = create_order(&harness, user, "monthly").await;
    let order_id = order["orderId"].as_str().unwrap();
    fake(&harness).add_payment("pay_1", order_id, 19_900, "captured");

    let response = verify(&harness, user, order_id, "pay_1", "deadbeef", "monthly").await;

    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "payment_verification_failed");
    assert_eq!(body["error"]["message"], "Invalid signature");
    assert!(!harness.user(user).is_premium);

    let filter = AuditFilter {
        event_type: Some(AuditEventType::PremiumSubscription),
        status: Some(AuditStatus::Failed),
        ..AuditFilter::default()
    };
    let (entries, total) = harness.store.list_audit(&filter, 10, 0).unwrap();
    assert_eq!(total, 1);
    assert_eq!(entries[0].failure_reason.as_deref(), Some("Invalid signature"));
}

#[tokio::test]
async fn provider_outage_fails_closed() {
    let harness = TestHarness::with_payments();
    let user = harness.register_viewer().await;
    let order = create_order(&harness, user, "monthly").await;
    let order_id = order["orderId"].as_str().unwrap();
    fake(&harness).add_payment("pay_1", order_id, 19_900, "captured");
    let signature = FakePaymentProvider::sign(order_id, "pay_1");
    fake(&harness).go_offline();

    let response = verify(&harness, user, order_id, "pay_1", &signature, "monthly").await;

    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "payment_verification_failed");
    assert!(!harness.user(user).is_premium);

    let filter = AuditFilter {
        event_type: Some(AuditEventType::PremiumSubscription),
        status: Some(AuditStatus::Failed),
        ..AuditFilter::default()
    };
    let (entries, total) = harness.store.list_audit(&filter, 10, 0).unwrap();
    assert_eq!(total, 1);
    assert_eq!(entries[0].user_id, user);
}

#[tokio::test]
async fn uncaptured_payment_is_rejected() {
    let harness = TestHarness::with_payments();
    let user = harness.register_viewer().await;
    let order = create_order(&harness, user, "monthly").await;
    let order_id = order["orderId"].as_str().unwrap();
    fake(&harness).add_payment("pay_1", order_id, 19_900, "authorized");
    let signature = FakePaymentProvider::sign(order_id, "pay_1");

    let response = verify(&harness, user, order_id, "pay_1", &signature, "monthly").await;

    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert_eq!(
        body["error"]["message"],
        "Payment not successful. Status: authorized"
    );
}

#[tokio::test]
async fn underpaid_payment_is_rejected() {
    let harness = TestHarness::with_payments();
    let user = harness.register_viewer().await;
    let order = create_order(&harness, user, "yearly").await;
    let order_id = order["orderId"].as_str().unwrap();
    fake(&harness).add_payment("pay_1", order_id, 19_900, "captured");
    let signature = FakePaymentProvider::sign(order_id, "pay_1");

    let response = verify(&harness, user, order_id, "pay_1", &signature, "yearly").await;

    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["message"], "Payment amount mismatch");
}

#[tokio::test]
async fn plan_switch_after_ordering_is_rejected() {
    let harness = TestHarness::with_payments();
    let user = harness.register_viewer().await;
    let order = create_order(&harness, user, "monthly").await;
    let order_id = order["orderId"].as_str().unwrap();
    fake(&harness).add_payment("pay_1", order_id, 19_900, "captured");
    let signature = FakePaymentProvider::sign(order_id, "pay_1");

    let response = verify(&harness, user, order_id, "pay_1", &signature, "yearly").await;

    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert_eq!(
        body["error"]["message"],
        "Order does not match this user or plan"
    );
}

#[tokio::test]
async fn another_users_order_is_rejected() {
    let harness = TestHarness::with_payments();
    let buyer = harness.register_viewer().await;
    let order = create_order(&harness, buyer, "monthly").await;
    let order_id = order["orderId"].as_str().unwrap();
    fake(&harness).add_payment("pay_1", order_id, 19_900, "captured");
    let signature = FakePaymentProvider::sign(order_id, "pay_1");

    let other = harness.register_viewer().await;
    let response = verify(&harness, other, order_id, "pay_1", &signature, "monthly").await;

    response.assert_status_bad_request();
    assert!(!harness.user(other).is_premium);
}

#[tokio::test]
async fn missing_payment_fields_are_rejected() {
    let harness = TestHarness::with_payments();
    let user = harness.register_viewer().await;

    let response = harness
        .server
        .post("/v1/monetization/verify-premium-payment")
        .add_header("authorization", TestHarness::auth_header(user))
        .json(&json!({ "razorpayOrderId": "order_1" }))
        .await;

    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["message"], "Missing payment details");
}
