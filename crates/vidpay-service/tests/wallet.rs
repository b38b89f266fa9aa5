//! Withdrawal and bank detail tests.

mod common;

use axum::http::StatusCode;
use common::{monetized_channel, test_bank_details, TestHarness};
use serde_json::json;
use vidpay_core::{TransactionStatus, UserId, MICROS_PER_UNIT};
use vidpay_store::Store;

const UNIT: i64 = MICROS_PER_UNIT;

async fn withdraw(harness: &TestHarness, user: UserId, amount: f64) -> axum_test::TestResponse {
    harness
        .server
        .post("/v1/monetization/withdraw")
        .add_header("authorization", TestHarness::auth_header(user))
        .json(&json!({ "amount": amount }))
        .await
}

// ============================================================================
// Withdraw
// ============================================================================

#[tokio::test]
async fn withdraw_debits_wallet_and_stays_pending() {
    let harness = TestHarness::new();
    let creator = harness.seed_payable_creator(1500 * UNIT);

    let response = withdraw(&harness, creator, 1000.0).await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "pending");
    assert_eq!(body["amount"], 1000.0);
    assert_eq!(body["remainingBalance"], 500.0);

    assert_eq!(harness.user(creator).wallet_balance_micros, 500 * UNIT);

    let tx_id = body["transactionId"].as_str().unwrap().parse().unwrap();
    let tx = harness.store.get_transaction(&tx_id).unwrap().unwrap();
    assert_eq!(tx.status, TransactionStatus::Pending);
    assert!(tx.withdrawal.is_some());
}

#[tokio::test]
async fn withdraw_below_minimum_is_rejected() {
    let harness = TestHarness::new();
    let creator = harness.seed_payable_creator(1500 * UNIT);

    let response = withdraw(&harness, creator, 999.99).await;

    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "below_minimum_withdrawal");
    assert_eq!(harness.user(creator).wallet_balance_micros, 1500 * UNIT);
}

#[tokio::test]
async fn withdraw_more_than_balance_conflicts() {
    let harness = TestHarness::new();
    let creator = harness.seed_payable_creator(1200 * UNIT);

    let response = withdraw(&harness, creator, 1500.0).await;

    response.assert_status(StatusCode::CONFLICT);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "insufficient_balance");
    assert_eq!(body["error"]["details"]["balance"], 1200.0);
}

#[tokio::test]
async fn withdraw_without_bank_details_is_rejected() {
    let harness = TestHarness::new();
    let creator = harness.seed_user(|u| {
        monetized_channel(u);
        u.wallet_balance_micros = 2000 * UNIT;
    });

    let response = withdraw(&harness, creator, 1000.0).await;

    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "missing_bank_details");
}

#[tokio::test]
async fn withdraw_non_positive_amount_is_rejected() {
    let harness = TestHarness::new();
    let creator = harness.seed_payable_creator(1500 * UNIT);

    withdraw(&harness, creator, 0.0)
        .await
        .assert_status_bad_request();
    withdraw(&harness, creator, -5.0)
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn withdraw_with_reused_idempotency_key_debits_once() {
    let harness = TestHarness::new();
    let creator = harness.seed_payable_creator(3000 * UNIT);

    let send = || {
        harness
            .server
            .post("/v1/monetization/withdraw")
            .add_header("authorization", TestHarness::auth_header(creator))
            .add_header("idempotency-key", "payout-1")
            .json(&json!({ "amount": 1000.0 }))
    };

    send().await.assert_status_ok();
    send().await.assert_status(StatusCode::CONFLICT);

    assert_eq!(harness.user(creator).wallet_balance_micros, 2000 * UNIT);
}

#[tokio::test]
async fn viewer_cannot_use_wallet_routes() {
    let harness = TestHarness::new();
    let viewer = harness.seed_user(|u| {
        u.wallet_balance_micros = 2000 * UNIT;
        u.bank_details = Some(test_bank_details());
    });

    withdraw(&harness, viewer, 1000.0)
        .await
        .assert_status_forbidden();
    harness
        .server
        .get("/v1/monetization/withdrawal-history")
        .add_header("authorization", TestHarness::auth_header(viewer))
        .await
        .assert_status_forbidden();
    harness
        .server
        .post("/v1/monetization/update-bank-details")
        .add_header("authorization", TestHarness::auth_header(viewer))
        .json(&json!({
            "accountNumber": "000111222333",
            "accountHolderName": "Asha Rao",
            "ifscCode": "SBIN0005678",
            "bankName": "State Bank"
        }))
        .await
        .assert_status_forbidden();

    assert_eq!(harness.user(viewer).wallet_balance_micros, 2000 * UNIT);
}

#[tokio::test]
async fn rejected_withdrawals_are_audited() {
    let harness = TestHarness::new();
    let admin = harness.seed_admin();
    let creator = harness.seed_payable_creator(1200 * UNIT);

    withdraw(&harness, creator, 500.0)
        .await
        .assert_status_bad_request();
    withdraw(&harness, creator, 1500.0)
        .await
        .assert_status(StatusCode::CONFLICT);

    let body: serde_json::Value = harness
        .server
        .get("/v1/monetization/audit-logs")
        .add_query_param("eventType", "withdrawal")
        .add_query_param("status", "failed")
        .add_header("authorization", TestHarness::auth_header(admin))
        .await
        .json();

    assert_eq!(body["pagination"]["total"], 2);
    let logs = body["logs"].as_array().unwrap();
    assert!(logs.iter().all(|log| log["userId"] == creator.to_string()));
    assert!(logs.iter().any(|log| log["amount"] == 500.0));
    assert!(logs
        .iter()
        .any(|log| log["failureReason"].as_str().unwrap().contains("insufficient balance")));

    // Nothing was debited.
    assert_eq!(harness.user(creator).wallet_balance_micros, 1200 * UNIT);
}

// ============================================================================
// History
// ============================================================================

#[tokio::test]
async fn withdrawal_history_pages_newest_first() {
    let harness = TestHarness::new();
    let creator = harness.seed_payable_creator(5000 * UNIT);

    withdraw(&harness, creator, 1000.0).await.assert_status_ok();
    // IDs order by millisecond.
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    withdraw(&harness, creator, 2000.0).await.assert_status_ok();

    let response = harness
        .server
        .get("/v1/monetization/withdrawal-history")
        .add_query_param("limit", 1)
        .add_header("authorization", TestHarness::auth_header(creator))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["hasMore"], true);
    let withdrawals = body["withdrawals"].as_array().unwrap();
    assert_eq!(withdrawals.len(), 1);
    assert_eq!(withdrawals[0]["amount"], 2000.0);
    assert_eq!(withdrawals[0]["bankDetails"]["accountNumber"], "********9012");

    let page_two: serde_json::Value = harness
        .server
        .get("/v1/monetization/withdrawal-history")
        .add_query_param("limit", 1)
        .add_query_param("page", 2)
        .add_header("authorization", TestHarness::auth_header(creator))
        .await
        .json();
    assert_eq!(page_two["hasMore"], false);
    assert_eq!(page_two["withdrawals"][0]["amount"], 1000.0);
}

#[tokio::test]
async fn withdrawal_history_tolerates_huge_page() {
    let harness = TestHarness::new();
    let creator = harness.seed_payable_creator(5000 * UNIT);
    withdraw(&harness, creator, 1000.0).await.assert_status_ok();

    let response = harness
        .server
        .get("/v1/monetization/withdrawal-history")
        .add_query_param("page", usize::MAX)
        .add_header("authorization", TestHarness::auth_header(creator))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert!(body["withdrawals"].as_array().unwrap().is_empty());
    assert_eq!(body["hasMore"], false);
}

#[tokio::test]
async fn withdrawal_history_is_private() {
    let harness = TestHarness::new();
    let creator = harness.seed_payable_creator(5000 * UNIT);
    withdraw(&harness, creator, 1000.0).await.assert_status_ok();

    let other = harness.seed_creator();
    let body: serde_json::Value = harness
        .server
        .get("/v1/monetization/withdrawal-history")
        .add_header("authorization", TestHarness::auth_header(other))
        .await
        .json();

    assert!(body["withdrawals"].as_array().unwrap().is_empty());
}

// ============================================================================
// Bank details
// ============================================================================

#[tokio::test]
async fn update_bank_details_masks_account_number() {
    let harness = TestHarness::new();
    let creator = harness.seed_creator();

    let response = harness
        .server
        .post("/v1/monetization/update-bank-details")
        .add_header("authorization", TestHarness::auth_header(creator))
        .json(&json!({
            "accountNumber": "000111222333",
            "accountHolderName": "Asha Rao",
            "ifscCode": "SBIN0005678",
            "bankName": "State Bank"
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["bankDetails"]["accountNumber"], "********2333");
    assert_eq!(body["bankDetails"]["ifscCode"], "SBIN0005678");

    let stored = harness.user(creator).bank_details.unwrap();
    assert_eq!(stored.account_number, "000111222333");
}

#[tokio::test]
async fn update_bank_details_rejects_bad_ifsc() {
    let harness = TestHarness::new();
    let creator = harness.seed_creator();

    let response = harness
        .server
        .post("/v1/monetization/update-bank-details")
        .add_header("authorization", TestHarness::auth_header(creator))
        .json(&json!({
            "accountNumber": "000111222333",
            "accountHolderName": "Asha Rao",
            "ifscCode": "sbin5678",
            "bankName": "State Bank"
        }))
        .await;

    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "invalid_bank_details");
}

#[tokio::test]
async fn update_bank_details_requires_every_field() {
    let harness = TestHarness::new();
    let creator = harness.seed_creator();

    let response = harness
        .server
        .post("/v1/monetization/update-bank-details")
        .add_header("authorization", TestHarness::auth_header(creator))
        .json(&json!({ "accountNumber": "000111222333" }))
        .await;

    response.assert_status_bad_request();
}
