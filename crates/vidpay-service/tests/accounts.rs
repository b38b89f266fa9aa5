//! Account and video registration tests.

mod common;

use common::{token_for, TestHarness};
use serde_json::json;
use vidpay_core::UserId;

// ============================================================================
// Accounts
// ============================================================================

#[tokio::test]
async fn create_account_success() {
    let harness = TestHarness::new();
    let user_id = UserId::generate();

    let response = harness
        .server
        .post("/v1/accounts")
        .add_header("authorization", TestHarness::auth_header(user_id))
        .json(&json!({ "name": "Asha", "email": "asha@example.com" }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["userId"], user_id.to_string());
    assert_eq!(body["role"], "viewer");
    assert_eq!(body["walletBalance"], 0.0);
    assert_eq!(body["isPremium"], false);
}

#[tokio::test]
async fn create_account_twice_conflicts() {
    let harness = TestHarness::new();
    let user_id = harness.register_viewer().await;

    let response = harness
        .server
        .post("/v1/accounts")
        .add_header("authorization", TestHarness::auth_header(user_id))
        .json(&json!({}))
        .await;

    response.assert_status(axum::http::StatusCode::CONFLICT);
}

#[tokio::test]
async fn create_account_without_auth_fails() {
    let harness = TestHarness::new();

    let response = harness.server.post("/v1/accounts").json(&json!({})).await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn bad_token_is_unauthorized() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get("/v1/accounts/me")
        .add_header("authorization", "Bearer not-a-jwt")
        .await;

    response.assert_status_unauthorized();
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn get_account_without_profile_is_not_found() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get("/v1/accounts/me")
        .add_header("authorization", TestHarness::auth_header(UserId::generate()))
        .await;

    response.assert_status_not_found();
}

#[tokio::test]
async fn token_is_accepted_from_cookie() {
    let harness = TestHarness::new();
    let user_id = harness.register_viewer().await;

    let response = harness
        .server
        .get("/v1/accounts/me")
        .add_header("cookie", format!("theme=dark; accessToken={}", token_for(user_id)))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["userId"], user_id.to_string());
}

// ============================================================================
// Videos
// ============================================================================

#[tokio::test]
async fn viewer_cannot_register_video() {
    let harness = TestHarness::new();
    let viewer = harness.register_viewer().await;

    let response = harness
        .server
        .post("/v1/videos")
        .add_header("authorization", TestHarness::auth_header(viewer))
        .json(&json!({ "title": "My clip", "lengthSeconds": 60 }))
        .await;

    response.assert_status_forbidden();
}

#[tokio::test]
async fn channel_owner_registers_and_lists_videos() {
    let harness = TestHarness::new();
    let owner = UserId::generate();
    harness
        .server
        .post("/v1/accounts")
        .add_header("authorization", TestHarness::auth_header(owner))
        .json(&json!({ "hasChannel": true, "channelName": "Owner TV" }))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .post("/v1/videos")
        .add_header("authorization", TestHarness::auth_header(owner))
        .json(&json!({ "title": "Episode 1", "lengthSeconds": 600 }))
        .await;

    response.assert_status_ok();
    let video: serde_json::Value = response.json();
    assert_eq!(video["title"], "Episode 1");
    assert_eq!(video["cpm"], 100);
    // Monetization has not been enabled for this channel yet.
    assert_eq!(video["isMonetized"], false);

    let list: serde_json::Value = harness
        .server
        .get("/v1/videos")
        .add_header("authorization", TestHarness::auth_header(owner))
        .await
        .json();
    assert_eq!(list["videos"].as_array().unwrap().len(), 1);
    assert_eq!(list["videos"][0]["videoId"], video["videoId"]);
}

#[tokio::test]
async fn monetized_creator_videos_start_monetized() {
    let harness = TestHarness::new();
    let creator = harness.seed_creator();

    let response = harness
        .server
        .post("/v1/videos")
        .add_header("authorization", TestHarness::auth_header(creator))
        .json(&json!({ "title": "Monetized", "lengthSeconds": 90 }))
        .await;

    response.assert_status_ok();
    let video: serde_json::Value = response.json();
    assert_eq!(video["isMonetized"], true);
}

#[tokio::test]
async fn blank_title_is_rejected() {
    let harness = TestHarness::new();
    let creator = harness.seed_creator();

    let response = harness
        .server
        .post("/v1/videos")
        .add_header("authorization", TestHarness::auth_header(creator))
        .json(&json!({ "title": "   ", "lengthSeconds": 90 }))
        .await;

    response.assert_status_bad_request();
}
