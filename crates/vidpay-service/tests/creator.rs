//! Creator dashboard, channel and CPM tests.

mod common;

use axum::http::StatusCode;
use common::TestHarness;
use serde_json::json;
use vidpay_core::{Role, UserId};
use vidpay_store::Store;

async fn view_ad(harness: &TestHarness, video_id: &str) {
    let viewer = harness.register_viewer().await;
    harness
        .server
        .post("/v1/monetization/record-ad-view")
        .add_header("authorization", TestHarness::auth_header(viewer))
        .json(&json!({ "videoId": video_id, "adCompleted": true }))
        .await
        .assert_status_ok();
}

/// A channel owner that qualifies for monetization but has not enabled it.
fn seed_qualified_channel(harness: &TestHarness) -> UserId {
    harness.seed_user(|u| {
        u.has_channel = true;
        u.channel_stats.subscriber_count = 1000;
        u.channel_stats.total_watch_hours = 4000.0;
    })
}

// ============================================================================
// Dashboard
// ============================================================================

#[tokio::test]
async fn dashboard_summarizes_earnings() {
    let harness = TestHarness::new();
    let creator = harness.seed_creator();
    let video = harness.seed_video(creator, true);
    harness.seed_video(creator, true);
    view_ad(&harness, &video.video_id.to_string()).await;

    let response = harness
        .server
        .get("/v1/monetization/dashboard")
        .add_header("authorization", TestHarness::auth_header(creator))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["walletBalance"], 0.055);
    assert_eq!(body["totalEarnings"], 0.055);
    assert_eq!(body["totalViews"], 1);
    assert_eq!(body["totalRevenue"], 0.1);
    assert_eq!(body["videoCount"], 2);
    assert_eq!(body["monetizationEnabled"], true);
    assert_eq!(body["topVideos"][0]["videoId"], video.video_id.to_string());

    let months = body["monthlyEarnings"].as_array().unwrap();
    assert_eq!(months.len(), 6);
    assert_eq!(months[5]["earnings"], 0.055);
    assert_eq!(
        months[5]["month"],
        chrono::Utc::now().format("%Y-%m").to_string()
    );
}

#[tokio::test]
async fn viewer_cannot_open_dashboard() {
    let harness = TestHarness::new();
    let viewer = harness.register_viewer().await;

    harness
        .server
        .get("/v1/monetization/dashboard")
        .add_header("authorization", TestHarness::auth_header(viewer))
        .await
        .assert_status_forbidden();
}

// ============================================================================
// Channel stats and monetization
// ============================================================================

#[tokio::test]
async fn channel_stats_report_progress() {
    let harness = TestHarness::new();
    let owner = harness.seed_user(|u| {
        u.has_channel = true;
        u.channel_stats.subscriber_count = 250;
        u.channel_stats.total_watch_hours = 6000.0;
    });

    let response = harness
        .server
        .get("/v1/monetization/channel-stats")
        .add_header("authorization", TestHarness::auth_header(owner))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["meetsRequirements"], false);
    assert_eq!(body["monetizationEnabled"], false);
    assert_eq!(body["requirements"]["subscribers"], 1000);
    assert_eq!(body["progress"]["subscribers"], 25.0);
    assert_eq!(body["progress"]["watchHours"], 100.0);
}

#[tokio::test]
async fn enabling_below_threshold_is_rejected() {
    let harness = TestHarness::new();
    let owner = harness.seed_user(|u| {
        u.has_channel = true;
        u.channel_stats.subscriber_count = 999;
        u.channel_stats.total_watch_hours = 4000.0;
    });

    let response = harness
        .server
        .post("/v1/monetization/enable-monetization")
        .add_header("authorization", TestHarness::auth_header(owner))
        .json(&json!({ "enable": true }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "requirements_not_met");
    assert_eq!(body["error"]["details"]["currentSubscribers"], 999);
}

#[tokio::test]
async fn enabling_monetizes_existing_videos() {
    let harness = TestHarness::new();
    let owner = seed_qualified_channel(&harness);
    let video = harness.seed_video(owner, false);

    let response = harness
        .server
        .post("/v1/monetization/enable-monetization")
        .add_header("authorization", TestHarness::auth_header(owner))
        .json(&json!({ "enable": true }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["monetizationEnabled"], true);
    assert_eq!(body["videosUpdated"], 1);
    assert_eq!(body["role"], "creator");
    assert_eq!(body["meetsRequirements"], true);

    assert_eq!(harness.user(owner).role, Role::Creator);
    let video = harness.store.get_video(&video.video_id).unwrap().unwrap();
    assert!(video.is_monetized);
}

#[tokio::test]
async fn disabling_stops_ad_revenue() {
    let harness = TestHarness::new();
    let creator = harness.seed_creator();
    let video = harness.seed_video(creator, true);

    let response = harness
        .server
        .post("/v1/monetization/enable-monetization")
        .add_header("authorization", TestHarness::auth_header(creator))
        .json(&json!({ "enable": false }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["monetizationEnabled"], false);

    let viewer = harness.register_viewer().await;
    let start: serde_json::Value = harness
        .server
        .post("/v1/monetization/start-view")
        .add_header("authorization", TestHarness::auth_header(viewer))
        .json(&json!({ "videoId": video.video_id.to_string() }))
        .await
        .json();
    assert_eq!(start["shouldShowAd"], false);
    assert_eq!(start["reason"], "not_monetized");
}

// ============================================================================
// CPM
// ============================================================================

#[tokio::test]
async fn update_cpm_changes_revenue_per_view() {
    let harness = TestHarness::new();
    let creator = harness.seed_creator();
    let video = harness.seed_video(creator, true);

    let response = harness
        .server
        .post("/v1/monetization/update-cpm")
        .add_header("authorization", TestHarness::auth_header(creator))
        .json(&json!({ "videoId": video.video_id.to_string(), "cpm": 250 }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["newCpm"], 250);
    assert_eq!(body["revenuePerView"], 0.25);

    let viewer = harness.register_viewer().await;
    let recorded: serde_json::Value = harness
        .server
        .post("/v1/monetization/record-ad-view")
        .add_header("authorization", TestHarness::auth_header(viewer))
        .json(&json!({ "videoId": video.video_id.to_string(), "adCompleted": true }))
        .await
        .json();
    assert_eq!(recorded["totalRevenue"], 0.25);
    assert_eq!(harness.user(creator).wallet_balance_micros, 137_500);
}

#[tokio::test]
async fn update_cpm_out_of_range_is_rejected() {
    let harness = TestHarness::new();
    let creator = harness.seed_creator();
    let video = harness.seed_video(creator, true);

    let response = harness
        .server
        .post("/v1/monetization/update-cpm")
        .add_header("authorization", TestHarness::auth_header(creator))
        .json(&json!({ "videoId": video.video_id.to_string(), "cpm": 5 }))
        .await;

    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "invalid_cpm");
}

#[tokio::test]
async fn update_cpm_on_foreign_video_is_not_found() {
    let harness = TestHarness::new();
    let owner = harness.seed_creator();
    let video = harness.seed_video(owner, true);
    let other = harness.seed_creator();

    let response = harness
        .server
        .post("/v1/monetization/update-cpm")
        .add_header("authorization", TestHarness::auth_header(other))
        .json(&json!({ "videoId": video.video_id.to_string(), "cpm": 500 }))
        .await;

    response.assert_status_not_found();
    let unchanged = harness.store.get_video(&video.video_id).unwrap().unwrap();
    assert_eq!(unchanged.cpm, 100);
}

// ============================================================================
// Analytics
// ============================================================================

#[tokio::test]
async fn video_analytics_reports_daily_views() {
    let harness = TestHarness::new();
    let creator = harness.seed_creator();
    let video = harness.seed_video(creator, true);
    let video_id = video.video_id.to_string();
    view_ad(&harness, &video_id).await;
    view_ad(&harness, &video_id).await;

    let response = harness
        .server
        .get(&format!("/v1/monetization/video-analytics/{video_id}"))
        .add_header("authorization", TestHarness::auth_header(creator))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["videoId"], video_id);
    assert_eq!(body["totalViews"], 2);

    let days = body["dailyStats"].as_array().unwrap();
    assert_eq!(days.len(), 1);
    assert_eq!(
        days[0]["date"],
        chrono::Utc::now().format("%Y-%m-%d").to_string()
    );
    assert_eq!(days[0]["adViews"], 2);
    assert_eq!(days[0]["revenue"], 0.11);
    assert_eq!(body["recentAdViews"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn video_analytics_hides_other_creators_videos() {
    let harness = TestHarness::new();
    let owner = harness.seed_creator();
    let video = harness.seed_video(owner, true);
    let other = harness.seed_creator();

    let response = harness
        .server
        .get(&format!(
            "/v1/monetization/video-analytics/{}",
            video.video_id
        ))
        .add_header("authorization", TestHarness::auth_header(other))
        .await;

    response.assert_status_not_found();
}
