//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{accounts, admin, ads, creator, health, premium, videos, wallet};
use crate::state::AppState;

// ============================================================================
// Concurrency Limiting Constants
// ============================================================================

/// Maximum concurrent requests for the ad endpoints.
///
/// These are hit on every video play, so they get more headroom than the
/// rest of the API.
const AD_MAX_CONCURRENT_REQUESTS: usize = 200;

/// Maximum concurrent requests for the general API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `GET /v1/monetization/premium-plans` - Premium plans
/// - `GET /v1/monetization/config` - Payment provider public key
///
/// ## Accounts & videos (bearer auth)
/// - `POST /v1/accounts` - Register the caller's profile
/// - `GET /v1/accounts/me` - Get the caller's profile
/// - `POST /v1/videos` - Register a video (creator)
/// - `GET /v1/videos` - List the caller's videos (creator)
///
/// ## Ads (bearer auth)
/// - `POST /v1/monetization/start-view` - Open a view session
/// - `POST /v1/monetization/record-ad-view` - Monetize a completed ad
/// - `POST /v1/monetization/track-watch-time` - Add watch time
///
/// ## Creator (creator guard)
/// - `GET /v1/monetization/dashboard`
/// - `GET /v1/monetization/channel-stats`
/// - `POST /v1/monetization/enable-monetization`
/// - `POST /v1/monetization/update-cpm`
/// - `GET /v1/monetization/video-analytics/:video_id`
///
/// ## Wallet (bearer auth)
/// - `POST /v1/monetization/withdraw`
/// - `GET /v1/monetization/withdrawal-history`
/// - `POST /v1/monetization/update-bank-details`
///
/// ## Premium (bearer auth)
/// - `POST /v1/monetization/create-premium-order`
/// - `POST /v1/monetization/verify-premium-payment`
/// - `GET /v1/monetization/premium-status`
///
/// ## Admin (admin guard)
/// - `GET /v1/monetization/pending-withdrawals`
/// - `POST /v1/monetization/approve-withdrawal`
/// - `GET /v1/monetization/platform-stats`
/// - `GET /v1/monetization/audit-logs`
/// - `GET /v1/monetization/flagged-transactions`
/// - `GET /v1/monetization/all-users`
/// - `POST /v1/monetization/update-user-role`
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    // Build CORS layer
    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let ad_routes = Router::new()
        .route("/start-view", post(ads::start_view))
        .route("/record-ad-view", post(ads::record_ad_view))
        .route("/track-watch-time", post(ads::track_watch_time))
        .layer(ConcurrencyLimitLayer::new(AD_MAX_CONCURRENT_REQUESTS));

    let monetization_routes = Router::new()
        // Creator
        .route("/dashboard", get(creator::dashboard))
        .route("/channel-stats", get(creator::channel_stats))
        .route("/enable-monetization", post(creator::enable_monetization))
        .route("/update-cpm", post(creator::update_cpm))
        .route(
            "/video-analytics/:video_id",
            get(creator::video_analytics),
        )
        // Wallet
        .route("/withdraw", post(wallet::withdraw))
        .route("/withdrawal-history", get(wallet::withdrawal_history))
        .route("/update-bank-details", post(wallet::update_bank_details))
        // Premium
        .route("/premium-plans", get(premium::premium_plans))
        .route("/create-premium-order", post(premium::create_premium_order))
        .route(
            "/verify-premium-payment",
            post(premium::verify_premium_payment),
        )
        .route("/premium-status", get(premium::premium_status))
        .route("/config", get(premium::payment_config))
        // Admin
        .route("/pending-withdrawals", get(admin::pending_withdrawals))
        .route("/approve-withdrawal", post(admin::approve_withdrawal))
        .route("/platform-stats", get(admin::platform_stats))
        .route("/audit-logs", get(admin::audit_logs))
        .route("/flagged-transactions", get(admin::flagged_transactions))
        .route("/all-users", get(admin::all_users))
        .route("/update-user-role", post(admin::update_user_role))
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS))
        // Ad routes (with their own concurrency limit)
        .merge(ad_routes);

    let api_routes = Router::new()
        // Accounts
        .route("/accounts", post(accounts::create_account))
        .route("/accounts/me", get(accounts::get_account))
        // Videos
        .route(
            "/videos",
            post(videos::register_video).get(videos::list_my_videos),
        )
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS))
        .nest("/monetization", monetization_routes);

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        // API v1 routes (rate limited)
        .nest("/v1", api_routes)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
