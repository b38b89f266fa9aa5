//! Account management handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use vidpay_core::{micros_to_units, ChannelStats, Role, User};
use vidpay_store::Store;

use super::wallet::MaskedBankDetails;
use crate::auth::{AuthUser, CurrentUser};
use crate::error::ApiError;
use crate::state::AppState;

/// Channel statistics as returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStatsResponse {
    /// Subscriber count.
    pub subscriber_count: u64,
    /// Total watch hours.
    pub total_watch_hours: f64,
    /// Views counted by watch-time tracking.
    pub total_video_views: u64,
    /// Whether the channel passed the gate when monetization was enabled.
    pub meets_monetization_requirements: bool,
    /// When monetization was enabled.
    pub monetization_enabled_date: Option<String>,
}

impl From<&ChannelStats> for ChannelStatsResponse {
    fn from(stats: &ChannelStats) -> Self {
        Self {
            subscriber_count: stats.subscriber_count,
            total_watch_hours: stats.total_watch_hours,
            total_video_views: stats.total_video_views,
            meets_monetization_requirements: stats.meets_monetization_requirements,
            monetization_enabled_date: stats.monetization_enabled_date.map(|d| d.to_rfc3339()),
        }
    }
}

/// Profile response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    /// User ID.
    pub user_id: String,
    /// Display name.
    pub name: Option<String>,
    /// Email.
    pub email: Option<String>,
    /// Role.
    pub role: String,
    /// Withdrawable balance.
    pub wallet_balance: f64,
    /// Lifetime earnings.
    pub total_earnings: f64,
    /// Whether premium is currently active.
    pub is_premium: bool,
    /// When premium ends.
    pub premium_expiry_date: Option<String>,
    /// Whether the user owns a channel.
    pub has_channel: bool,
    /// Channel name.
    pub channel_name: Option<String>,
    /// Channel statistics.
    pub channel_stats: ChannelStatsResponse,
    /// Payout bank account, masked.
    pub bank_details: Option<MaskedBankDetails>,
    /// Created timestamp.
    pub created_at: String,
}

impl From<&User> for ProfileResponse {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.user_id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.to_string(),
            wallet_balance: micros_to_units(user.wallet_balance_micros),
            total_earnings: micros_to_units(user.total_earnings_micros),
            is_premium: user.has_active_premium(Utc::now()),
            premium_expiry_date: user.premium_expiry.map(|d| d.to_rfc3339()),
            has_channel: user.has_channel,
            channel_name: user.channel_name.clone(),
            channel_stats: ChannelStatsResponse::from(&user.channel_stats),
            bank_details: user.bank_details.as_ref().map(MaskedBankDetails::from),
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Create account request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    /// Display name.
    pub name: Option<String>,
    /// Email.
    pub email: Option<String>,
    /// Whether the user owns a channel.
    #[serde(default)]
    pub has_channel: bool,
    /// Channel name.
    pub channel_name: Option<String>,
}

/// Register the caller's monetization profile.
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<CreateAccountRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    // Check if account already exists
    if state.store.get_user(&auth.user_id)?.is_some() {
        return Err(ApiError::Conflict("Account already exists".into()));
    }

    let mut user = User::new(auth.user_id);
    user.name = body.name.filter(|n| !n.trim().is_empty());
    user.email = body.email.filter(|e| !e.trim().is_empty());
    user.has_channel = body.has_channel;
    user.channel_name = body.channel_name.filter(|n| !n.trim().is_empty());
    if state.config.is_bootstrap_admin(&auth.user_id) {
        user.role = Role::Admin;
    }

    state.store.create_user(&user)?;

    tracing::info!(user_id = %auth.user_id, role = %user.role, "Account created");

    Ok(Json(ProfileResponse::from(&user)))
}

/// Get the caller's profile.
pub async fn get_account(current: CurrentUser) -> Result<Json<ProfileResponse>, ApiError> {
    Ok(Json(ProfileResponse::from(&current.user)))
}
