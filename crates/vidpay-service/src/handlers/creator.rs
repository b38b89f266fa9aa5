//! Creator handlers: dashboard, channel stats, monetization and CPM.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use vidpay_core::{
    micros_to_units, revenue_per_view_micros, AdView, Transaction, TransactionStatus,
    TransactionType, User, MIN_SUBSCRIBERS, MIN_WATCH_HOURS,
};
use vidpay_store::Store;

use super::accounts::ChannelStatsResponse;
use super::parse_video_id;
use super::videos::VideoResponse;
use crate::auth::CreatorUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Videos listed on the dashboard.
const TOP_VIDEOS: usize = 10;

/// Months in the earnings series.
const EARNINGS_MONTHS: usize = 6;

/// Days covered by video analytics.
const ANALYTICS_DAYS: i64 = 30;

/// Ad views listed in video analytics.
const RECENT_AD_VIEWS: usize = 10;

/// Completed earnings for one calendar month.
#[derive(Debug, Serialize)]
pub struct MonthlyEarnings {
    /// Month as `YYYY-MM`.
    pub month: String,
    /// Earnings in currency units.
    pub earnings: f64,
}

/// Dashboard response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    /// Withdrawable balance.
    pub wallet_balance: f64,
    /// Lifetime earnings.
    pub total_earnings: f64,
    /// Monetized ad views across the caller's videos.
    pub total_views: u64,
    /// Gross ad revenue across the caller's videos.
    pub total_revenue: f64,
    /// Number of videos.
    pub video_count: usize,
    /// Whether monetization is on.
    pub monetization_enabled: bool,
    /// Highest-earning videos.
    pub top_videos: Vec<VideoResponse>,
    /// Completed earnings, oldest month first; the last entry is the
    /// current month.
    pub monthly_earnings: Vec<MonthlyEarnings>,
}

/// Creator dashboard.
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    creator: CreatorUser,
) -> Result<Json<DashboardResponse>, ApiError> {
    let user = &creator.user;
    let mut videos = state.store.list_videos_by_creator(&user.user_id)?;

    let total_views = videos.iter().map(vidpay_core::Video::total_views).sum();
    let total_revenue_micros: i64 = videos
        .iter()
        .map(vidpay_core::Video::total_revenue_micros)
        .sum();
    let video_count = videos.len();

    videos.sort_by_key(|v| std::cmp::Reverse(v.total_revenue_micros()));
    let top_videos = videos
        .iter()
        .take(TOP_VIDEOS)
        .map(VideoResponse::from)
        .collect();

    let earnings = state.store.list_transactions_by_user(
        &user.user_id,
        Some(TransactionType::Earning),
        usize::MAX,
        0,
    )?;

    Ok(Json(DashboardResponse {
        wallet_balance: micros_to_units(user.wallet_balance_micros),
        total_earnings: micros_to_units(user.total_earnings_micros),
        total_views,
        total_revenue: micros_to_units(total_revenue_micros),
        video_count,
        monetization_enabled: user.monetization_enabled(),
        top_videos,
        monthly_earnings: monthly_earnings(&earnings, Utc::now()),
    }))
}

/// Months elapsed between `earlier` and `now` by calendar month.
fn months_between(earlier: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let index = |d: DateTime<Utc>| i64::from(d.year()) * 12 + i64::from(d.month0());
    index(now) - index(earlier)
}

/// Bucket completed earnings into the last six calendar months.
fn monthly_earnings(transactions: &[Transaction], now: DateTime<Utc>) -> Vec<MonthlyEarnings> {
    let mut totals = [0i64; EARNINGS_MONTHS];
    let last = EARNINGS_MONTHS as i64 - 1;

    for tx in transactions {
        if tx.transaction_type != TransactionType::Earning
            || tx.status != TransactionStatus::Completed
        {
            continue;
        }
        let age = months_between(tx.created_at, now);
        if (0..=last).contains(&age) {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let slot = (last - age) as usize;
            totals[slot] += tx.amount_micros;
        }
    }

    let current = i64::from(now.year()) * 12 + i64::from(now.month0());
    totals
        .iter()
        .enumerate()
        .map(|(slot, micros)| {
            #[allow(clippy::cast_possible_wrap)]
            let index = current - last + slot as i64;
            MonthlyEarnings {
                month: format!("{:04}-{:02}", index.div_euclid(12), index.rem_euclid(12) + 1),
                earnings: micros_to_units(*micros),
            }
        })
        .collect()
}

/// Monetization thresholds.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirements {
    /// Subscribers required.
    pub subscribers: u64,
    /// Watch hours required.
    pub watch_hours: f64,
}

impl Requirements {
    fn current() -> Self {
        Self {
            subscribers: MIN_SUBSCRIBERS,
            watch_hours: MIN_WATCH_HOURS,
        }
    }
}

/// Progress toward the thresholds, in percent.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    /// Subscriber progress (0-100).
    pub subscribers: f64,
    /// Watch hour progress (0-100).
    pub watch_hours: f64,
}

/// Channel stats response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStatsOverview {
    /// Channel statistics.
    pub channel_stats: ChannelStatsResponse,
    /// Whether the channel currently passes the gate.
    pub meets_requirements: bool,
    /// Whether monetization is on.
    pub monetization_enabled: bool,
    /// Thresholds.
    pub requirements: Requirements,
    /// Progress toward the thresholds.
    pub progress: Progress,
}

fn percent(current: f64, required: f64) -> f64 {
    (current / required * 100.0).min(100.0)
}

fn channel_overview(user: &User) -> ChannelStatsOverview {
    let mut channel_stats = ChannelStatsResponse::from(&user.channel_stats);
    channel_stats.total_watch_hours = (channel_stats.total_watch_hours * 10.0).round() / 10.0;

    ChannelStatsOverview {
        meets_requirements: user.meets_monetization_requirements(),
        monetization_enabled: user.monetization_enabled(),
        requirements: Requirements::current(),
        progress: Progress {
            subscribers: percent(
                user.channel_stats.subscriber_count as f64,
                MIN_SUBSCRIBERS as f64,
            ),
            watch_hours: percent(user.channel_stats.total_watch_hours, MIN_WATCH_HOURS),
        },
        channel_stats,
    }
}

/// Channel statistics and monetization progress.
pub async fn channel_stats(creator: CreatorUser) -> Result<Json<ChannelStatsOverview>, ApiError> {
    Ok(Json(channel_overview(&creator.user)))
}

/// Enable monetization request.
#[derive(Debug, Deserialize)]
pub struct EnableMonetizationRequest {
    /// Switch on (true) or off (false).
    pub enable: bool,
}

/// Enable monetization response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnableMonetizationResponse {
    /// Whether monetization is now on.
    pub monetization_enabled: bool,
    /// Videos whose monetized flag changed.
    pub videos_updated: usize,
    /// Role after the change.
    pub role: String,
    /// Channel stats and thresholds.
    #[serde(flatten)]
    pub overview: ChannelStatsOverview,
}

/// Switch monetization on or off for the caller's channel.
pub async fn enable_monetization(
    State(state): State<Arc<AppState>>,
    creator: CreatorUser,
    Json(body): Json<EnableMonetizationRequest>,
) -> Result<Json<EnableMonetizationResponse>, ApiError> {
    let (user, videos_updated) =
        state
            .store
            .set_monetization(&creator.user.user_id, body.enable, Utc::now())?;

    Ok(Json(EnableMonetizationResponse {
        monetization_enabled: user.monetization_enabled(),
        videos_updated,
        role: user.role.to_string(),
        overview: channel_overview(&user),
    }))
}

/// Update CPM request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCpmRequest {
    /// Video to update.
    pub video_id: String,
    /// New CPM in currency units.
    pub cpm: i64,
}

/// Update CPM response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCpmResponse {
    /// Video updated.
    pub video_id: String,
    /// CPM now in effect.
    pub new_cpm: i64,
    /// Revenue per monetized view at the new CPM.
    pub revenue_per_view: f64,
}

/// Set the CPM of one of the caller's videos.
pub async fn update_cpm(
    State(state): State<Arc<AppState>>,
    creator: CreatorUser,
    Json(body): Json<UpdateCpmRequest>,
) -> Result<Json<UpdateCpmResponse>, ApiError> {
    let video_id = parse_video_id(&body.video_id)?;
    let video = state
        .store
        .update_cpm(&video_id, &creator.user.user_id, body.cpm)?;

    tracing::info!(video_id = %video_id, cpm = video.cpm, "CPM updated");

    Ok(Json(UpdateCpmResponse {
        video_id: video_id.to_string(),
        new_cpm: video.cpm,
        revenue_per_view: micros_to_units(revenue_per_view_micros(video.cpm)?),
    }))
}

/// Ad views and creator revenue for one day.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    /// UTC date (`YYYY-MM-DD`).
    pub date: String,
    /// Monetized ad views.
    pub ad_views: u64,
    /// Creator revenue.
    pub revenue: f64,
}

/// One ad view in the analytics listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdViewSummary {
    /// Ad view ID.
    pub ad_view_id: String,
    /// CPM used.
    pub cpm: i64,
    /// Creator share.
    pub creator_revenue: f64,
    /// Timestamp.
    pub created_at: String,
}

impl From<&AdView> for AdViewSummary {
    fn from(view: &AdView) -> Self {
        Self {
            ad_view_id: view.ad_view_id.to_string(),
            cpm: view.cpm,
            creator_revenue: micros_to_units(view.creator_revenue_micros),
            created_at: view.created_at.to_rfc3339(),
        }
    }
}

/// Video analytics response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoAnalyticsResponse {
    /// Video.
    #[serde(flatten)]
    pub video: VideoResponse,
    /// Monetized ad views across all uploads.
    pub total_views: u64,
    /// Ad views and revenue per day over the last 30 days, oldest first.
    pub daily_stats: Vec<DailyStats>,
    /// Most recent ad views.
    pub recent_ad_views: Vec<AdViewSummary>,
}

/// Analytics for one of the caller's videos.
pub async fn video_analytics(
    State(state): State<Arc<AppState>>,
    creator: CreatorUser,
    Path(video_id): Path<String>,
) -> Result<Json<VideoAnalyticsResponse>, ApiError> {
    let video_id = parse_video_id(&video_id)?;
    let video = state
        .store
        .get_video(&video_id)?
        .filter(|v| v.creator_id == creator.user.user_id)
        .ok_or_else(|| ApiError::NotFound("Video not found".into()))?;

    let since = Utc::now() - Duration::days(ANALYTICS_DAYS);
    let views = state.store.list_ad_views_by_video(&video_id, Some(since))?;

    Ok(Json(VideoAnalyticsResponse {
        total_views: video.total_views(),
        daily_stats: daily_stats(&views),
        recent_ad_views: views
            .iter()
            .take(RECENT_AD_VIEWS)
            .map(AdViewSummary::from)
            .collect(),
        video: VideoResponse::from(&video),
    }))
}

/// Group ad views by UTC date, ascending.
fn daily_stats(views: &[AdView]) -> Vec<DailyStats> {
    let mut days: BTreeMap<NaiveDate, (u64, i64)> = BTreeMap::new();
    for view in views {
        let day = days.entry(view.created_at.date_naive()).or_default();
        day.0 += 1;
        day.1 += view.creator_revenue_micros;
    }

    days.into_iter()
        .map(|(date, (ad_views, micros))| DailyStats {
            date: date.format("%Y-%m-%d").to_string(),
            ad_views,
            revenue: micros_to_units(micros),
        })
        .collect()
}
