//! Ad view handlers: view sessions, monetized ad views and watch time.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use vidpay_core::{
    check_ad_eligibility, micros_to_units, revenue_per_view_micros, AdViewRejection, AuditEntry,
    AuditEventType, AuditStatus, User, VideoId, REPEAT_AD_VIEW_FLAG, REPEAT_AD_VIEW_RISK_SCORE,
};
use vidpay_store::{AdViewRecording, ClientInfo, Store, StoreError};

use super::parse_video_id;
use crate::auth::{AuthUser, CurrentUser};
use crate::context::RequestContext;
use crate::error::ApiError;
use crate::state::AppState;

/// Start view request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartViewRequest {
    /// Video being watched.
    pub video_id: String,
}

/// Start view response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartViewResponse {
    /// Whether a monetized ad should be shown.
    pub should_show_ad: bool,
    /// Why not, when `should_show_ad` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    /// Human-readable reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    /// Video CPM.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpm: Option<i64>,
    /// Revenue per monetized view.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue_per_view: Option<f64>,
    /// When the current cooldown ends.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown_until: Option<String>,
}

impl StartViewResponse {
    fn declined(rejection: AdViewRejection) -> Self {
        let cooldown_until = match rejection {
            AdViewRejection::CooldownActive { retry_after } => Some(retry_after.to_rfc3339()),
            _ => None,
        };
        Self {
            should_show_ad: false,
            reason: Some(rejection.code()),
            message: Some(rejection.message()),
            cpm: None,
            revenue_per_view: None,
            cooldown_until,
        }
    }
}

/// Open (or refresh) the caller's view session for a video and say whether
/// a monetized ad should run.
pub async fn start_view(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    context: RequestContext,
    Json(body): Json<StartViewRequest>,
) -> Result<Json<StartViewResponse>, ApiError> {
    let video_id = parse_video_id(&body.video_id)?;
    let now = Utc::now();

    let video = state
        .store
        .get_video(&video_id)?
        .ok_or_else(|| ApiError::NotFound("Video not found".into()))?;

    // Video and viewer checks first; no session for ineligible pairs.
    if let Err(rejection) = check_ad_eligibility(&video, &current.user, None, now) {
        return Ok(Json(StartViewResponse::declined(rejection)));
    }

    let session = state.store.start_view_session(
        &video_id,
        &current.user.user_id,
        &context.client,
        now,
    )?;

    if let Err(rejection) = check_ad_eligibility(&video, &current.user, Some(&session), now) {
        return Ok(Json(StartViewResponse::declined(rejection)));
    }

    let revenue_per_view = revenue_per_view_micros(video.cpm)?;

    Ok(Json(StartViewResponse {
        should_show_ad: true,
        reason: None,
        message: None,
        cpm: Some(video.cpm),
        revenue_per_view: Some(micros_to_units(revenue_per_view)),
        cooldown_until: None,
    }))
}

/// Record ad view request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordAdViewRequest {
    /// Video the ad ran on.
    pub video_id: String,
    /// Whether the ad played to completion.
    #[serde(default)]
    pub ad_completed: bool,
}

/// Record ad view response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordAdViewResponse {
    /// Revenue for this view.
    pub total_revenue: f64,
    /// Creator share.
    pub creator_revenue: f64,
    /// Platform share.
    pub platform_revenue: f64,
    /// CPM used.
    pub cpm: i64,
    /// Earning transaction ID.
    pub transaction_id: String,
    /// Ad view ID.
    pub ad_view_id: String,
}

/// Monetize a completed ad impression.
///
/// Every rejected attempt is written to the audit log; cooldown violations
/// are flagged for review.
pub async fn record_ad_view(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    context: RequestContext,
    Json(body): Json<RecordAdViewRequest>,
) -> Result<Json<RecordAdViewResponse>, ApiError> {
    let video_id = parse_video_id(&body.video_id)?;
    let now = Utc::now();
    let viewer = &current.user;

    if !body.ad_completed {
        let rejection = AdViewRejection::AdNotCompleted;
        audit_rejection(&state, viewer, video_id, &context.client, rejection);
        return Err(ApiError::AdViewRejected(rejection));
    }

    let recording = AdViewRecording {
        video_id,
        viewer_id: viewer.user_id,
        client: context.client.clone(),
        idempotency_key: context.idempotency_key,
        now,
    };

    let recorded = match state.store.record_ad_view(&recording) {
        Ok(recorded) => recorded,
        Err(StoreError::AdViewRejected(rejection)) => {
            tracing::warn!(
                viewer_id = %viewer.user_id,
                video_id = %video_id,
                reason = rejection.code(),
                "Ad view rejected"
            );
            audit_rejection(&state, viewer, video_id, &context.client, rejection);
            return Err(ApiError::AdViewRejected(rejection));
        }
        Err(e) => return Err(e.into()),
    };

    let ad_view = &recorded.ad_view;
    tracing::info!(
        ad_view_id = %ad_view.ad_view_id,
        video_id = %video_id,
        viewer_id = %viewer.user_id,
        creator_id = %ad_view.creator_id,
        creator_micros = ad_view.creator_revenue_micros,
        creator_balance_micros = recorded.creator_balance_micros,
        "Ad view monetized"
    );

    Ok(Json(RecordAdViewResponse {
        total_revenue: micros_to_units(ad_view.total_revenue_micros),
        creator_revenue: micros_to_units(ad_view.creator_revenue_micros),
        platform_revenue: micros_to_units(ad_view.platform_revenue_micros),
        cpm: ad_view.cpm,
        transaction_id: recorded.transaction_id.to_string(),
        ad_view_id: ad_view.ad_view_id.to_string(),
    }))
}

/// Append the audit entry for a rejected ad view. Failures are logged only.
fn audit_rejection(
    state: &AppState,
    viewer: &User,
    video_id: VideoId,
    client: &ClientInfo,
    rejection: AdViewRejection,
) {
    let status = if rejection.is_suspicious() {
        AuditStatus::Flagged
    } else {
        AuditStatus::Failed
    };

    let mut entry = AuditEntry::new(AuditEventType::AdView, viewer.user_id, status, Utc::now())
        .with_email(viewer.email.clone())
        .with_client(client.ip_address.clone(), client.user_agent.clone())
        .with_video(video_id)
        .with_failure(rejection.message())
        .with_metadata(serde_json::json!({ "reason": rejection.code() }));
    if rejection.is_suspicious() {
        entry = entry.with_risk(REPEAT_AD_VIEW_FLAG, REPEAT_AD_VIEW_RISK_SCORE);
    }

    if let Err(e) = state.store.append_audit(&entry) {
        tracing::error!(error = %e, video_id = %video_id, "Failed to audit rejected ad view");
    }
}

/// Track watch time request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackWatchTimeRequest {
    /// Video watched.
    pub video_id: String,
    /// Seconds watched.
    pub watch_time_seconds: Option<u64>,
}

/// Track watch time response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackWatchTimeResponse {
    /// Hours added to the creator's channel.
    pub watch_time_added: f64,
    /// Creator's total watch hours.
    pub total_watch_hours: f64,
}

/// Add watch time to a video's creator.
pub async fn track_watch_time(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<TrackWatchTimeRequest>,
) -> Result<Json<TrackWatchTimeResponse>, ApiError> {
    let video_id = parse_video_id(&body.video_id)?;
    let seconds = body
        .watch_time_seconds
        .filter(|s| *s > 0)
        .ok_or_else(|| ApiError::BadRequest("Watch time must be a positive number".into()))?;

    let receipt = state.store.add_watch_time(&video_id, seconds)?;

    tracing::debug!(
        video_id = %video_id,
        viewer_id = %auth.user_id,
        seconds,
        "Watch time tracked"
    );

    Ok(Json(TrackWatchTimeResponse {
        watch_time_added: receipt.hours_added,
        total_watch_hours: receipt.stats.total_watch_hours,
    }))
}
