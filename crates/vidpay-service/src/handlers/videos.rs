//! Video registration handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use vidpay_core::{micros_to_units, Video, VideoUpload};
use vidpay_store::Store;

use crate::auth::CreatorUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Register video request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterVideoRequest {
    /// Title.
    pub title: String,
    /// Thumbnail URL.
    pub thumbnail_url: Option<String>,
    /// Length in seconds.
    #[serde(default)]
    pub length_seconds: u64,
}

/// Video response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoResponse {
    /// Video ID.
    pub video_id: String,
    /// Title.
    pub title: String,
    /// Thumbnail URL.
    pub thumbnail_url: Option<String>,
    /// CPM in currency units.
    pub cpm: i64,
    /// Whether ads on this video earn revenue.
    pub is_monetized: bool,
    /// Views counted by watch-time tracking.
    pub views: u64,
    /// Ad views monetized.
    pub monetized_views: u64,
    /// Revenue earned.
    pub total_revenue: f64,
    /// Created timestamp.
    pub created_at: String,
}

impl From<&Video> for VideoResponse {
    fn from(video: &Video) -> Self {
        let entry = video.revenue_entry();
        Self {
            video_id: video.video_id.to_string(),
            title: entry.map(|e| e.title.clone()).unwrap_or_default(),
            thumbnail_url: entry.and_then(|e| e.thumbnail_url.clone()),
            cpm: video.cpm,
            is_monetized: video.is_monetized,
            views: entry.map_or(0, |e| e.views),
            monetized_views: entry.map_or(0, |e| e.monetized_views),
            total_revenue: micros_to_units(video.total_revenue_micros()),
            created_at: video.created_at.to_rfc3339(),
        }
    }
}

/// Register a video owned by the caller.
pub async fn register_video(
    State(state): State<Arc<AppState>>,
    creator: CreatorUser,
    Json(body): Json<RegisterVideoRequest>,
) -> Result<Json<VideoResponse>, ApiError> {
    let title = body.title.trim();
    if title.is_empty() {
        return Err(ApiError::BadRequest("Title is required".into()));
    }

    let video = Video::new(
        creator.user.user_id,
        VideoUpload::new(title, body.thumbnail_url, body.length_seconds),
        creator.user.monetization_enabled(),
    );
    state.store.create_video(&video)?;

    tracing::info!(
        video_id = %video.video_id,
        creator_id = %video.creator_id,
        is_monetized = video.is_monetized,
        "Video registered"
    );

    Ok(Json(VideoResponse::from(&video)))
}

/// List videos response.
#[derive(Debug, Serialize)]
pub struct ListVideosResponse {
    /// The caller's videos.
    pub videos: Vec<VideoResponse>,
}

/// List the caller's videos.
pub async fn list_my_videos(
    State(state): State<Arc<AppState>>,
    creator: CreatorUser,
) -> Result<Json<ListVideosResponse>, ApiError> {
    let videos = state
        .store
        .list_videos_by_creator(&creator.user.user_id)?
        .iter()
        .map(VideoResponse::from)
        .collect();

    Ok(Json(ListVideosResponse { videos }))
}
