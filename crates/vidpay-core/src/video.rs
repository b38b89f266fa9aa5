//! Video monetization records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::revenue::DEFAULT_CPM;
use crate::{UserId, VideoId};

/// A video with its monetization settings and per-upload counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    /// Video ID.
    pub video_id: VideoId,

    /// Owning creator.
    pub creator_id: UserId,

    /// Cost per mille in whole currency units.
    pub cpm: i64,

    /// Whether ads on this video earn revenue.
    pub is_monetized: bool,

    /// Upload entries. The first one carries the revenue counters.
    pub uploads: Vec<VideoUpload>,

    /// When the video was registered.
    pub created_at: DateTime<Utc>,

    /// When the video was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Video {
    /// Create a video with the default CPM and a single upload entry.
    #[must_use]
    pub fn new(creator_id: UserId, upload: VideoUpload, is_monetized: bool) -> Self {
        let now = Utc::now();
        Self {
            video_id: VideoId::generate(),
            creator_id,
            cpm: DEFAULT_CPM,
            is_monetized,
            uploads: vec![upload],
            created_at: now,
            updated_at: now,
        }
    }

    /// The upload entry that accumulates revenue, if any.
    #[must_use]
    pub fn revenue_entry(&self) -> Option<&VideoUpload> {
        self.uploads.first()
    }

    /// Mutable access to the revenue-bearing upload entry.
    pub fn revenue_entry_mut(&mut self) -> Option<&mut VideoUpload> {
        self.uploads.first_mut()
    }

    /// Revenue accumulated across all uploads, in micros.
    #[must_use]
    pub fn total_revenue_micros(&self) -> i64 {
        self.uploads.iter().map(|u| u.total_revenue_micros).sum()
    }

    /// Monetized ad views across all uploads.
    #[must_use]
    pub fn total_views(&self) -> u64 {
        self.uploads.iter().map(|u| u.total_views).sum()
    }
}

/// One uploaded rendition of a video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoUpload {
    /// Title.
    pub title: String,
    /// Thumbnail URL.
    pub thumbnail_url: Option<String>,
    /// Length in seconds.
    pub length_seconds: u64,
    /// Plays counted by watch-time tracking.
    pub views: u64,
    /// Likes.
    pub likes: u64,
    /// Ad revenue generated, in micros.
    pub total_revenue_micros: i64,
    /// Views that produced ad revenue.
    pub total_views: u64,
    /// Monetized views (one per viewer per cooldown window).
    pub monetized_views: u64,
    /// Upload time.
    pub uploaded_at: DateTime<Utc>,
}

impl VideoUpload {
    /// Create an upload entry with zeroed counters.
    #[must_use]
    pub fn new(title: impl Into<String>, thumbnail_url: Option<String>, length_seconds: u64) -> Self {
        Self {
            title: title.into(),
            thumbnail_url,
            length_seconds,
            views: 0,
            likes: 0,
            total_revenue_micros: 0,
            total_views: 0,
            monetized_views: 0,
            uploaded_at: Utc::now(),
        }
    }

    /// Count one monetized ad view worth `total_micros`.
    pub fn credit_ad_view(&mut self, total_micros: i64) {
        self.total_revenue_micros += total_micros;
        self.total_views += 1;
        self.monetized_views += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_video_uses_default_cpm() {
        let video = Video::new(UserId::generate(), VideoUpload::new("Intro", None, 60), false);
        assert_eq!(video.cpm, DEFAULT_CPM);
        assert!(video.revenue_entry().is_some());
    }

    #[test]
    fn crediting_updates_all_counters() {
        let mut video = Video::new(UserId::generate(), VideoUpload::new("Intro", None, 60), true);
        video.revenue_entry_mut().unwrap().credit_ad_view(100_000);
        video.revenue_entry_mut().unwrap().credit_ad_view(100_000);

        let entry = video.revenue_entry().unwrap();
        assert_eq!(entry.total_revenue_micros, 200_000);
        assert_eq!(entry.total_views, 2);
        assert_eq!(entry.monetized_views, 2);
        assert_eq!(video.total_revenue_micros(), 200_000);
    }

    #[test]
    fn video_without_uploads_has_no_revenue_entry() {
        let mut video = Video::new(UserId::generate(), VideoUpload::new("Intro", None, 60), true);
        video.uploads.clear();
        assert!(video.revenue_entry().is_none());
        assert_eq!(video.total_views(), 0);
    }
}
