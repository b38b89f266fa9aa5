//! Monetized ad impressions and the eligibility rules that gate them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::revenue::RevenueSplit;
use crate::session::{SessionEligibility, ViewSession};
use crate::user::User;
use crate::video::Video;
use crate::{AdViewId, UserId, VideoId};

/// Immutable record of one monetized ad impression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdView {
    /// Ad view ID.
    pub ad_view_id: AdViewId,
    /// Video the ad ran on.
    pub video_id: VideoId,
    /// Viewer who watched the ad.
    pub viewer_id: UserId,
    /// Creator credited with the earning.
    pub creator_id: UserId,
    /// CPM in effect when the view was counted.
    pub cpm: i64,
    /// Total revenue, in micros.
    pub total_revenue_micros: i64,
    /// Creator share, in micros.
    pub creator_revenue_micros: i64,
    /// Platform share, in micros.
    pub platform_revenue_micros: i64,
    /// Viewer IP address.
    pub ip_address: Option<String>,
    /// Viewer user agent.
    pub user_agent: Option<String>,
    /// Always true for stored views.
    pub is_monetized: bool,
    /// When the view was counted.
    pub created_at: DateTime<Utc>,
}

impl AdView {
    /// Build the record for a counted view.
    #[must_use]
    pub fn new(
        video: &Video,
        viewer_id: UserId,
        split: RevenueSplit,
        ip_address: Option<String>,
        user_agent: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            ad_view_id: AdViewId::generate(),
            video_id: video.video_id,
            viewer_id,
            creator_id: video.creator_id,
            cpm: split.cpm,
            total_revenue_micros: split.total_micros,
            creator_revenue_micros: split.creator_micros,
            platform_revenue_micros: split.platform_micros,
            ip_address,
            user_agent,
            is_monetized: true,
            created_at: now,
        }
    }

    /// The revenue split recorded on this view.
    #[must_use]
    pub fn split(&self) -> RevenueSplit {
        RevenueSplit {
            cpm: self.cpm,
            total_micros: self.total_revenue_micros,
            creator_micros: self.creator_revenue_micros,
            platform_micros: self.platform_revenue_micros,
        }
    }
}

/// Why an ad view was not monetized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum AdViewRejection {
    /// The video does not have monetization enabled.
    NotMonetized,
    /// The viewer holds an active premium entitlement.
    Premium,
    /// The video has no revenue-bearing upload entry.
    NoData,
    /// A view was already counted for this pair within 24 hours.
    CooldownActive {
        /// When the pair becomes eligible again.
        retry_after: DateTime<Utc>,
    },
    /// The pair is blocked from monetization.
    Blocked,
    /// The client reported the ad as not completed.
    AdNotCompleted,
}

impl AdViewRejection {
    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotMonetized => "not_monetized",
            Self::Premium => "premium_user",
            Self::NoData => "no_revenue_data",
            Self::CooldownActive { .. } => "cooldown_active",
            Self::Blocked => "blocked",
            Self::AdNotCompleted => "ad_not_completed",
        }
    }

    /// Human-readable message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::NotMonetized => "Video is not monetized",
            Self::Premium => "Premium users do not see ads",
            Self::NoData => "Video has no revenue data",
            Self::CooldownActive { .. } => "Ad already viewed for this video in the last 24 hours",
            Self::Blocked => "Ad views are blocked for this viewer on this video",
            Self::AdNotCompleted => "Ad was not completed",
        }
    }

    /// Whether the attempt should be flagged for review.
    #[must_use]
    pub const fn is_suspicious(&self) -> bool {
        matches!(self, Self::CooldownActive { .. })
    }
}

impl fmt::Display for AdViewRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Decide whether `viewer` may be shown a monetized ad on `video` at `now`.
///
/// Checks run in order: monetized flag, premium entitlement, revenue entry,
/// then the session (blocked, cooldown). A missing session is eligible.
///
/// # Errors
///
/// Returns the first failing [`AdViewRejection`].
pub fn check_ad_eligibility(
    video: &Video,
    viewer: &User,
    session: Option<&ViewSession>,
    now: DateTime<Utc>,
) -> Result<(), AdViewRejection> {
    if !video.is_monetized {
        return Err(AdViewRejection::NotMonetized);
    }
    if viewer.has_active_premium(now) {
        return Err(AdViewRejection::Premium);
    }
    if video.revenue_entry().is_none() {
        return Err(AdViewRejection::NoData);
    }
    match session.map(|s| s.eligibility(now)) {
        Some(SessionEligibility::Blocked) => Err(AdViewRejection::Blocked),
        Some(SessionEligibility::CooldownActive { retry_after }) => {
            Err(AdViewRejection::CooldownActive { retry_after })
        }
        Some(SessionEligibility::Eligible) | None => Ok(()),
    }
}
