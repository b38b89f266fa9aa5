//! Per-(video, viewer) view sessions and the 24-hour ad cooldown.
//!
//! There is one session per pair. The cooldown is measured from
//! `last_ad_view`; the session window (24 hours from `session_start`) only
//! decides when a session is refreshed or garbage collected.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{UserId, VideoId};

/// Length of the cooldown and session windows, in hours.
pub const COOLDOWN_HOURS: i64 = 24;

/// The cooldown window.
#[must_use]
pub fn cooldown_window() -> Duration {
    Duration::hours(COOLDOWN_HOURS)
}

/// Monetization eligibility window for one viewer on one video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewSession {
    /// Video being watched.
    pub video_id: VideoId,
    /// Viewer.
    pub viewer_id: UserId,
    /// IP address seen when the session started.
    pub ip_address: Option<String>,
    /// User agent seen when the session started.
    pub user_agent: Option<String>,
    /// When the current window started.
    pub session_start: DateTime<Utc>,
    /// When the last monetized ad was counted.
    pub last_ad_view: Option<DateTime<Utc>>,
    /// Monetized ads counted for this pair.
    pub ads_viewed_count: u32,
    /// Whether an ad was shown in this session.
    pub ad_shown: bool,
    /// Bot-risk score, 0 to 100.
    pub bot_score: u8,
    /// Set when the pair is blocked from monetization.
    pub is_blocked: bool,
    /// Why the pair was blocked.
    pub block_reason: Option<String>,
}

/// Outcome of evaluating a session at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEligibility {
    /// A monetized ad may be shown.
    Eligible,
    /// An ad was counted less than 24 hours ago.
    CooldownActive {
        /// When the pair becomes eligible again.
        retry_after: DateTime<Utc>,
    },
    /// The pair is blocked.
    Blocked,
}

impl ViewSession {
    /// Start a session at `now`.
    #[must_use]
    pub fn start(
        video_id: VideoId,
        viewer_id: UserId,
        ip_address: Option<String>,
        user_agent: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            video_id,
            viewer_id,
            ip_address,
            user_agent,
            session_start: now,
            last_ad_view: None,
            ads_viewed_count: 0,
            ad_shown: false,
            bot_score: 0,
            is_blocked: false,
            block_reason: None,
        }
    }

    /// When the cooldown from the last ad view ends, if one applies.
    #[must_use]
    pub fn cooldown_until(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.last_ad_view
            .map(|last| last + cooldown_window())
            .filter(|until| *until > now)
    }

    /// Whether a monetized ad may be counted at `now`.
    #[must_use]
    pub fn eligibility(&self, now: DateTime<Utc>) -> SessionEligibility {
        if self.is_blocked {
            return SessionEligibility::Blocked;
        }
        match self.cooldown_until(now) {
            Some(retry_after) => SessionEligibility::CooldownActive { retry_after },
            None => SessionEligibility::Eligible,
        }
    }

    /// Whether the 24-hour window opened at `session_start` has lapsed.
    #[must_use]
    pub fn window_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.session_start >= cooldown_window()
    }

    /// Latest activity on the session.
    #[must_use]
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_ad_view
            .map_or(self.session_start, |last| last.max(self.session_start))
    }

    /// Whether the session can no longer gate anything and may be deleted.
    ///
    /// Blocked sessions are kept.
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        !self.is_blocked && now - self.last_activity() >= cooldown_window()
    }

    /// Open a new window on a lapsed session, keeping the block state and
    /// the last ad view.
    pub fn refresh(
        &mut self,
        ip_address: Option<String>,
        user_agent: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.session_start = now;
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self.ad_shown = false;
    }

    /// Record a counted ad view.
    pub fn mark_ad_view(&mut self, now: DateTime<Utc>) {
        self.last_ad_view = Some(now);
        self.ads_viewed_count += 1;
        self.ad_shown = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(now: DateTime<Utc>) -> ViewSession {
        ViewSession::start(VideoId::generate(), UserId::generate(), None, None, now)
    }

    #[test]
    fn fresh_session_is_eligible() {
        let now = Utc::now();
        assert_eq!(session(now).eligibility(now), SessionEligibility::Eligible);
    }

    #[test]
    fn ad_view_starts_cooldown() {
        let now = Utc::now();
        let mut s = session(now);
        s.mark_ad_view(now);

        assert_eq!(s.ads_viewed_count, 1);
        assert!(s.ad_shown);
        assert_eq!(
            s.eligibility(now + Duration::hours(23)),
            SessionEligibility::CooldownActive {
                retry_after: now + Duration::hours(24)
            }
        );
        assert_eq!(
            s.eligibility(now + Duration::hours(24)),
            SessionEligibility::Eligible
        );
    }

    #[test]
    fn cooldown_ignores_session_start() {
        let start = Utc::now() - Duration::hours(30);
        let mut s = session(start);
        let ad_time = Utc::now() - Duration::hours(2);
        s.mark_ad_view(ad_time);

        assert!(s.window_expired(Utc::now()));
        assert!(matches!(
            s.eligibility(Utc::now()),
            SessionEligibility::CooldownActive { .. }
        ));
    }

    #[test]
    fn blocked_session_is_never_eligible() {
        let now = Utc::now();
        let mut s = session(now);
        s.is_blocked = true;
        assert_eq!(s.eligibility(now), SessionEligibility::Blocked);
        assert!(!s.is_stale(now + Duration::days(10)));
    }

    #[test]
    fn staleness_uses_latest_activity() {
        let now = Utc::now();
        let mut s = session(now - Duration::hours(48));
        assert!(s.is_stale(now));

        s.mark_ad_view(now - Duration::hours(1));
        assert!(!s.is_stale(now));
        assert!(s.is_stale(now + Duration::hours(23)));
    }

    #[test]
    fn refresh_keeps_last_ad_view() {
        let now = Utc::now();
        let mut s = session(now - Duration::hours(50));
        s.mark_ad_view(now - Duration::hours(49));
        s.refresh(Some("10.0.0.1".into()), None, now);

        assert_eq!(s.session_start, now);
        assert!(!s.ad_shown);
        assert_eq!(s.ads_viewed_count, 1);
        assert!(s.last_ad_view.is_some());
    }
}
