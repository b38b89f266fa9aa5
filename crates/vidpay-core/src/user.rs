//! User and creator profiles.
//!
//! A [`User`] carries the monetization side of an identity: role, wallet,
//! premium entitlement, payout bank details and channel statistics.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MonetizationError, Result};
use crate::UserId;

// ============================================================================
// Constants
// ============================================================================

/// Subscribers required before monetization can be enabled.
pub const MIN_SUBSCRIBERS: u64 = 1000;

/// Watch hours required before monetization can be enabled.
pub const MIN_WATCH_HOURS: f64 = 4000.0;

/// Shortest accepted bank account number.
const ACCOUNT_NUMBER_MIN_LEN: usize = 9;

/// Longest accepted bank account number.
const ACCOUNT_NUMBER_MAX_LEN: usize = 18;

/// A user's monetization profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// The user ID (bearer token subject).
    pub user_id: UserId,

    /// Display name.
    pub name: Option<String>,

    /// Contact email, copied into audit entries.
    pub email: Option<String>,

    /// Role used by authorization guards.
    pub role: Role,

    /// Withdrawable earnings in micros. Never negative.
    pub wallet_balance_micros: i64,

    /// Lifetime earnings credited, in micros. Never decreases.
    pub total_earnings_micros: i64,

    /// Whether a premium entitlement was ever activated.
    pub is_premium: bool,

    /// When the premium entitlement lapses.
    pub premium_expiry: Option<DateTime<Utc>>,

    /// Payout bank account, required for withdrawals.
    pub bank_details: Option<BankDetails>,

    /// Whether the user owns a channel.
    pub has_channel: bool,

    /// Channel name, if any.
    pub channel_name: Option<String>,

    /// Channel statistics used by the monetization eligibility gate.
    pub channel_stats: ChannelStats,

    /// When the profile was created.
    pub created_at: DateTime<Utc>,

    /// When the profile was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new viewer profile with an empty wallet.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            name: None,
            email: None,
            role: Role::Viewer,
            wallet_balance_micros: 0,
            total_earnings_micros: 0,
            is_premium: false,
            premium_expiry: None,
            bank_details: None,
            has_channel: false,
            channel_name: None,
            channel_stats: ChannelStats::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the user holds a premium entitlement that has not expired.
    #[must_use]
    pub fn has_active_premium(&self, now: DateTime<Utc>) -> bool {
        self.is_premium && self.premium_expiry.is_some_and(|expiry| expiry > now)
    }

    /// Whether the user may use creator endpoints.
    #[must_use]
    pub fn is_creator(&self) -> bool {
        matches!(self.role, Role::Creator | Role::Admin) || self.has_channel
    }

    /// Whether the user satisfies the given capability.
    #[must_use]
    pub fn can(&self, capability: Capability) -> bool {
        match capability {
            Capability::Authenticated => true,
            Capability::Creator => self.is_creator(),
            Capability::Admin => self.role == Role::Admin,
        }
    }

    /// Whether the channel meets the subscriber and watch-hour thresholds.
    #[must_use]
    pub fn meets_monetization_requirements(&self) -> bool {
        self.channel_stats.subscriber_count >= MIN_SUBSCRIBERS
            && self.channel_stats.total_watch_hours >= MIN_WATCH_HOURS
    }

    /// Whether monetization is currently switched on for the channel.
    #[must_use]
    pub fn monetization_enabled(&self) -> bool {
        self.channel_stats.monetization_enabled_date.is_some()
    }

    /// Switch monetization on. Viewers become creators.
    ///
    /// # Errors
    ///
    /// Returns [`MonetizationError::MonetizationRequirementsNotMet`] when the
    /// channel is below either threshold.
    pub fn enable_monetization(&mut self, now: DateTime<Utc>) -> Result<()> {
        if !self.meets_monetization_requirements() {
            return Err(MonetizationError::MonetizationRequirementsNotMet {
                required_subscribers: MIN_SUBSCRIBERS,
                required_watch_hours: MIN_WATCH_HOURS,
                current_subscribers: self.channel_stats.subscriber_count,
                current_watch_hours: self.channel_stats.total_watch_hours,
            });
        }
        self.channel_stats.meets_monetization_requirements = true;
        self.channel_stats.monetization_enabled_date = Some(now);
        if self.role == Role::Viewer {
            self.role = Role::Creator;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Switch monetization off.
    pub fn disable_monetization(&mut self, now: DateTime<Utc>) {
        self.channel_stats.monetization_enabled_date = None;
        self.updated_at = now;
    }
}

/// Authorization roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Platform administrator.
    Admin,
    /// Channel owner who earns from ad views.
    Creator,
    /// Regular viewer.
    Viewer,
}

impl Role {
    /// The role name as used on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Creator => "creator",
            Self::Viewer => "viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = MonetizationError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "admin" => Ok(Self::Admin),
            "creator" => Ok(Self::Creator),
            "viewer" => Ok(Self::Viewer),
            other => Err(MonetizationError::InvalidRole(other.to_string())),
        }
    }
}

/// What an endpoint requires of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Any registered user.
    Authenticated,
    /// Creator or admin role, or channel ownership.
    Creator,
    /// Admin role.
    Admin,
}

/// Channel statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelStats {
    /// Subscriber count.
    pub subscriber_count: u64,
    /// Hours watched across the channel's videos.
    pub total_watch_hours: f64,
    /// Views counted by watch-time tracking.
    pub total_video_views: u64,
    /// Set when monetization was enabled after passing the gate.
    pub meets_monetization_requirements: bool,
    /// When monetization was last enabled.
    pub monetization_enabled_date: Option<DateTime<Utc>>,
}

/// Payout bank account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankDetails {
    /// Account number (9 to 18 characters).
    pub account_number: String,
    /// Name on the account.
    pub account_holder_name: String,
    /// IFSC code: four letters, a zero, six alphanumerics.
    pub ifsc_code: String,
    /// Bank name.
    pub bank_name: String,
}

impl BankDetails {
    /// Validate and build bank details.
    ///
    /// # Errors
    ///
    /// Returns [`MonetizationError::InvalidBankDetails`] if a field is empty,
    /// the account number length is outside 9..=18 or the IFSC code is
    /// malformed.
    pub fn new(
        account_number: &str,
        account_holder_name: &str,
        ifsc_code: &str,
        bank_name: &str,
    ) -> Result<Self> {
        let account_number = account_number.trim();
        let account_holder_name = account_holder_name.trim();
        let ifsc_code = ifsc_code.trim();
        let bank_name = bank_name.trim();

        if [account_number, account_holder_name, ifsc_code, bank_name]
            .iter()
            .any(|field| field.is_empty())
        {
            return Err(MonetizationError::InvalidBankDetails(
                "all bank details are required".into(),
            ));
        }

        let len = account_number.chars().count();
        if !(ACCOUNT_NUMBER_MIN_LEN..=ACCOUNT_NUMBER_MAX_LEN).contains(&len) {
            return Err(MonetizationError::InvalidBankDetails(
                "invalid account number".into(),
            ));
        }

        if !is_valid_ifsc(ifsc_code) {
            return Err(MonetizationError::InvalidBankDetails(
                "invalid IFSC code".into(),
            ));
        }

        Ok(Self {
            account_number: account_number.to_string(),
            account_holder_name: account_holder_name.to_string(),
            ifsc_code: ifsc_code.to_string(),
            bank_name: bank_name.to_string(),
        })
    }

    /// Account number with everything but the last four characters masked.
    #[must_use]
    pub fn masked_account_number(&self) -> String {
        mask_account_number(&self.account_number)
    }
}

/// Replace all but the last four characters with `*`.
#[must_use]
pub fn mask_account_number(account_number: &str) -> String {
    let len = account_number.chars().count();
    account_number
        .chars()
        .enumerate()
        .map(|(i, c)| if i + 4 < len { '*' } else { c })
        .collect()
}

/// `^[A-Z]{4}0[A-Z0-9]{6}$`
fn is_valid_ifsc(code: &str) -> bool {
    let bytes = code.as_bytes();
    bytes.len() == 11
        && bytes[..4].iter().all(u8::is_ascii_uppercase)
        && bytes[4] == b'0'
        && bytes[5..]
            .iter()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}
