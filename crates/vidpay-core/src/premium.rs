//! Premium plans and entitlement arithmetic.

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MonetizationError, Result};
use crate::revenue::MICROS_PER_UNIT;
use crate::UserId;

/// Currency charged for premium plans.
pub const PREMIUM_CURRENCY: &str = "INR";

/// Plan used when a request names none.
pub const DEFAULT_PLAN_ID: &str = "monthly";

/// A purchasable premium plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PremiumPlan {
    /// Plan ID.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Price in whole rupees.
    pub price_inr: i64,
    /// Entitlement length in calendar months.
    pub months: u32,
    /// Highlighted in the UI.
    pub recommended: bool,
}

impl PremiumPlan {
    /// Price in minor units (paise), as charged by the payment provider.
    #[must_use]
    pub const fn amount_minor(&self) -> i64 {
        self.price_inr * 100
    }

    /// Price in micros.
    #[must_use]
    pub const fn amount_micros(&self) -> i64 {
        self.price_inr * MICROS_PER_UNIT
    }

    /// When an entitlement bought at `now` ends.
    ///
    /// # Errors
    ///
    /// Returns [`MonetizationError::InvalidAmount`] if the date overflows.
    pub fn expiry_from(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        now.checked_add_months(Months::new(self.months))
            .ok_or_else(|| MonetizationError::InvalidAmount("premium expiry overflows".into()))
    }
}

/// All plans, in display order.
pub static PREMIUM_PLANS: [PremiumPlan; 3] = [
    PremiumPlan {
        id: "monthly",
        name: "1 Month",
        price_inr: 199,
        months: 1,
        recommended: false,
    },
    PremiumPlan {
        id: "quarterly",
        name: "3 Months",
        price_inr: 499,
        months: 3,
        recommended: true,
    },
    PremiumPlan {
        id: "yearly",
        name: "12 Months",
        price_inr: 1899,
        months: 12,
        recommended: false,
    },
];

/// Look up a plan. `None` selects [`DEFAULT_PLAN_ID`].
///
/// # Errors
///
/// Returns [`MonetizationError::UnknownPlan`] for unknown IDs.
pub fn find_plan(plan_id: Option<&str>) -> Result<&'static PremiumPlan> {
    let id = plan_id.unwrap_or(DEFAULT_PLAN_ID);
    PREMIUM_PLANS
        .iter()
        .find(|plan| plan.id == id)
        .ok_or_else(|| MonetizationError::UnknownPlan(id.to_string()))
}

/// A payment order issued for a premium purchase.
///
/// Verification requires the order to exist and to belong to the paying
/// user and plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PremiumOrder {
    /// Provider order ID.
    pub order_id: String,
    /// User the order was issued to.
    pub user_id: UserId,
    /// Plan being bought.
    pub plan_id: String,
    /// Amount in minor units (paise).
    pub amount_minor: i64,
    /// Currency code.
    pub currency: String,
    /// Receipt reference sent to the provider.
    pub receipt: String,
    /// When the order was created.
    pub created_at: DateTime<Utc>,
}

impl PremiumOrder {
    /// Receipt reference for an order created by `user_id` at `now`.
    #[must_use]
    pub fn receipt_for(user_id: UserId, now: DateTime<Utc>) -> String {
        format!("premium_{user_id}_{}", now.timestamp_millis())
    }

    /// Whether the order was issued to `user_id` for `plan`.
    #[must_use]
    pub fn matches(&self, user_id: UserId, plan: &PremiumPlan) -> bool {
        self.user_id == user_id && self.plan_id == plan.id && self.amount_minor == plan.amount_minor()
    }
}

/// The default plan.
#[must_use]
pub fn default_plan() -> &'static PremiumPlan {
    &PREMIUM_PLANS[0]
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn default_plan_is_monthly() {
        let plan = find_plan(None).unwrap();
        assert_eq!(plan.id, DEFAULT_PLAN_ID);
        assert_eq!(plan, default_plan());
        assert_eq!(plan.amount_minor(), 19_900);
    }

    #[test]
    fn unknown_plan_is_rejected() {
        assert!(matches!(
            find_plan(Some("weekly")),
            Err(MonetizationError::UnknownPlan(id)) if id == "weekly"
        ));
    }

    #[test]
    fn quarterly_is_recommended() {
        let plan = find_plan(Some("quarterly")).unwrap();
        assert!(plan.recommended);
        assert_eq!(plan.amount_minor(), 49_900);
        assert_eq!(plan.amount_micros(), 499_000_000);
    }

    #[test]
    fn order_must_match_user_and_plan() {
        let user = UserId::generate();
        let plan = find_plan(Some("quarterly")).unwrap();
        let now = Utc::now();
        let order = PremiumOrder {
            order_id: "order_1".into(),
            user_id: user,
            plan_id: plan.id.into(),
            amount_minor: plan.amount_minor(),
            currency: PREMIUM_CURRENCY.into(),
            receipt: PremiumOrder::receipt_for(user, now),
            created_at: now,
        };

        assert!(order.matches(user, plan));
        assert!(!order.matches(UserId::generate(), plan));
        assert!(!order.matches(user, find_plan(Some("yearly")).unwrap()));
        assert!(order.receipt.starts_with("premium_"));
    }

    #[test]
    fn expiry_uses_calendar_months() {
        let start = Utc.with_ymd_and_hms(2024, 1, 31, 12, 0, 0).unwrap();
        let monthly = find_plan(Some("monthly")).unwrap();
        assert_eq!(
            monthly.expiry_from(start).unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap()
        );

        let yearly = find_plan(Some("yearly")).unwrap();
        assert_eq!(
            yearly.expiry_from(start).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 31, 12, 0, 0).unwrap()
        );
    }
}
