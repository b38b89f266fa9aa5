//! Admin handlers: withdrawal approval, platform stats, audit log and users.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use vidpay_core::{
    micros_to_units, AuditEntry, AuditFilter, AuditStatus, Role, TransactionStatus,
    TransactionType, Video,
};
use vidpay_store::{Store, WithdrawalResolution};

use super::accounts::ProfileResponse;
use super::wallet::WithdrawalResponse;
use super::{page_window, parse_transaction_id, parse_user_id, Pagination};
use crate::auth::AdminUser;
use crate::context::RequestContext;
use crate::error::ApiError;
use crate::state::AppState;

/// Flagged entries returned at most.
const FLAGGED_LIMIT: usize = 100;

/// Who requested a withdrawal.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatorSummary {
    /// User ID.
    pub user_id: String,
    /// Display name.
    pub name: Option<String>,
    /// Email.
    pub email: Option<String>,
    /// Channel name.
    pub channel_name: Option<String>,
}

/// A pending withdrawal with its creator.
#[derive(Debug, Serialize)]
pub struct PendingWithdrawal {
    /// The withdrawal.
    #[serde(flatten)]
    pub withdrawal: WithdrawalResponse,
    /// Requesting creator, if the profile still exists.
    pub creator: Option<CreatorSummary>,
}

/// Pending withdrawals response.
#[derive(Debug, Serialize)]
pub struct PendingWithdrawalsResponse {
    /// Pending withdrawals, newest first.
    pub withdrawals: Vec<PendingWithdrawal>,
    /// Number of pending withdrawals.
    pub count: usize,
}

/// All withdrawals awaiting a decision.
pub async fn pending_withdrawals(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<Json<PendingWithdrawalsResponse>, ApiError> {
    let transactions = state.store.list_transactions(
        Some(TransactionType::Withdrawal),
        Some(TransactionStatus::Pending),
    )?;

    let mut withdrawals = Vec::with_capacity(transactions.len());
    for tx in &transactions {
        let creator = state.store.get_user(&tx.user_id)?.map(|user| CreatorSummary {
            user_id: user.user_id.to_string(),
            name: user.name,
            email: user.email,
            channel_name: user.channel_name,
        });
        withdrawals.push(PendingWithdrawal {
            withdrawal: WithdrawalResponse::from(tx),
            creator,
        });
    }

    Ok(Json(PendingWithdrawalsResponse {
        count: withdrawals.len(),
        withdrawals,
    }))
}

/// Approve withdrawal request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveWithdrawalRequest {
    /// Withdrawal to resolve.
    pub transaction_id: String,
    /// Approve (true) or reject and refund (false).
    pub approved: bool,
    /// Rejection reason.
    pub failure_reason: Option<String>,
}

/// Approve or reject a pending withdrawal.
pub async fn approve_withdrawal(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    context: RequestContext,
    Json(body): Json<ApproveWithdrawalRequest>,
) -> Result<Json<WithdrawalResponse>, ApiError> {
    let transaction_id = parse_transaction_id(&body.transaction_id)?;

    let transaction = state.store.resolve_withdrawal(&WithdrawalResolution {
        transaction_id,
        admin_id: admin.user.user_id,
        approve: body.approved,
        reason: body.failure_reason,
        client: context.client,
        now: Utc::now(),
    })?;

    tracing::info!(
        transaction_id = %transaction_id,
        admin_id = %admin.user.user_id,
        user_id = %transaction.user_id,
        status = transaction.status.as_str(),
        amount_micros = transaction.amount_micros,
        "Withdrawal resolved"
    );

    Ok(Json(WithdrawalResponse::from(&transaction)))
}

/// Pending withdrawal totals.
#[derive(Debug, Serialize)]
pub struct PendingTotals {
    /// Number pending.
    pub count: usize,
    /// Amount pending.
    pub amount: f64,
}

/// Platform stats response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStatsResponse {
    /// Gross ad revenue across all videos.
    pub total_ad_revenue: f64,
    /// Creator earnings credited.
    pub total_earnings: f64,
    /// Platform share of ad revenue.
    pub platform_revenue: f64,
    /// Completed payouts.
    pub total_withdrawals: f64,
    /// Withdrawals awaiting a decision.
    pub pending_withdrawals: PendingTotals,
    /// Premium subscription revenue.
    pub premium_revenue: f64,
    /// Registered users.
    pub total_users: usize,
    /// Users with the creator role.
    pub total_creators: usize,
    /// Users with active premium.
    pub premium_users: usize,
    /// Registered videos.
    pub total_videos: usize,
    /// Monetized ad views.
    pub total_ad_views: usize,
}

/// Platform-wide monetization totals.
pub async fn platform_stats(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<Json<PlatformStatsResponse>, ApiError> {
    let store = &state.store;
    let now = Utc::now();

    let sum = |tx_type, status| -> Result<(usize, i64), ApiError> {
        let transactions = store.list_transactions(Some(tx_type), Some(status))?;
        Ok((
            transactions.len(),
            transactions.iter().map(|tx| tx.amount_micros).sum(),
        ))
    };
    let (_, earnings) = sum(TransactionType::Earning, TransactionStatus::Completed)?;
    let (_, withdrawals) = sum(TransactionType::Withdrawal, TransactionStatus::Completed)?;
    let (pending_count, pending) = sum(TransactionType::Withdrawal, TransactionStatus::Pending)?;
    let (_, premium) = sum(
        TransactionType::PremiumSubscription,
        TransactionStatus::Completed,
    )?;

    let videos = store.list_videos()?;
    let ad_revenue: i64 = videos.iter().map(Video::total_revenue_micros).sum();

    let users = store.list_users()?;

    Ok(Json(PlatformStatsResponse {
        total_ad_revenue: micros_to_units(ad_revenue),
        total_earnings: micros_to_units(earnings),
        platform_revenue: micros_to_units(ad_revenue - earnings),
        total_withdrawals: micros_to_units(withdrawals),
        pending_withdrawals: PendingTotals {
            count: pending_count,
            amount: micros_to_units(pending),
        },
        premium_revenue: micros_to_units(premium),
        total_users: users.len(),
        total_creators: users.iter().filter(|u| u.role == Role::Creator).count(),
        premium_users: users.iter().filter(|u| u.has_active_premium(now)).count(),
        total_videos: videos.len(),
        total_ad_views: store.count_ad_views()?,
    }))
}

/// Revenue split recorded on an audit entry.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueBreakdown {
    /// CPM used.
    pub cpm: i64,
    /// Total revenue.
    pub total: f64,
    /// Creator share.
    pub creator: f64,
    /// Platform share.
    pub platform: f64,
}

/// An audit entry as returned to admins.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogResponse {
    /// Entry ID.
    pub id: String,
    /// Event type.
    pub event_type: &'static str,
    /// Initiator.
    pub user_id: String,
    /// Initiator email.
    pub user_email: Option<String>,
    /// Client IP.
    pub ip_address: Option<String>,
    /// Client user agent.
    pub user_agent: Option<String>,
    /// Amount.
    pub amount: f64,
    /// Currency.
    pub currency: String,
    /// Video.
    pub video_id: Option<String>,
    /// Transaction.
    pub transaction_id: Option<String>,
    /// Ad view.
    pub ad_view_id: Option<String>,
    /// Revenue split.
    pub revenue: Option<RevenueBreakdown>,
    /// Outcome.
    pub status: &'static str,
    /// Why it failed.
    pub failure_reason: Option<String>,
    /// Risk score (0-100).
    pub risk_score: u8,
    /// Risk flags.
    pub risk_flags: Vec<String>,
    /// When it happened.
    pub timestamp: String,
    /// Extra context.
    pub metadata: serde_json::Value,
}

impl From<AuditEntry> for AuditLogResponse {
    fn from(entry: AuditEntry) -> Self {
        Self {
            id: entry.id.to_string(),
            event_type: entry.event_type.as_str(),
            user_id: entry.user_id.to_string(),
            user_email: entry.user_email,
            ip_address: entry.ip_address,
            user_agent: entry.user_agent,
            amount: micros_to_units(entry.amount_micros),
            currency: entry.currency,
            video_id: entry.video_id.map(|id| id.to_string()),
            transaction_id: entry.transaction_id.map(|id| id.to_string()),
            ad_view_id: entry.ad_view_id.map(|id| id.to_string()),
            revenue: entry.revenue.map(|split| RevenueBreakdown {
                cpm: split.cpm,
                total: micros_to_units(split.total_micros),
                creator: micros_to_units(split.creator_micros),
                platform: micros_to_units(split.platform_micros),
            }),
            status: entry.status.as_str(),
            failure_reason: entry.failure_reason,
            risk_score: entry.risk_score,
            risk_flags: entry.risk_flags,
            timestamp: entry.timestamp.to_rfc3339(),
            metadata: entry.metadata,
        }
    }
}

/// Audit log query parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogQuery {
    /// Page (1-based, default 1).
    pub page: Option<usize>,
    /// Page size (default 50, max 100).
    pub limit: Option<usize>,
    /// Event type filter.
    pub event_type: Option<String>,
    /// Status filter.
    pub status: Option<String>,
    /// Initiator filter.
    pub user_id: Option<String>,
    /// Earliest timestamp (RFC 3339 or `YYYY-MM-DD`).
    pub start_date: Option<String>,
    /// Latest timestamp (RFC 3339 or `YYYY-MM-DD`, inclusive).
    pub end_date: Option<String>,
}

/// Audit log response.
#[derive(Debug, Serialize)]
pub struct AuditLogsResponse {
    /// Entries, newest first.
    pub logs: Vec<AuditLogResponse>,
    /// Pagination.
    pub pagination: Pagination,
}

/// Parse a snake_case wire name into one of the audit enums.
fn parse_wire_enum<T: DeserializeOwned>(field: &str, value: &str) -> Result<T, ApiError> {
    serde_json::from_value(serde_json::Value::String(value.trim().to_string()))
        .map_err(|_| ApiError::BadRequest(format!("Invalid {field}: {value}")))
}

/// Parse a date bound. Bare dates cover the whole UTC day.
fn parse_date_bound(field: &str, value: &str, end_of_day: bool) -> Result<DateTime<Utc>, ApiError> {
    let value = value.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Ok(timestamp.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("Invalid {field}: {value}")))?;
    let time = if end_of_day {
        NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
    } else {
        Some(NaiveTime::MIN)
    }
    .ok_or_else(|| ApiError::BadRequest(format!("Invalid {field}: {value}")))?;

    Ok(date.and_time(time).and_utc())
}

fn audit_filter(query: &AuditLogQuery) -> Result<AuditFilter, ApiError> {
    Ok(AuditFilter {
        event_type: query
            .event_type
            .as_deref()
            .map(|v| parse_wire_enum("eventType", v))
            .transpose()?,
        status: query
            .status
            .as_deref()
            .map(|v| parse_wire_enum("status", v))
            .transpose()?,
        user_id: query.user_id.as_deref().map(parse_user_id).transpose()?,
        start: query
            .start_date
            .as_deref()
            .map(|v| parse_date_bound("startDate", v, false))
            .transpose()?,
        end: query
            .end_date
            .as_deref()
            .map(|v| parse_date_bound("endDate", v, true))
            .transpose()?,
    })
}

/// Page through the audit log.
pub async fn audit_logs(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(query): Query<AuditLogQuery>,
) -> Result<Json<AuditLogsResponse>, ApiError> {
    let filter = audit_filter(&query)?;
    let (page, limit, offset) = page_window(query.page, query.limit, 50, 100);

    let (entries, total) = state.store.list_audit(&filter, limit, offset)?;

    Ok(Json(AuditLogsResponse {
        logs: entries.into_iter().map(AuditLogResponse::from).collect(),
        pagination: Pagination::new(page, limit, total),
    }))
}

/// Flagged entries response.
#[derive(Debug, Serialize)]
pub struct FlaggedResponse {
    /// Flagged entries, newest first.
    pub flagged: Vec<AuditLogResponse>,
    /// Number returned.
    pub count: usize,
}

/// Recent audit entries flagged for review.
pub async fn flagged_transactions(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<Json<FlaggedResponse>, ApiError> {
    let filter = AuditFilter {
        status: Some(AuditStatus::Flagged),
        ..AuditFilter::default()
    };
    let (entries, _) = state.store.list_audit(&filter, FLAGGED_LIMIT, 0)?;

    let flagged: Vec<_> = entries.into_iter().map(AuditLogResponse::from).collect();
    Ok(Json(FlaggedResponse {
        count: flagged.len(),
        flagged,
    }))
}

/// User list query parameters.
#[derive(Debug, Deserialize)]
pub struct UsersQuery {
    /// Page (1-based, default 1).
    pub page: Option<usize>,
    /// Page size (default 20, max 100).
    pub limit: Option<usize>,
    /// Role filter.
    pub role: Option<String>,
}

/// User list response.
#[derive(Debug, Serialize)]
pub struct UsersResponse {
    /// Users, newest first.
    pub users: Vec<ProfileResponse>,
    /// Pagination.
    pub pagination: Pagination,
}

/// Page through registered users.
pub async fn all_users(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(query): Query<UsersQuery>,
) -> Result<Json<UsersResponse>, ApiError> {
    let role = query
        .role
        .as_deref()
        .map(|r| r.trim().parse::<Role>())
        .transpose()?;
    let (page, limit, offset) = page_window(query.page, query.limit, 20, 100);

    let users: Vec<_> = state
        .store
        .list_users()?
        .into_iter()
        .filter(|u| role.map_or(true, |r| u.role == r))
        .collect();
    let total = users.len();

    Ok(Json(UsersResponse {
        users: users
            .iter()
            .skip(offset)
            .take(limit)
            .map(ProfileResponse::from)
            .collect(),
        pagination: Pagination::new(page, limit, total),
    }))
}

/// Update role request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoleRequest {
    /// User to change.
    pub user_id: String,
    /// New role (`admin`, `creator` or `viewer`).
    pub new_role: String,
}

/// Change a user's role.
pub async fn update_user_role(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Json(body): Json<UpdateRoleRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user_id = parse_user_id(&body.user_id)?;
    let role: Role = body.new_role.trim().parse()?;

    let user = state.store.update_user_role(&user_id, role)?;

    tracing::info!(
        user_id = %user_id,
        admin_id = %admin.user.user_id,
        role = %role,
        "User role updated"
    );

    Ok(Json(ProfileResponse::from(&user)))
}
