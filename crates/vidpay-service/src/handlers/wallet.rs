//! Wallet handlers: withdrawals and payout bank details.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use vidpay_core::{
    micros_to_units, units_to_micros, AuditEntry, AuditEventType, AuditStatus, BankDetails,
    Transaction, TransactionType, User,
};
use vidpay_store::{ClientInfo, Store, StoreError, WithdrawalRequest};

use super::page_window;
use crate::auth::CreatorUser;
use crate::context::RequestContext;
use crate::error::ApiError;
use crate::state::AppState;

/// Bank details with the account number masked.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskedBankDetails {
    /// Masked account number.
    pub account_number: String,
    /// Name on the account.
    pub account_holder_name: String,
    /// IFSC code.
    pub ifsc_code: String,
    /// Bank name.
    pub bank_name: String,
}

impl From<&BankDetails> for MaskedBankDetails {
    fn from(details: &BankDetails) -> Self {
        Self {
            account_number: details.masked_account_number(),
            account_holder_name: details.account_holder_name.clone(),
            ifsc_code: details.ifsc_code.clone(),
            bank_name: details.bank_name.clone(),
        }
    }
}

/// A withdrawal as returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalResponse {
    /// Transaction ID.
    pub transaction_id: String,
    /// Amount.
    pub amount: f64,
    /// Status.
    pub status: String,
    /// Destination account.
    pub bank_details: Option<MaskedBankDetails>,
    /// Bank reference assigned at request time.
    pub bank_reference: Option<String>,
    /// Payout reference assigned on approval.
    pub payout_reference: Option<String>,
    /// Rejection reason.
    pub failure_reason: Option<String>,
    /// Deciding admin.
    pub approved_by: Option<String>,
    /// Decision time.
    pub approved_at: Option<String>,
    /// Request time.
    pub created_at: String,
}

impl From<&Transaction> for WithdrawalResponse {
    fn from(tx: &Transaction) -> Self {
        let details = tx.withdrawal.as_ref();
        Self {
            transaction_id: tx.id.to_string(),
            amount: micros_to_units(tx.amount_micros),
            status: tx.status.as_str().to_string(),
            bank_details: details.map(|d| MaskedBankDetails::from(&d.bank_details)),
            bank_reference: details.map(|d| d.bank_reference.clone()),
            payout_reference: details.and_then(|d| d.payout_reference.clone()),
            failure_reason: details.and_then(|d| d.failure_reason.clone()),
            approved_by: tx.approved_by.map(|id| id.to_string()),
            approved_at: tx.approved_at.map(|d| d.to_rfc3339()),
            created_at: tx.created_at.to_rfc3339(),
        }
    }
}

/// Withdraw request.
#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    /// Amount in currency units.
    pub amount: f64,
}

/// Withdraw response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawResponse {
    /// Pending withdrawal transaction.
    pub transaction_id: String,
    /// Amount debited.
    pub amount: f64,
    /// Transaction status.
    pub status: String,
    /// Wallet balance after the debit.
    pub remaining_balance: f64,
}

/// Request a payout. The wallet is debited immediately; an admin approves
/// or rejects (refunds) later. Rejected requests are audited.
pub async fn withdraw(
    State(state): State<Arc<AppState>>,
    creator: CreatorUser,
    context: RequestContext,
    Json(body): Json<WithdrawRequest>,
) -> Result<Json<WithdrawResponse>, ApiError> {
    let user = &creator.user;
    let amount_micros = units_to_micros(body.amount)?;
    if amount_micros <= 0 {
        return Err(ApiError::BadRequest("Amount must be positive".into()));
    }

    let request = WithdrawalRequest {
        user_id: user.user_id,
        amount_micros,
        client: context.client,
        idempotency_key: context.idempotency_key,
        now: Utc::now(),
    };
    let receipt = match state.store.request_withdrawal(&request) {
        Ok(receipt) => receipt,
        Err(e) => {
            if is_rejection(&e) {
                tracing::warn!(
                    user_id = %user.user_id,
                    amount_micros,
                    error = %e,
                    "Withdrawal rejected"
                );
                audit_rejected_withdrawal(&state, user, amount_micros, &request.client, &e);
            }
            return Err(e.into());
        }
    };

    let tx = &receipt.transaction;
    tracing::info!(
        user_id = %user.user_id,
        transaction_id = %tx.id,
        amount_micros,
        remaining_micros = receipt.remaining_balance_micros,
        "Withdrawal requested"
    );

    Ok(Json(WithdrawResponse {
        transaction_id: tx.id.to_string(),
        amount: micros_to_units(tx.amount_micros),
        status: tx.status.as_str().to_string(),
        remaining_balance: micros_to_units(receipt.remaining_balance_micros),
    }))
}

/// Whether a store error is a refused request rather than a storage fault.
fn is_rejection(err: &StoreError) -> bool {
    matches!(
        err,
        StoreError::Domain(_)
            | StoreError::InsufficientBalance { .. }
            | StoreError::DuplicateRequest { .. }
    )
}

/// Append the audit entry for a refused withdrawal. Failures are logged only.
fn audit_rejected_withdrawal(
    state: &AppState,
    user: &User,
    amount_micros: i64,
    client: &ClientInfo,
    err: &StoreError,
) {
    let entry = AuditEntry::new(
        AuditEventType::Withdrawal,
        user.user_id,
        AuditStatus::Failed,
        Utc::now(),
    )
    .with_email(user.email.clone())
    .with_client(client.ip_address.clone(), client.user_agent.clone())
    .with_amount(amount_micros)
    .with_failure(err.to_string());

    if let Err(e) = state.store.append_audit(&entry) {
        tracing::error!(error = %e, user_id = %user.user_id, "Failed to audit rejected withdrawal");
    }
}

/// History query parameters.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Page (1-based, default 1).
    pub page: Option<usize>,
    /// Page size (default 20, max 100).
    pub limit: Option<usize>,
}

/// Withdrawal history response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalHistoryResponse {
    /// Withdrawals, newest first.
    pub withdrawals: Vec<WithdrawalResponse>,
    /// Page returned.
    pub page: usize,
    /// Page size.
    pub limit: usize,
    /// Whether more pages follow.
    pub has_more: bool,
}

/// The caller's withdrawals.
pub async fn withdrawal_history(
    State(state): State<Arc<AppState>>,
    creator: CreatorUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<WithdrawalHistoryResponse>, ApiError> {
    let (page, limit, offset) = page_window(query.page, query.limit, 20, 100);

    // Fetch one more than requested to determine has_more
    let transactions = state.store.list_transactions_by_user(
        &creator.user.user_id,
        Some(TransactionType::Withdrawal),
        limit + 1,
        offset,
    )?;

    let has_more = transactions.len() > limit;
    let withdrawals = transactions
        .iter()
        .take(limit)
        .map(WithdrawalResponse::from)
        .collect();

    Ok(Json(WithdrawalHistoryResponse {
        withdrawals,
        page,
        limit,
        has_more,
    }))
}

/// Update bank details request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBankDetailsRequest {
    /// Account number.
    #[serde(default)]
    pub account_number: String,
    /// Name on the account.
    #[serde(default)]
    pub account_holder_name: String,
    /// IFSC code.
    #[serde(default)]
    pub ifsc_code: String,
    /// Bank name.
    #[serde(default)]
    pub bank_name: String,
}

/// Update bank details response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBankDetailsResponse {
    /// Stored details, masked.
    pub bank_details: MaskedBankDetails,
}

/// Replace the caller's payout bank account.
pub async fn update_bank_details(
    State(state): State<Arc<AppState>>,
    creator: CreatorUser,
    Json(body): Json<UpdateBankDetailsRequest>,
) -> Result<Json<UpdateBankDetailsResponse>, ApiError> {
    let details = BankDetails::new(
        &body.account_number,
        &body.account_holder_name,
        &body.ifsc_code,
        &body.bank_name,
    )?;
    let masked = MaskedBankDetails::from(&details);

    let user_id = creator.user.user_id;
    state.store.update_bank_details(&user_id, details)?;

    tracing::info!(user_id = %user_id, "Bank details updated");

    Ok(Json(UpdateBankDetailsResponse {
        bank_details: masked,
    }))
}
