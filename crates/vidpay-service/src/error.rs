//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use vidpay_core::{micros_to_units, AdViewRejection, MonetizationError};
use vidpay_store::StoreError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Forbidden - valid credentials but insufficient permissions.
    #[error("forbidden")]
    Forbidden,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Input failed a domain rule.
    #[error("{message}")]
    Validation {
        /// Machine-readable code.
        code: &'static str,
        /// Human-readable message.
        message: String,
        /// Extra context for the client.
        details: Option<serde_json::Value>,
    },

    /// Conflict - resource already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The current state does not allow the operation.
    #[error("{message}")]
    InvalidState {
        /// Machine-readable code.
        code: &'static str,
        /// Human-readable message.
        message: String,
        /// Extra context for the client.
        details: Option<serde_json::Value>,
    },

    /// Wallet balance too low.
    #[error("insufficient balance: balance={balance}, required={required}")]
    InsufficientBalance {
        /// Current balance in micros.
        balance: i64,
        /// Required amount in micros.
        required: i64,
    },

    /// Replayed request (idempotency).
    #[error("duplicate request: {0}")]
    DuplicateRequest(String),

    /// Ad view not eligible for monetization.
    #[error("ad view rejected: {0}")]
    AdViewRejected(AdViewRejection),

    /// Payment provider not configured.
    #[error("payment system not configured")]
    PaymentsNotConfigured,

    /// Payment could not be verified.
    #[error("payment verification failed: {0}")]
    PaymentVerification(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// External service error.
    #[error("external service error: {0}")]
    ExternalService(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "unauthorized".to_string(),
                None,
            ),
            Self::Forbidden => (
                StatusCode::FORBIDDEN,
                "forbidden",
                "forbidden".to_string(),
                None,
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            Self::Validation {
                code,
                message,
                details,
            } => (StatusCode::BAD_REQUEST, code, message, details),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            Self::InvalidState {
                code,
                message,
                details,
            } => (StatusCode::CONFLICT, code, message, details),
            Self::InsufficientBalance { balance, required } => (
                StatusCode::CONFLICT,
                "insufficient_balance",
                "Insufficient balance".to_string(),
                Some(serde_json::json!({
                    "balance": micros_to_units(balance),
                    "required": micros_to_units(required)
                })),
            ),
            Self::DuplicateRequest(id) => (
                StatusCode::CONFLICT,
                "duplicate_request",
                format!("Request {id} already processed"),
                None,
            ),
            Self::AdViewRejected(rejection) => {
                let details = match rejection {
                    AdViewRejection::CooldownActive { retry_after } => {
                        Some(serde_json::json!({ "retryAfter": retry_after }))
                    }
                    _ => None,
                };
                (
                    StatusCode::CONFLICT,
                    rejection.code(),
                    rejection.message().to_string(),
                    details,
                )
            }
            Self::PaymentsNotConfigured => (
                StatusCode::SERVICE_UNAVAILABLE,
                "payments_not_configured",
                "Payment system not configured. Please contact admin.".to_string(),
                None,
            ),
            Self::PaymentVerification(msg) => (
                StatusCode::BAD_REQUEST,
                "payment_verification_failed",
                msg,
                None,
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            Self::ExternalService(msg) => (
                StatusCode::BAD_GATEWAY,
                "external_service_error",
                msg,
                None,
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<MonetizationError> for ApiError {
    fn from(err: MonetizationError) -> Self {
        let message = err.to_string();
        match err {
            MonetizationError::InvalidCpm { min, max, .. } => Self::Validation {
                code: "invalid_cpm",
                message: format!("CPM must be between {min} and {max}"),
                details: Some(serde_json::json!({ "min": min, "max": max })),
            },
            MonetizationError::InvalidAmount(msg) => Self::BadRequest(msg),
            MonetizationError::BelowMinimumWithdrawal { minimum_units } => Self::Validation {
                code: "below_minimum_withdrawal",
                message: format!("Minimum withdrawal amount is {minimum_units}"),
                details: Some(serde_json::json!({ "minimumAmount": minimum_units })),
            },
            MonetizationError::MissingBankDetails => Self::Validation {
                code: "missing_bank_details",
                message: "Please add bank details first".into(),
                details: None,
            },
            MonetizationError::InvalidBankDetails(msg) => Self::Validation {
                code: "invalid_bank_details",
                message: msg,
                details: None,
            },
            MonetizationError::InvalidTransactionState { .. } => Self::InvalidState {
                code: "invalid_transaction_state",
                message: "Transaction is not a pending withdrawal".into(),
                details: None,
            },
            MonetizationError::MonetizationRequirementsNotMet {
                required_subscribers,
                required_watch_hours,
                current_subscribers,
                current_watch_hours,
            } => Self::InvalidState {
                code: "requirements_not_met",
                message,
                details: Some(serde_json::json!({
                    "requiredSubscribers": required_subscribers,
                    "requiredWatchHours": required_watch_hours,
                    "currentSubscribers": current_subscribers,
                    "currentWatchHours": current_watch_hours,
                })),
            },
            MonetizationError::UnknownPlan(_) => Self::Validation {
                code: "invalid_plan",
                message: "Invalid premium plan selected".into(),
                details: None,
            },
            MonetizationError::InvalidRole(_) => Self::Validation {
                code: "invalid_role",
                message,
                details: Some(serde_json::json!({ "allowed": ["admin", "creator", "viewer"] })),
            },
            MonetizationError::InvalidId(_) => Self::BadRequest(message),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => Self::NotFound(format!("{entity} not found: {id}")),
            StoreError::AlreadyExists { entity, id } => {
                Self::Conflict(format!("{entity} already exists: {id}"))
            }
            StoreError::InsufficientBalance { balance, required } => {
                Self::InsufficientBalance { balance, required }
            }
            StoreError::DuplicateRequest { request_id } => Self::DuplicateRequest(request_id),
            StoreError::AdViewRejected(rejection) => Self::AdViewRejected(rejection),
            StoreError::Domain(err) => err.into(),
            StoreError::Database(msg) | StoreError::Serialization(msg) => Self::Internal(msg),
        }
    }
}
