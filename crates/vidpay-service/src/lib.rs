//! Vidpay HTTP API Service.
//!
//! This crate provides the HTTP API for video monetization, including:
//!
//! - Ad view sessions and monetized ad view recording
//! - Creator dashboards, watch time and CPM settings
//! - Wallets, withdrawals and admin approval
//! - Premium subscriptions paid through Razorpay
//! - Admin reporting over the audit log
//!
//! # Authentication
//!
//! Every endpoint except health, premium plans and payment config requires an
//! HS256 bearer token whose `sub` claim is the user ID. Creator and admin
//! endpoints additionally check the stored profile's role.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)]

pub mod auth;
pub mod config;
pub mod context;
pub mod crypto;
pub mod error;
pub mod gc;
pub mod handlers;
pub mod payments;
pub mod razorpay;
pub mod routes;
pub mod state;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use payments::{OrderRequest, PaymentError, PaymentProvider, ProviderOrder, ProviderPayment};
pub use razorpay::RazorpayClient;
pub use routes::create_router;
pub use state::AppState;
