//! Razorpay integration for premium payments.
//!
//! Razorpay handles:
//! - Order creation for premium plans
//! - Payment lookup for capture status and amount
//! - Checkout signatures (verified locally with the key secret)

pub mod client;
pub mod types;

pub use client::{RazorpayClient, DEFAULT_API_URL};
pub use types::*;
