//! Common test utilities for vidpay integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum_test::TestServer;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;
use tempfile::TempDir;

use vidpay_core::{BankDetails, Role, User, UserId, Video, VideoUpload};
use vidpay_service::auth::JwtClaims;
use vidpay_service::crypto::{payment_signature, verify_payment_signature};
use vidpay_service::{
    create_router, AppState, OrderRequest, PaymentError, PaymentProvider, ProviderOrder,
    ProviderPayment, ServiceConfig,
};
use vidpay_store::{RocksStore, Store};

/// Secret the test tokens are signed with.
pub const AUTH_SECRET: &str = "test-secret";

/// Secret the fake payment provider signs checkouts with.
pub const PAYMENT_SECRET: &str = "fake_secret";

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Direct store access for seeding and assertions.
    pub store: Arc<RocksStore>,
    /// Fake payment provider, when payments are enabled.
    pub payments: Option<Arc<FakePaymentProvider>>,
    /// Temporary directory for the database (kept alive for test duration).
    pub _temp_dir: TempDir,
}

impl TestHarness {
    /// Harness without a payment provider.
    pub fn new() -> Self {
        Self::build(false)
    }

    /// Harness with the fake payment provider wired in.
    pub fn with_payments() -> Self {
        Self::build(true)
    }

    fn build(payments_enabled: bool) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = Arc::new(RocksStore::open(temp_dir.path()).expect("Failed to open store"));

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            data_dir: temp_dir.path().to_string_lossy().to_string(),
            auth_secret: Some(AUTH_SECRET.into()),
            ..ServiceConfig::default()
        };

        let mut state = AppState::new(Arc::clone(&store), config);
        let payments = payments_enabled.then(|| Arc::new(FakePaymentProvider::default()));
        if let Some(provider) = &payments {
            state = state.with_payments(Arc::clone(provider) as Arc<dyn PaymentProvider>);
        }

        let router: Router = create_router(state);
        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            store,
            payments,
            _temp_dir: temp_dir,
        }
    }

    /// Bearer header for a user.
    pub fn auth_header(user_id: UserId) -> String {
        format!("Bearer {}", token_for(user_id))
    }

    /// Register a viewer through the API.
    pub async fn register_viewer(&self) -> UserId {
        let user_id = UserId::generate();
        self.server
            .post("/v1/accounts")
            .add_header("authorization", Self::auth_header(user_id))
            .json(&json!({ "name": "Viewer", "email": "viewer@example.com" }))
            .await
            .assert_status_ok();
        user_id
    }

    /// Seed a user directly in the store.
    pub fn seed_user(&self, configure: impl FnOnce(&mut User)) -> UserId {
        let mut user = User::new(UserId::generate());
        user.email = Some(format!("{}@example.com", user.user_id));
        configure(&mut user);
        self.store.create_user(&user).expect("Failed to seed user");
        user.user_id
    }

    /// Seed a creator whose channel is monetized.
    pub fn seed_creator(&self) -> UserId {
        self.seed_user(monetized_channel)
    }

    /// Seed an admin.
    pub fn seed_admin(&self) -> UserId {
        self.seed_user(|u| u.role = Role::Admin)
    }

    /// Seed a creator with a balance and bank details, ready to withdraw.
    pub fn seed_payable_creator(&self, balance_micros: i64) -> UserId {
        self.seed_user(|u| {
            monetized_channel(u);
            u.bank_details = Some(test_bank_details());
            u.wallet_balance_micros = balance_micros;
            u.total_earnings_micros = balance_micros;
        })
    }

    /// Current stored profile.
    pub fn user(&self, user_id: UserId) -> User {
        self.store
            .get_user(&user_id)
            .expect("Failed to read user")
            .expect("user exists")
    }

    /// Seed a video owned by `creator`.
    pub fn seed_video(&self, creator: UserId, monetized: bool) -> Video {
        let video = Video::new(creator, VideoUpload::new("Test Video", None, 120), monetized);
        self.store.create_video(&video).expect("Failed to seed video");
        video
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Creator role with a channel that passed the gate and has monetization on.
pub fn monetized_channel(user: &mut User) {
    user.role = Role::Creator;
    user.has_channel = true;
    user.channel_name = Some("Test Channel".into());
    user.channel_stats.subscriber_count = 1500;
    user.channel_stats.total_watch_hours = 5000.0;
    user.channel_stats.meets_monetization_requirements = true;
    user.channel_stats.monetization_enabled_date = Some(chrono::Utc::now());
}

/// Mint a valid HS256 token for a user.
pub fn token_for(user_id: UserId) -> String {
    let claims = JwtClaims {
        sub: user_id.to_string(),
        exp: chrono::Utc::now().timestamp() + 3600,
        aud: None,
        iat: None,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(AUTH_SECRET.as_bytes()),
    )
    .expect("Failed to sign token")
}

/// Valid bank details.
pub fn test_bank_details() -> BankDetails {
    BankDetails::new("123456789012", "Test Creator", "HDFC0001234", "HDFC Bank")
        .expect("valid bank details")
}

/// In-memory payment provider.
#[derive(Default)]
pub struct FakePaymentProvider {
    next_order: AtomicUsize,
    unreachable: AtomicBool,
    payments: Mutex<HashMap<String, ProviderPayment>>,
    orders: Mutex<Vec<OrderRequest>>,
}

impl FakePaymentProvider {
    /// Register a payment the provider will report.
    pub fn add_payment(&self, payment_id: &str, order_id: &str, amount_minor: i64, status: &str) {
        self.payments.lock().unwrap().insert(
            payment_id.to_string(),
            ProviderPayment {
                id: payment_id.to_string(),
                order_id: Some(order_id.to_string()),
                amount_minor,
                currency: "INR".into(),
                status: status.into(),
            },
        );
    }

    /// Orders created so far.
    pub fn orders(&self) -> Vec<OrderRequest> {
        self.orders.lock().unwrap().clone()
    }

    /// Make every payment lookup fail as if the provider were down.
    pub fn go_offline(&self) {
        self.unreachable.store(true, Ordering::SeqCst);
    }

    /// Signature the checkout widget would produce.
    pub fn sign(order_id: &str, payment_id: &str) -> String {
        payment_signature(PAYMENT_SECRET, order_id, payment_id)
    }
}

#[async_trait]
impl PaymentProvider for FakePaymentProvider {
    fn key_id(&self) -> &str {
        "rzp_test_fake"
    }

    async fn create_order(&self, request: &OrderRequest) -> Result<ProviderOrder, PaymentError> {
        let n = self.next_order.fetch_add(1, Ordering::SeqCst) + 1;
        self.orders.lock().unwrap().push(request.clone());
        Ok(ProviderOrder {
            id: format!("order_{n}"),
            amount_minor: request.amount_minor,
            currency: request.currency.clone(),
        })
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<ProviderPayment, PaymentError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(PaymentError::Api {
                code: "unknown".into(),
                description: "HTTP 503 Service Unavailable: upstream connect error".into(),
            });
        }
        self.payments
            .lock()
            .unwrap()
            .get(payment_id)
            .cloned()
            .ok_or_else(|| PaymentError::Api {
                code: "BAD_REQUEST_ERROR".into(),
                description: "The id provided does not exist".into(),
            })
    }

    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        verify_payment_signature(PAYMENT_SECRET, order_id, payment_id, signature)
    }
}
