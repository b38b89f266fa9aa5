//! Service configuration.

use serde::Deserialize;
use std::path::Path;

use vidpay_core::UserId;

use crate::razorpay::DEFAULT_API_URL;

/// Key IDs shipped in sample env files; treated as unset.
const PLACEHOLDER_KEY_IDS: &[&str] = &["your_razorpay_key_id"];

/// Key secrets shipped in sample env files; treated as unset.
const PLACEHOLDER_KEY_SECRETS: &[&str] = &["your_razorpay_secret_key", "your_razorpay_key_secret"];

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to `RocksDB` data directory (default: "/data/vidpay").
    pub data_dir: String,

    /// HS256 secret for bearer tokens. Without it every authenticated
    /// request is rejected.
    pub auth_secret: Option<String>,

    /// Expected JWT audience, if any.
    pub auth_audience: Option<String>,

    /// Users registered with the admin role.
    pub bootstrap_admins: Vec<UserId>,

    /// Razorpay key ID (optional).
    pub razorpay_key_id: Option<String>,

    /// Razorpay key secret (optional).
    pub razorpay_key_secret: Option<String>,

    /// Razorpay API base URL.
    pub razorpay_api_url: String,

    /// Timeout for payment provider calls in seconds.
    pub payment_timeout_seconds: u64,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// How often stale view sessions are purged, in seconds.
    pub session_gc_interval_seconds: u64,
}

/// Razorpay secrets file structure.
#[derive(Debug, Deserialize)]
struct RazorpaySecrets {
    key_id: String,
    key_secret: String,
    #[serde(default)]
    api_url: Option<String>,
}

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        // Try to load Razorpay secrets from file first, then fall back to env vars
        let (razorpay_key_id, razorpay_key_secret, razorpay_api_url) = load_razorpay_secrets();

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/vidpay".into()),
            auth_secret: std::env::var("AUTH_SECRET")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            auth_audience: std::env::var("AUTH_AUDIENCE")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            bootstrap_admins: parse_admins(&std::env::var("BOOTSTRAP_ADMINS").unwrap_or_default()),
            razorpay_key_id: configured(razorpay_key_id, PLACEHOLDER_KEY_IDS),
            razorpay_key_secret: configured(razorpay_key_secret, PLACEHOLDER_KEY_SECRETS),
            razorpay_api_url: razorpay_api_url.unwrap_or_else(|| DEFAULT_API_URL.into()),
            payment_timeout_seconds: env_number("PAYMENT_TIMEOUT_SECONDS").unwrap_or(10),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: env_number("MAX_BODY_BYTES").unwrap_or(1024 * 1024), // 1MB
            request_timeout_seconds: env_number("REQUEST_TIMEOUT_SECONDS").unwrap_or(30),
            session_gc_interval_seconds: env_number("SESSION_GC_INTERVAL_SECONDS")
                .unwrap_or(3600),
        }
    }

    /// Razorpay key ID and secret, when both are configured.
    #[must_use]
    pub fn razorpay_credentials(&self) -> Option<(&str, &str)> {
        self.razorpay_key_id
            .as_deref()
            .zip(self.razorpay_key_secret.as_deref())
    }

    /// Whether `user_id` is registered with the admin role.
    #[must_use]
    pub fn is_bootstrap_admin(&self, user_id: &UserId) -> bool {
        self.bootstrap_admins.contains(user_id)
    }
}

fn env_number<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

/// Drop blank values and known placeholders.
fn configured(value: Option<String>, placeholders: &[&str]) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !placeholders.contains(&v.as_str()))
}

fn parse_admins(raw: &str) -> Vec<UserId> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse() {
            Ok(id) => Some(id),
            Err(_) => {
                tracing::warn!(value = %s, "Ignoring invalid BOOTSTRAP_ADMINS entry");
                None
            }
        })
        .collect()
}

/// Load Razorpay secrets from file or environment.
fn load_razorpay_secrets() -> (Option<String>, Option<String>, Option<String>) {
    let secret_paths = [
        ".secrets/razorpay.json",
        "vidpay/.secrets/razorpay.json",
        "../.secrets/razorpay.json",
    ];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<RazorpaySecrets>(path) {
            tracing::info!(path = %path, "Loaded Razorpay secrets from file");
            return (
                Some(secrets.key_id),
                Some(secrets.key_secret),
                secrets.api_url,
            );
        }
    }

    // Fall back to environment variables
    tracing::debug!("Razorpay secrets file not found, using environment variables");
    (
        std::env::var("RAZORPAY_KEY_ID").ok(),
        std::env::var("RAZORPAY_KEY_SECRET").ok(),
        std::env::var("RAZORPAY_API_URL").ok(),
    )
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/vidpay".into(),
            auth_secret: None,
            auth_audience: None,
            bootstrap_admins: Vec::new(),
            razorpay_key_id: None,
            razorpay_key_secret: None,
            razorpay_api_url: DEFAULT_API_URL.into(),
            payment_timeout_seconds: 10,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            session_gc_interval_seconds: 3600,
        }
    }
}
