//! Provider options, loaded from the host application's TOML wiring.
//!
//! ```toml
//! [provider]
//! id = "paybridge"
//! api_key = "sk_test_..."
//! capture = false
//! webhook_secret = "whsec_..."
//! ```
//!
//! `PAYBRIDGE_API_KEY` and `PAYBRIDGE_WEBHOOK_SECRET` override the file.

use crate::error::{PaymentError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use url::Url;

pub const DEFAULT_PROVIDER_ID: &str = "paybridge";
pub const DEFAULT_BASE_URL: &str = "https://api.vendor.example";
pub const API_KEY_ENV: &str = "PAYBRIDGE_API_KEY";
pub const WEBHOOK_SECRET_ENV: &str = "PAYBRIDGE_WEBHOOK_SECRET";

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderOptions {
    /// Identifier the host registers the provider under.
    pub id: String,
    pub api_key: String,
    pub base_url: String,
    /// Capture immediately on authorization instead of holding funds.
    pub capture: bool,
    /// Webhook signing secret. Without one, webhooks are decoded unverified.
    pub webhook_secret: Option<String>,
    pub webhook_tolerance_secs: u64,
    pub timeout_secs: u64,
    /// Description attached to every intent.
    pub payment_description: Option<String>,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            id: DEFAULT_PROVIDER_ID.to_string(),
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            capture: false,
            webhook_secret: None,
            webhook_tolerance_secs: 300,
            timeout_secs: 30,
            payment_description: None,
        }
    }
}

// Secrets stay out of logs.
impl fmt::Debug for ProviderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderOptions")
            .field("id", &self.id)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("capture", &self.capture)
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("webhook_tolerance_secs", &self.webhook_tolerance_secs)
            .field("timeout_secs", &self.timeout_secs)
            .field("payment_description", &self.payment_description)
            .finish()
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    provider: ProviderOptions,
}

impl ProviderOptions {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Parses the `[provider]` table without touching the environment.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents)?;
        Ok(file.provider)
    }

    /// Reads the config file, applies environment overrides, and validates.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut options = Self::from_toml_str(&contents)?;
        options.apply_overrides(|key| std::env::var(key).ok());
        options.validate()?;
        Ok(options)
    }

    /// Options built from the environment alone, for running without a file.
    pub fn from_env() -> Result<Self> {
        let mut options = Self::default();
        options.apply_overrides(|key| std::env::var(key).ok());
        options.validate()?;
        Ok(options)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(API_KEY_ENV).filter(|v| !v.is_empty()) {
            self.api_key = key;
        }
        if let Some(secret) = lookup(WEBHOOK_SECRET_ENV).filter(|v| !v.is_empty()) {
            self.webhook_secret = Some(secret);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(PaymentError::ConfigError(
                "provider id must not be empty".to_string(),
            ));
        }
        if self.api_key.trim().is_empty() {
            return Err(PaymentError::ConfigError(format!(
                "missing api_key (set {})",
                API_KEY_ENV
            )));
        }
        self.base_url()?;
        if self.timeout_secs == 0 {
            return Err(PaymentError::ConfigError(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&self.base_url).map_err(|e| {
            PaymentError::ConfigError(format!("invalid base_url '{}': {}", self.base_url, e))
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn webhook_tolerance(&self) -> Duration {
        Duration::from_secs(self.webhook_tolerance_secs)
    }
}
