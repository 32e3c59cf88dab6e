// config.rs
use std::env;

use crate::errors::{AppError, Result};

pub const SANDBOX_BASE_URL: &str = "https://sandbox.safaricom.co.ke";
pub const PRODUCTION_BASE_URL: &str = "https://api.safaricom.co.ke";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub consumer_key: Option<String>,
    pub consumer_secret: Option<String>,
    pub daraja_environment: String,
    /// Replaces the sandbox/production host, e.g. for a staging proxy.
    pub base_url_override: Option<String>,
    pub business_short_code: Option<String>,
    pub passkey: Option<String>,
    pub callback_url: Option<String>,
    pub webhook_url: Option<String>,
    pub static_dir: String,
    pub assets_dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            port: 3000,
            consumer_key: None,
            consumer_secret: None,
            daraja_environment: "sandbox".to_string(),
            base_url_override: None,
            business_short_code: None,
            passkey: None,
            callback_url: None,
            webhook_url: None,
            static_dir: "src/pages".to_string(),
            assets_dir: "public/assets".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = AppConfig::default();

        let port = match get("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| AppError::configuration(format!("PORT must be a number, got {raw}")))?,
            None => defaults.port,
        };

        Ok(AppConfig {
            port,
            consumer_key: get("CONSUMER_KEY"),
            consumer_secret: get("CONSUMER_SECRET"),
            daraja_environment: get("DARAJA_ENV").unwrap_or(defaults.daraja_environment),
            base_url_override: get("DARAJA_BASE_URL"),
            business_short_code: get("BUSINESS_SHORTCODE"),
            passkey: get("LNM_PASSKEY"),
            callback_url: get("CALLBACK_URL"),
            webhook_url: get("MAKE_WEBHOOK_URL"),
            static_dir: get("STATIC_DIR").unwrap_or(defaults.static_dir),
            assets_dir: get("ASSETS_DIR").unwrap_or(defaults.assets_dir),
        })
    }

    pub fn is_production(&self) -> bool {
        self.daraja_environment.eq_ignore_ascii_case("production")
    }

    pub fn base_url(&self) -> &str {
        match &self.base_url_override {
            Some(url) => url.trim_end_matches('/'),
            None if self.is_production() => PRODUCTION_BASE_URL,
            None => SANDBOX_BASE_URL,
        }
    }

    pub fn auth_url(&self) -> String {
        format!("{}/oauth/v1/generate?grant_type=client_credentials", self.base_url())
    }

    pub fn stk_push_url(&self) -> String {
        format!("{}/mpesa/stkpush/v1/processrequest", self.base_url())
    }

    pub fn config_info(&self) -> serde_json::Value {
        serde_json::json!({
            "environment": self.daraja_environment,
            "is_production": self.is_production(),
            "base_url": self.base_url(),
            "business_shortcode": self.business_short_code,
            "callback_url": self.callback_url,
            "consumer_key_set": self.consumer_key.is_some(),
            "consumer_secret_set": self.consumer_secret.is_some(),
            "passkey_set": self.passkey.is_some(),
            "webhook_enabled": self.webhook_url.is_some(),
            "port": self.port,
        })
    }
}
