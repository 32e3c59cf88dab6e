// services/token_cache.rs
use base64::{engine::general_purpose::STANDARD as base64, Engine as _};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::{header, Client};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::errors::{AppError, Result};

pub const TOKEN_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// A token this close to expiry is treated as already expired.
pub const EXPIRY_SAFETY_MARGIN_SECS: i64 = 5;
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

#[derive(Debug, Deserialize)]
struct AuthResponse {
    #[serde(alias = "accessToken", default)]
    access_token: Option<String>,
    #[serde(alias = "expiresIn", default)]
    expires_in: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + ChronoDuration::seconds(EXPIRY_SAFETY_MARGIN_SECS) < self.expires_at
    }
}

/// Single-slot cache for the Daraja OAuth bearer token.
///
/// The lock is held for the whole refresh, so callers arriving mid-refresh
/// wait for it instead of issuing their own request.
pub struct TokenCache {
    client: Client,
    auth_url: String,
    consumer_key: Option<String>,
    consumer_secret: Option<String>,
    cached: Mutex<Option<AccessToken>>,
}

impl TokenCache {
    pub fn new(
        client: Client,
        auth_url: String,
        consumer_key: Option<String>,
        consumer_secret: Option<String>,
    ) -> Self {
        TokenCache {
            client,
            auth_url,
            consumer_key,
            consumer_secret,
            cached: Mutex::new(None),
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.consumer_key.is_some() && self.consumer_secret.is_some()
    }

    pub async fn get_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.is_fresh(Utc::now()) {
                debug!("Using cached access token");
                return Ok(token.value.clone());
            }
        }

        let token = self.fetch_token().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    pub async fn cached_token(&self) -> Option<AccessToken> {
        self.cached.lock().await.clone()
    }

    async fn fetch_token(&self) -> Result<AccessToken> {
        let (Some(key), Some(secret)) = (&self.consumer_key, &self.consumer_secret) else {
            return Err(AppError::configuration("Missing Daraja consumer credentials"));
        };

        info!("Requesting new access token");
        let encoded_auth = base64.encode(format!("{}:{}", key, secret));

        let response = self
            .client
            .get(&self.auth_url)
            .header(header::AUTHORIZATION, format!("Basic {}", encoded_auth))
            .header(header::ACCEPT, "application/json")
            .timeout(TOKEN_REQUEST_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Failed to get access token: {} - {}", status, body);
            return Err(AppError::upstream(status.as_u16(), &body));
        }

        let auth_response: AuthResponse = response
            .json()
            .await
            .map_err(|e| AppError::malformed(format!("invalid token response: {}", e)))?;

        let value = auth_response
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::malformed("No access_token returned by Daraja"))?;
        let expires_in = parse_expires_in(auth_response.expires_in.as_ref());

        info!(expires_in, "Access token obtained");
        Ok(AccessToken {
            value,
            expires_at: Utc::now() + ChronoDuration::seconds(expires_in),
        })
    }
}

/// Daraja sends `expires_in` as a string (`"3599"`); numbers are accepted too.
fn parse_expires_in(raw: Option<&Value>) -> i64 {
    let parsed = match raw {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.filter(|secs| *secs > 0).unwrap_or(DEFAULT_EXPIRES_IN_SECS)
}
