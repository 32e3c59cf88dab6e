// services/mpesa_service.rs
use base64::{engine::general_purpose::STANDARD as base64, Engine as _};
use chrono::{DateTime, Local, Utc};
use reqwest::{header, Client};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::services::phone::format_phone_number;
use crate::services::token_cache::TokenCache;

pub const TRANSACTION_TYPE: &str = "CustomerPayBillOnline";
pub const TRANSACTION_DESC: &str = "TriCre8 Bootcamp payment";
pub const STK_PUSH_TIMEOUT: Duration = Duration::from_secs(15);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
pub struct StkPushRequest {
    #[serde(rename = "BusinessShortCode")]
    pub business_short_code: String,
    #[serde(rename = "Password")]
    pub password: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "TransactionType")]
    pub transaction_type: String,
    #[serde(rename = "Amount", skip_serializing_if = "Value::is_null")]
    pub amount: Value,
    #[serde(rename = "PartyA")]
    pub party_a: String,
    #[serde(rename = "PartyB")]
    pub party_b: String,
    #[serde(rename = "PhoneNumber")]
    pub phone_number: String,
    #[serde(rename = "CallBackURL")]
    pub callback_url: String,
    #[serde(rename = "AccountReference")]
    pub account_reference: String,
    #[serde(rename = "TransactionDesc")]
    pub transaction_desc: String,
}

#[derive(Debug, Clone)]
pub struct StkPushAccepted {
    pub checkout_request_id: String,
    pub raw: Value,
}

struct Merchant<'a> {
    short_code: &'a str,
    passkey: &'a str,
    callback_url: &'a str,
}

pub struct MpesaService {
    config: Arc<AppConfig>,
    client: Client,
    token_cache: TokenCache,
}

impl MpesaService {
    pub fn new(config: Arc<AppConfig>) -> Result<Self> {
        let client = Client::builder().timeout(CLIENT_TIMEOUT).build()?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: Arc<AppConfig>, client: Client) -> Self {
        let token_cache = TokenCache::new(
            client.clone(),
            config.auth_url(),
            config.consumer_key.clone(),
            config.consumer_secret.clone(),
        );
        MpesaService {
            config,
            client,
            token_cache,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn token_cache(&self) -> &TokenCache {
        &self.token_cache
    }

    pub async fn get_access_token(&self) -> Result<String> {
        self.token_cache.get_token().await
    }

    fn merchant(&self) -> Result<Merchant<'_>> {
        let missing = |name: &str| AppError::configuration(format!("{name} is not configured"));
        Ok(Merchant {
            short_code: self
                .config
                .business_short_code
                .as_deref()
                .ok_or_else(|| missing("BUSINESS_SHORTCODE"))?,
            passkey: self
                .config
                .passkey
                .as_deref()
                .ok_or_else(|| missing("LNM_PASSKEY"))?,
            callback_url: self
                .config
                .callback_url
                .as_deref()
                .ok_or_else(|| missing("CALLBACK_URL"))?,
        })
    }

    /// Sends the STK push prompt. Merchant settings are checked before the
    /// token is requested, so a misconfigured service makes no network calls.
    pub async fn initiate_stk_push(
        &self,
        phone: &str,
        amount: &Value,
        account_reference: &str,
    ) -> Result<StkPushAccepted> {
        let merchant = self.merchant()?;
        let access_token = self.get_access_token().await?;

        let timestamp = stk_timestamp(&Local::now());
        let stk_request = build_stk_request(&merchant, phone, amount, account_reference, timestamp);
        info!(
            account_reference,
            phone = %stk_request.phone_number,
            "Sending STK push"
        );

        let response = self
            .client
            .post(self.config.stk_push_url())
            .header(header::AUTHORIZATION, format!("Bearer {}", access_token))
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "application/json")
            .timeout(STK_PUSH_TIMEOUT)
            .json(&stk_request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!("STK push failed: {} - {}", status, body);
            return Err(AppError::upstream(status.as_u16(), &body));
        }

        let raw: Value = serde_json::from_str(&body)
            .map_err(|e| AppError::malformed(format!("invalid STK push response: {}", e)))?;

        if raw.get("errorCode").is_some_and(|code| !code.is_null()) {
            error!("Daraja error in STK push response: {}", raw);
            return Err(AppError::ProviderRejected(raw));
        }

        let checkout_request_id = extract_checkout_request_id(&raw).unwrap_or_else(|| {
            let synthesized = format!("ck_{}", Utc::now().timestamp_millis());
            warn!(%synthesized, "Daraja response had no CheckoutRequestID");
            synthesized
        });

        info!(%checkout_request_id, "STK push accepted");
        Ok(StkPushAccepted {
            checkout_request_id,
            raw,
        })
    }
}

fn build_stk_request(
    merchant: &Merchant<'_>,
    phone: &str,
    amount: &Value,
    account_reference: &str,
    timestamp: String,
) -> StkPushRequest {
    let formatted_phone = format_phone_number(phone);
    StkPushRequest {
        business_short_code: merchant.short_code.to_string(),
        password: generate_password(merchant.short_code, merchant.passkey, &timestamp),
        timestamp,
        transaction_type: TRANSACTION_TYPE.to_string(),
        amount: amount.clone(),
        party_a: formatted_phone.clone(),
        party_b: merchant.short_code.to_string(),
        phone_number: formatted_phone,
        callback_url: merchant.callback_url.to_string(),
        account_reference: account_reference.to_string(),
        transaction_desc: TRANSACTION_DESC.to_string(),
    }
}

/// `base64(shortcode + passkey + timestamp)`
pub fn generate_password(short_code: &str, passkey: &str, timestamp: &str) -> String {
    base64.encode(format!("{}{}{}", short_code, passkey, timestamp))
}

/// `YYYYMMDDHHmmss` in local time.
pub fn stk_timestamp(now: &DateTime<Local>) -> String {
    now.format("%Y%m%d%H%M%S").to_string()
}

fn extract_checkout_request_id(raw: &Value) -> Option<String> {
    ["CheckoutRequestID", "checkoutRequestID"]
        .iter()
        .filter_map(|key| raw.get(*key).and_then(Value::as_str))
        .find(|id| !id.is_empty())
        .map(str::to_string)
}
