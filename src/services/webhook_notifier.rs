// services/webhook_notifier.rs
use chrono::{SecondsFormat, Utc};
use rand::Rng;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::errors::{AppError, Result};
use crate::models::payment::PaymentRecord;

pub const REFERRAL_PREFIX: &str = "GD2025-";
const REFERRAL_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const REFERRAL_SUFFIX_LEN: usize = 4;

/// Flattened summary posted to the downstream webhook after a successful payment.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionNotification {
    pub email: String,
    pub registration_id: String,
    pub phone_number: String,
    pub amount_paid: Value,
    pub mpesa_code: Option<String>,
    pub transaction_timestamp: String,
    pub referral_code: String,
}

impl TransactionNotification {
    pub fn from_record(record: &PaymentRecord, referral_code: String) -> Self {
        TransactionNotification {
            email: record.email.clone(),
            registration_id: record.registration_id.clone(),
            phone_number: record.phone.clone(),
            amount_paid: record.amount.clone(),
            mpesa_code: record.receipt.clone(),
            transaction_timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            referral_code,
        }
    }
}

pub fn generate_referral_code() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..REFERRAL_SUFFIX_LEN)
        .map(|_| REFERRAL_ALPHABET[rng.gen_range(0..REFERRAL_ALPHABET.len())] as char)
        .collect();
    format!("{}{}", REFERRAL_PREFIX, suffix)
}

#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        WebhookNotifier {
            client,
            url: url.into(),
        }
    }

    pub async fn send(&self, notification: &TransactionNotification) -> Result<()> {
        let response = self.client.post(&self.url).json(notification).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::upstream(status.as_u16(), &body));
        }
        Ok(())
    }

    /// Posts on a detached task. Failures are logged and dropped.
    pub fn dispatch(self: &Arc<Self>, notification: TransactionNotification) -> JoinHandle<()> {
        let notifier = Arc::clone(self);
        tokio::spawn(async move {
            match notifier.send(&notification).await {
                Ok(()) => info!(
                    registration_id = %notification.registration_id,
                    "Transaction details sent to webhook"
                ),
                Err(e) => warn!(
                    registration_id = %notification.registration_id,
                    "Failed to send transaction details to webhook: {}",
                    e
                ),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::payment::NewPayment;
    use serde_json::json;

    #[test]
    fn referral_code_shape() {
        for _ in 0..50 {
            let code = generate_referral_code();
            let suffix = code.strip_prefix(REFERRAL_PREFIX).unwrap();
            assert_eq!(suffix.len(), REFERRAL_SUFFIX_LEN);
            assert!(suffix
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()));
        }
    }

    #[test]
    fn notification_is_flattened_from_record() {
        let mut record = PaymentRecord::pending(
            "ws_CO_1",
            NewPayment {
                registration_id: "REG-001".to_string(),
                phone: "0712345678".to_string(),
                email: "jane@example.com".to_string(),
                referral_code: None,
                amount: json!(1500),
            },
        );
        record.receipt = Some("NLJ7RT61SV".to_string());

        let notification = TransactionNotification::from_record(&record, "GD2025-AB12".to_string());
        let body = serde_json::to_value(&notification).unwrap();

        assert_eq!(body["email"], "jane@example.com");
        assert_eq!(body["registration_id"], "REG-001");
        assert_eq!(body["phone_number"], "0712345678");
        assert_eq!(body["amount_paid"], 1500);
        assert_eq!(body["mpesa_code"], "NLJ7RT61SV");
        assert_eq!(body["referral_code"], "GD2025-AB12");
        let timestamp = body["transaction_timestamp"].as_str().unwrap();
        assert!(timestamp.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
        let fraction = timestamp.rsplit('.').next().unwrap();
        assert_eq!(fraction.len(), "000Z".len());
    }

    #[tokio::test]
    async fn dispatch_swallows_connection_errors() {
        let notifier = Arc::new(WebhookNotifier::new(Client::new(), "http://127.0.0.1:9/hook"));
        let record = PaymentRecord::pending(
            "ws_CO_1",
            NewPayment {
                registration_id: "REG".to_string(),
                phone: "0712345678".to_string(),
                email: "a@b.co".to_string(),
                referral_code: None,
                amount: json!(1),
            },
        );
        let handle = notifier.dispatch(TransactionNotification::from_record(&record, generate_referral_code()));
        assert!(handle.await.is_ok());
    }
}
