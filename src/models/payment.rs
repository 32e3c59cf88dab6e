use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

impl PaymentStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

/// One STK push that Daraja accepted, keyed by its `CheckoutRequestID`.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentRecord {
    pub checkout_request_id: String,
    pub status: PaymentStatus,
    pub registration_id: String,
    pub phone: String,
    pub email: String,
    pub referral_code: Option<String>,
    pub amount: Value,
    pub receipt: Option<String>,
    pub raw: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub registration_id: String,
    pub phone: String,
    pub email: String,
    pub referral_code: Option<String>,
    pub amount: Value,
}

impl PaymentRecord {
    pub fn pending(checkout_request_id: impl Into<String>, payment: NewPayment) -> Self {
        let now = Utc::now();
        PaymentRecord {
            checkout_request_id: checkout_request_id.into(),
            status: PaymentStatus::Pending,
            registration_id: payment.registration_id,
            phone: payment.phone,
            email: payment.email,
            referral_code: payment.referral_code,
            amount: payment.amount,
            receipt: None,
            raw: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// What `GET /api/status` exposes.
#[derive(Debug, Serialize)]
pub struct PaymentStatusView {
    pub status: PaymentStatus,
    pub receipt: Option<String>,
    pub raw: Option<Value>,
}

impl From<&PaymentRecord> for PaymentStatusView {
    fn from(record: &PaymentRecord) -> Self {
        PaymentStatusView {
            status: record.status,
            receipt: record.receipt.clone(),
            raw: record.raw.clone(),
        }
    }
}
