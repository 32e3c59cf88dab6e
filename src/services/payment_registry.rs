// services/payment_registry.rs
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::models::payment::{PaymentRecord, PaymentStatus};

/// Provider-confirmed values carried by a successful callback.
#[derive(Debug, Clone, Default)]
pub struct ConfirmedPayment {
    pub receipt: Option<String>,
    pub amount: Option<Value>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Transition {
    Applied(PaymentRecord),
    UnknownRequest,
    AlreadySettled(PaymentStatus),
}

/// In-memory map of checkout request id to payment. Lives for the process.
#[derive(Debug, Default)]
pub struct PaymentRegistry {
    payments: RwLock<HashMap<String, PaymentRecord>>,
}

impl PaymentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last write wins if the provider ever reuses an id.
    pub async fn insert_pending(&self, record: PaymentRecord) {
        self.payments
            .write()
            .await
            .insert(record.checkout_request_id.clone(), record);
    }

    pub async fn get(&self, checkout_request_id: &str) -> Option<PaymentRecord> {
        self.payments.read().await.get(checkout_request_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.payments.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.payments.read().await.is_empty()
    }

    /// Settles a pending record as SUCCESS. Confirmed amount and phone replace
    /// the stored ones only when present.
    pub async fn mark_success(&self, checkout_request_id: &str, confirmed: ConfirmedPayment) -> Transition {
        self.settle(checkout_request_id, |record| {
            record.status = PaymentStatus::Success;
            record.receipt = confirmed.receipt;
            if let Some(amount) = confirmed.amount {
                record.amount = amount;
            }
            if let Some(phone) = confirmed.phone {
                record.phone = phone;
            }
        })
        .await
    }

    pub async fn mark_failed(&self, checkout_request_id: &str, raw: Value) -> Transition {
        self.settle(checkout_request_id, |record| {
            record.status = PaymentStatus::Failed;
            record.raw = Some(raw);
        })
        .await
    }

    async fn settle<F>(&self, checkout_request_id: &str, apply: F) -> Transition
    where
        F: FnOnce(&mut PaymentRecord),
    {
        let mut payments = self.payments.write().await;
        let Some(record) = payments.get_mut(checkout_request_id) else {
            return Transition::UnknownRequest;
        };
        if record.status.is_terminal() {
            return Transition::AlreadySettled(record.status);
        }
        apply(record);
        record.updated_at = Utc::now();
        Transition::Applied(record.clone())
    }
}
