// handlers/mpesa_handlers.rs
use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::errors::{AppError, Result};
use crate::models::mpesa_callback::{value_to_text, CallbackPayload};
use crate::models::payment::{NewPayment, PaymentRecord, PaymentStatusView};
use crate::services::callback_service::{process_callback, CallbackOutcome};
use crate::state::AppState;

// Fields are loose JSON so numbers (e.g. a numeric phone) are still accepted.
#[derive(Debug, Default, Deserialize)]
pub struct StkPushBody {
    #[serde(default)]
    pub registration_id: Option<Value>,
    #[serde(default)]
    pub phone: Option<Value>,
    #[serde(default)]
    pub referral_code: Option<Value>,
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default)]
    pub email: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    #[serde(rename = "checkoutRequestID")]
    pub checkout_request_id: Option<String>,
}

fn text_field(value: &Option<Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(v) => Some(value_to_text(v)).filter(|s| !s.trim().is_empty()),
    }
}

pub async fn initiate_stk_push(
    State(state): State<AppState>,
    body: std::result::Result<Json<StkPushBody>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(body) = body.map_err(|e| {
        warn!("Rejected STK push body: {}", e);
        AppError::validation("Invalid JSON body")
    })?;

    let (Some(registration_id), Some(phone), Some(email)) = (
        text_field(&body.registration_id),
        text_field(&body.phone),
        text_field(&body.email),
    ) else {
        return Err(AppError::validation("registration_id, phone, and email required"));
    };
    let amount = body.amount.unwrap_or(Value::Null);

    let accepted = state
        .mpesa_service
        .initiate_stk_push(&phone, &amount, &registration_id)
        .await?;

    let record = PaymentRecord::pending(
        accepted.checkout_request_id.clone(),
        NewPayment {
            registration_id,
            phone,
            email,
            referral_code: text_field(&body.referral_code),
            amount,
        },
    );
    state.payments.insert_pending(record).await;

    Ok(Json(json!({
        "message": "STK Push initiated",
        "CheckoutRequestID": accepted.checkout_request_id,
        "raw": accepted.raw,
    })))
}

/// Always acknowledges, so Daraja does not keep retrying.
pub async fn mpesa_callback(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    match CallbackPayload::from_slice(&body) {
        Some(payload) => {
            let outcome = process_callback(&state, payload).await;
            if let CallbackOutcome::Settled(status) = outcome {
                info!(?status, "Callback processed");
            }
        }
        None => warn!(bytes = body.len(), "Unreadable callback body"),
    }

    Json(json!({
        "ResultCode": 0,
        "ResultDesc": "Accepted"
    }))
}

pub async fn check_transaction_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<PaymentStatusView>> {
    let checkout_request_id = query
        .checkout_request_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::validation("checkoutRequestID required"))?;

    let record = state
        .payments
        .get(&checkout_request_id)
        .await
        .ok_or_else(|| AppError::not_found("not found"))?;

    Ok(Json(PaymentStatusView::from(&record)))
}
