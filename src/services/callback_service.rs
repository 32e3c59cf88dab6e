// services/callback_service.rs
use tracing::{info, warn};

use crate::models::mpesa_callback::CallbackPayload;
use crate::models::payment::PaymentStatus;
use crate::services::payment_registry::{ConfirmedPayment, Transition};
use crate::services::webhook_notifier::{generate_referral_code, TransactionNotification};
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    Settled(PaymentStatus),
    UnknownRequest(Option<String>),
    AlreadySettled(PaymentStatus),
}

/// Applies a Daraja result to the registry. Never fails: whatever happens
/// here, the provider still gets its acknowledgment.
pub async fn process_callback(state: &AppState, payload: CallbackPayload) -> CallbackOutcome {
    let result = payload.result();

    let Some(checkout_request_id) = result.checkout_request_id() else {
        warn!("Callback without CheckoutRequestID ignored");
        return CallbackOutcome::UnknownRequest(None);
    };

    let transition = if result.is_success() {
        let confirmed = ConfirmedPayment {
            receipt: result.metadata_text("MpesaReceiptNumber"),
            amount: result.metadata_value("Amount").cloned(),
            phone: result.metadata_text("PhoneNumber"),
        };
        state.payments.mark_success(checkout_request_id, confirmed).await
    } else {
        state
            .payments
            .mark_failed(checkout_request_id, payload.raw().clone())
            .await
    };

    match transition {
        Transition::Applied(record) => {
            info!(
                %checkout_request_id,
                status = ?record.status,
                result_code = result.result_code(),
                result_desc = result.result_desc.as_deref().unwrap_or_default(),
                "Payment settled"
            );
            if record.status == PaymentStatus::Success {
                let referral_code = generate_referral_code();
                if let Some(notifier) = &state.notifier {
                    notifier.dispatch(TransactionNotification::from_record(&record, referral_code));
                }
            }
            CallbackOutcome::Settled(record.status)
        }
        Transition::UnknownRequest => {
            warn!(%checkout_request_id, "Unknown CheckoutRequestID in callback");
            CallbackOutcome::UnknownRequest(Some(checkout_request_id.to_string()))
        }
        Transition::AlreadySettled(status) => {
            warn!(%checkout_request_id, ?status, "Duplicate callback for settled payment ignored");
            CallbackOutcome::AlreadySettled(status)
        }
    }
}
