pub mod mpesa_callback;
pub mod payment;
