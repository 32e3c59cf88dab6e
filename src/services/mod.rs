pub mod callback_service;
pub mod mpesa_service;
pub mod payment_registry;
pub mod phone;
pub mod token_cache;
pub mod webhook_notifier;
