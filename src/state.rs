use std::sync::Arc;

use crate::config::AppConfig;
use crate::errors::Result;
use crate::services::mpesa_service::MpesaService;
use crate::services::payment_registry::PaymentRegistry;
use crate::services::webhook_notifier::WebhookNotifier;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub mpesa_service: Arc<MpesaService>,
    pub payments: Arc<PaymentRegistry>,
    pub notifier: Option<Arc<WebhookNotifier>>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self> {
        let config = Arc::new(config);
        let mpesa_service = Arc::new(MpesaService::new(config.clone())?);

        let state = AppState {
            config: config.clone(),
            mpesa_service: mpesa_service.clone(),
            payments: Arc::new(PaymentRegistry::new()),
            notifier: None,
        };

        Ok(match &config.webhook_url {
            Some(url) => {
                let notifier = WebhookNotifier::new(mpesa_service.client().clone(), url.clone());
                state.with_notifier(Arc::new(notifier))
            }
            None => state,
        })
    }

    pub fn with_notifier(mut self, notifier: Arc<WebhookNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }
}
