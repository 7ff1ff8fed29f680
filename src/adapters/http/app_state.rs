use std::sync::Arc;

use crate::{
    adapters::websocket::hub::NotificationHub,
    application::use_cases::billing::BillingUseCases,
    application::use_cases::webhook::WebhookUseCases,
    infra::config::AppConfig,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub billing_use_cases: Arc<BillingUseCases>,
    pub webhook_use_cases: Arc<WebhookUseCases>,
    pub hub: Arc<NotificationHub>,
}
