//! Test app state for HTTP-level integration testing.
//!
//! `TestApp` wires the real use cases to in-memory mocks and keeps handles
//! to every mock so tests can seed state and assert on side effects.

use std::sync::Arc;

use axum::http::HeaderValue;
use secrecy::SecretString;
use time::Duration;
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    adapters::websocket::hub::NotificationHub,
    application::jwt,
    application::use_cases::{
        billing::BillingUseCases, reconcile::ReconcileUseCases, webhook::WebhookUseCases,
    },
    infra::config::AppConfig,
    test_utils::{
        InMemoryEventLog, InMemorySubscriptionStore, InMemoryUserRepo, RecordingNotifier,
        StubPaymentProvider,
    },
};

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<InMemorySubscriptionStore>,
    pub users: Arc<InMemoryUserRepo>,
    pub event_log: Arc<InMemoryEventLog>,
    pub provider: Arc<StubPaymentProvider>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestApp {
    pub const JWT_SECRET: &'static str = "test-jwt-secret";
    pub const WEBHOOK_SECRET: &'static str = "whsec_test_secret";

    pub fn new() -> Self {
        let store = Arc::new(InMemorySubscriptionStore::new());
        let users = Arc::new(InMemoryUserRepo::new());
        let event_log = Arc::new(InMemoryEventLog::new());
        let provider = Arc::new(StubPaymentProvider::new());
        let notifier = Arc::new(RecordingNotifier::new());

        let reconciler = ReconcileUseCases::new(
            store.clone(),
            users.clone(),
            provider.clone(),
            notifier.clone(),
        );
        let webhook_use_cases = WebhookUseCases::new(Arc::new(reconciler), event_log.clone());
        let billing_use_cases =
            BillingUseCases::new(users.clone(), store.clone(), provider.clone());

        let config = AppConfig {
            jwt_secret: SecretString::from(Self::JWT_SECRET),
            cors_origin: HeaderValue::from_static("http://localhost:3000"),
            client_url: "http://localhost:3000".to_string(),
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            database_url: String::new(),
            stripe_secret_key: SecretString::from("sk_test_key"),
            stripe_webhook_secret: SecretString::from(Self::WEBHOOK_SECRET),
        };

        let state = AppState {
            config: Arc::new(config),
            billing_use_cases: Arc::new(billing_use_cases),
            webhook_use_cases: Arc::new(webhook_use_cases),
            hub: Arc::new(NotificationHub::with_default_capacity()),
        };

        Self {
            state,
            store,
            users,
            event_log,
            provider,
            notifier,
        }
    }

    pub fn issue_token(&self, user_id: Uuid) -> String {
        jwt::issue(user_id, &self.state.config.jwt_secret, Duration::hours(1))
            .expect("token issuance in tests")
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}
