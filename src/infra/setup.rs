use std::fs::File;
use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    adapters::{http::app_state::AppState, websocket::hub::NotificationHub},
    application::ports::notifier::ChangeNotifier,
    application::ports::payment_provider::PaymentProviderPort,
    infra::{
        config::AppConfig, postgres_persistence, stripe_payment_adapter::StripePaymentAdapter,
    },
    use_cases::billing::{BillingUseCases, UserRepo},
    use_cases::reconcile::{ReconcileUseCases, SubscriptionStore},
    use_cases::webhook::{EventLogRepo, WebhookUseCases},
};

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env();

    let postgres_arc = Arc::new(postgres_persistence(&config.database_url).await?);

    let subscription_store = postgres_arc.clone() as Arc<dyn SubscriptionStore>;
    let user_repo = postgres_arc.clone() as Arc<dyn UserRepo>;
    let event_log = postgres_arc.clone() as Arc<dyn EventLogRepo>;

    let provider =
        Arc::new(StripePaymentAdapter::new(&config.stripe_secret_key)) as Arc<dyn PaymentProviderPort>;

    let hub = Arc::new(NotificationHub::with_default_capacity());
    let notifier = hub.clone() as Arc<dyn ChangeNotifier>;

    let reconcile_use_cases = ReconcileUseCases::new(
        subscription_store.clone(),
        user_repo.clone(),
        provider.clone(),
        notifier,
    );

    let webhook_use_cases = WebhookUseCases::new(Arc::new(reconcile_use_cases), event_log);

    let billing_use_cases = BillingUseCases::new(user_repo, subscription_store, provider);

    Ok(AppState {
        config: Arc::new(config),
        billing_use_cases: Arc::new(billing_use_cases),
        webhook_use_cases: Arc::new(webhook_use_cases),
        hub,
    })
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "billsync=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer()
        .with_target(false) // don’t show target (module path)
        .with_level(true) // show log level
        .pretty(); // human-friendly, with colors

    // File (structured JSON logs)
    let file = File::create("app.log").expect("cannot create log file");
    let json_layer = fmt::layer()
        .json()
        .with_writer(file)
        .with_current_span(true)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
