pub mod notifier;
pub mod payment_provider;
