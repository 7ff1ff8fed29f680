//! Test data factories for creating valid test fixtures.
//!
//! Each factory function creates a complete, valid object with sensible defaults.
//! Use the closure parameter to override specific fields as needed.

use chrono::{Duration, NaiveDateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use crate::{
    application::use_cases::billing::UserProfile,
    domain::entities::{plan::PLAN_CATALOG, subscription::SubscriptionRecord},
};

fn test_datetime() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Create a test user with sensible defaults.
pub fn create_test_user(overrides: impl FnOnce(&mut UserProfile)) -> UserProfile {
    let mut user = UserProfile {
        id: Uuid::new_v4(),
        email: "user@example.com".to_string(),
        provider_customer_id: Some("cus_test123".to_string()),
    };
    overrides(&mut user);
    user
}

/// Create a stored subscription with an active, month-out period end.
pub fn create_test_record(
    user_id: Uuid,
    overrides: impl FnOnce(&mut SubscriptionRecord),
) -> SubscriptionRecord {
    let mut record = SubscriptionRecord {
        user_id,
        provider_subscription_id: "sub_test123".to_string(),
        plan_id: PLAN_CATALOG[0].price_id.to_string(),
        current_period_end: test_datetime() + Duration::days(30),
        cancel_at_period_end: false,
        created_at: Some(test_datetime()),
        updated_at: Some(test_datetime()),
    };
    overrides(&mut record);
    record
}

/// Produce a `stripe-signature` header value for a raw body, signed the way
/// Stripe signs deliveries.
pub fn stripe_signature(body: &str, webhook_secret: &str) -> String {
    let timestamp = Utc::now().timestamp();
    let mut mac = Hmac::<Sha256>::new_from_slice(webhook_secret.as_bytes())
        .expect("HMAC accepts any key length");
    mac.update(format!("{}.{}", timestamp, body).as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());
    format!("t={},v1={}", timestamp, signature)
}
