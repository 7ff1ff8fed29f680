use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app_error::AppResult;

/// Unique identifier for a customer in the payment provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub String);

impl CustomerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a subscription in the payment provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub String);

impl SubscriptionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// URLs the provider redirects back to after checkout.
#[derive(Debug, Clone)]
pub struct CheckoutUrls {
    pub success_url: String,
    pub cancel_url: String,
}

/// Result of creating a hosted checkout session.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResult {
    pub checkout_url: String,
    pub session_id: String,
}

/// The provider's authoritative view of one subscription, fetched when a
/// webhook payload is partial.
#[derive(Debug, Clone)]
pub struct SubscriptionInfo {
    pub subscription_id: SubscriptionId,
    pub customer_id: CustomerId,
    pub price_id: String,
    pub current_period_end: Option<NaiveDateTime>,
    pub cancel_at_period_end: bool,
}

/// Payment provider port. The reconciler and the checkout flow see only
/// these domain-level actions; the Stripe adapter maps them to API calls.
#[async_trait]
pub trait PaymentProviderPort: Send + Sync {
    /// Ensure a provider customer exists for the user, creating one if
    /// needed. Returns the provider customer id.
    async fn ensure_customer(&self, email: &str, user_id: Uuid) -> AppResult<CustomerId>;

    /// Create a hosted checkout session for a subscription purchase.
    async fn create_checkout(
        &self,
        customer: &CustomerId,
        price_id: &str,
        urls: &CheckoutUrls,
    ) -> AppResult<CheckoutResult>;

    /// Create a self-service portal session. Returns the portal URL.
    async fn create_portal_session(
        &self,
        customer: &CustomerId,
        return_url: &str,
    ) -> AppResult<String>;

    /// Fetch the current subscription state from the provider.
    /// `None` means the provider does not know the subscription.
    async fn get_subscription(
        &self,
        subscription_id: &SubscriptionId,
    ) -> AppResult<Option<SubscriptionInfo>>;
}
