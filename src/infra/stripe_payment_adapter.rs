use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime};
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_provider::{
        CheckoutResult, CheckoutUrls, CustomerId, PaymentProviderPort, SubscriptionId,
        SubscriptionInfo,
    },
    infra::stripe_client::StripeClient,
};

/// Wraps [`StripeClient`] behind [`PaymentProviderPort`], translating
/// domain-level actions into Stripe API calls.
#[derive(Clone)]
pub struct StripePaymentAdapter {
    client: StripeClient,
}

impl StripePaymentAdapter {
    pub fn new(secret_key: &SecretString) -> Self {
        Self {
            client: StripeClient::new(secret_key.expose_secret().to_string()),
        }
    }

    fn opt_timestamp_to_naive(ts: Option<i64>) -> Option<NaiveDateTime> {
        ts.and_then(|secs| DateTime::from_timestamp(secs, 0)).map(|dt| dt.naive_utc())
    }
}

#[async_trait]
impl PaymentProviderPort for StripePaymentAdapter {
    async fn ensure_customer(&self, email: &str, user_id: Uuid) -> AppResult<CustomerId> {
        let metadata = HashMap::from([("user_id".to_string(), user_id.to_string())]);
        let customer = self
            .client
            .get_or_create_customer(email, Some(metadata))
            .await?;
        Ok(CustomerId::new(customer.id))
    }

    async fn create_checkout(
        &self,
        customer: &CustomerId,
        price_id: &str,
        urls: &CheckoutUrls,
    ) -> AppResult<CheckoutResult> {
        let session = self
            .client
            .create_checkout_session(customer.as_str(), price_id, &urls.success_url, &urls.cancel_url)
            .await?;

        let checkout_url = session
            .url
            .ok_or_else(|| AppError::Internal("Checkout session has no URL".into()))?;

        Ok(CheckoutResult {
            checkout_url,
            session_id: session.id,
        })
    }

    async fn create_portal_session(
        &self,
        customer: &CustomerId,
        return_url: &str,
    ) -> AppResult<String> {
        let session = self
            .client
            .create_portal_session(customer.as_str(), return_url)
            .await?;
        Ok(session.url)
    }

    async fn get_subscription(
        &self,
        subscription_id: &SubscriptionId,
    ) -> AppResult<Option<SubscriptionInfo>> {
        match self.client.get_subscription(subscription_id.as_str()).await {
            Ok(sub) => Ok(Some(SubscriptionInfo {
                subscription_id: SubscriptionId::new(sub.id.clone()),
                customer_id: CustomerId::new(sub.customer.clone()),
                price_id: sub.price_id(),
                current_period_end: Self::opt_timestamp_to_naive(sub.current_period_end),
                cancel_at_period_end: sub.cancel_at_period_end,
            })),
            Err(AppError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
