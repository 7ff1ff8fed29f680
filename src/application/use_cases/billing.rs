use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_provider::{CheckoutUrls, CustomerId, PaymentProviderPort},
    application::use_cases::reconcile::SubscriptionStore,
    domain::entities::plan::{PLAN_CATALOG, Plan, plan_by_price_id},
    domain::entities::subscription::SubscriptionStatus,
};

// ============================================================================
// Repository Traits
// ============================================================================

#[derive(Debug, Clone)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    /// Provider customer id, set lazily on first checkout. Stable once set;
    /// webhook events are resolved back to a user through it.
    pub provider_customer_id: Option<String>,
}

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<UserProfile>>;

    async fn get_by_provider_customer_id(
        &self,
        provider_customer_id: &str,
    ) -> AppResult<Option<UserProfile>>;

    async fn set_provider_customer_id(
        &self,
        id: Uuid,
        provider_customer_id: &str,
    ) -> AppResult<()>;
}

// ============================================================================
// View Types
// ============================================================================

/// The user-facing read model of a stored subscription.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionView {
    pub plan_id: String,
    pub plan_name: String,
    pub status: SubscriptionStatus,
    pub current_period_end: NaiveDateTime,
    pub cancel_at_period_end: bool,
}

// ============================================================================
// Use Cases
// ============================================================================

#[derive(Clone)]
pub struct BillingUseCases {
    users: Arc<dyn UserRepo>,
    store: Arc<dyn SubscriptionStore>,
    provider: Arc<dyn PaymentProviderPort>,
}

impl BillingUseCases {
    pub fn new(
        users: Arc<dyn UserRepo>,
        store: Arc<dyn SubscriptionStore>,
        provider: Arc<dyn PaymentProviderPort>,
    ) -> Self {
        Self {
            users,
            store,
            provider,
        }
    }

    pub fn plans(&self) -> &'static [Plan] {
        &PLAN_CATALOG
    }

    /// Create a hosted checkout session for the user, provisioning a
    /// provider customer on first use.
    pub async fn create_checkout_session(
        &self,
        user_id: Uuid,
        price_id: &str,
        client_url: &str,
    ) -> AppResult<String> {
        let plan = plan_by_price_id(price_id)
            .ok_or_else(|| AppError::InvalidInput(format!("unknown price id: {price_id}")))?;

        let user = self
            .users
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(format!("user id {user_id}")))?;

        let customer = match &user.provider_customer_id {
            Some(id) => CustomerId::new(id.clone()),
            None => {
                let customer = self.provider.ensure_customer(&user.email, user.id).await?;
                self.users
                    .set_provider_customer_id(user.id, customer.as_str())
                    .await?;
                customer
            }
        };

        let urls = CheckoutUrls {
            success_url: format!("{client_url}/dashboard?payment_success=true"),
            cancel_url: format!("{client_url}/dashboard?payment_canceled=true"),
        };

        let result = self
            .provider
            .create_checkout(&customer, plan.price_id, &urls)
            .await?;

        tracing::info!(
            user_id = %user_id,
            plan = plan.code,
            session_id = %result.session_id,
            "Created checkout session"
        );

        Ok(result.checkout_url)
    }

    /// The stored subscription for a user, or `None` when they have never
    /// subscribed (or the subscription was fully terminated).
    pub async fn get_subscription(&self, user_id: Uuid) -> AppResult<Option<SubscriptionView>> {
        let Some(record) = self.store.find_by_user(user_id).await? else {
            return Ok(None);
        };

        let plan_name = plan_by_price_id(&record.plan_id)
            .map(|p| p.name.to_string())
            .unwrap_or_else(|| "Unknown Plan".to_string());

        let now = chrono::Utc::now().naive_utc();
        Ok(Some(SubscriptionView {
            status: record.status_at(now),
            plan_id: record.plan_id,
            plan_name,
            current_period_end: record.current_period_end,
            cancel_at_period_end: record.cancel_at_period_end,
        }))
    }

    /// Create a customer portal session for self-service management.
    pub async fn create_portal_session(
        &self,
        user_id: Uuid,
        client_url: &str,
    ) -> AppResult<String> {
        let user = self
            .users
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(format!("user id {user_id}")))?;

        let customer_id = user.provider_customer_id.ok_or_else(|| {
            AppError::InvalidInput("no provider customer for this user".to_string())
        })?;

        self.provider
            .create_portal_session(
                &CustomerId::new(customer_id),
                &format!("{client_url}/dashboard"),
            )
            .await
    }
}
