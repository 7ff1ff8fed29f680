use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::notifier::{ChangeNotifier, ChangeStatus, SubscriptionChanged},
    application::ports::payment_provider::{PaymentProviderPort, SubscriptionId, SubscriptionInfo},
    application::use_cases::billing::UserRepo,
    domain::entities::inbound_event::{EventKind, InboundEvent},
    domain::entities::subscription::SubscriptionRecord,
};

// ============================================================================
// Repository Traits
// ============================================================================

/// Insert payload for a subscription that just came into existence locally.
#[derive(Debug, Clone)]
pub struct NewSubscriptionRecord {
    pub user_id: Uuid,
    pub provider_subscription_id: String,
    pub plan_id: String,
    pub current_period_end: NaiveDateTime,
}

/// Partial update applied to a stored subscription. `None` fields keep the
/// stored value.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionPatch {
    pub plan_id: Option<String>,
    pub current_period_end: Option<NaiveDateTime>,
    pub cancel_at_period_end: Option<bool>,
}

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Insert or replace the subscription for a user. When the stored row
    /// belongs to the same provider subscription, `current_period_end` only
    /// moves forward; a different provider subscription replaces the row
    /// outright.
    async fn upsert_by_user(&self, input: &NewSubscriptionRecord) -> AppResult<SubscriptionRecord>;

    /// Apply a patch to the record owning `provider_subscription_id`.
    ///
    /// The period-end guard lives here: `current_period_end` is written only
    /// when strictly newer than the stored value, while the other patch
    /// fields always apply. The whole update must be one atomic statement.
    /// Returns `None` when no record matches.
    async fn update_by_provider_sub_id(
        &self,
        provider_subscription_id: &str,
        patch: &SubscriptionPatch,
    ) -> AppResult<Option<SubscriptionRecord>>;

    /// Remove the record owning `provider_subscription_id`, returning it.
    async fn delete_by_provider_sub_id(
        &self,
        provider_subscription_id: &str,
    ) -> AppResult<Option<SubscriptionRecord>>;

    async fn find_by_user(&self, user_id: Uuid) -> AppResult<Option<SubscriptionRecord>>;

    async fn find_by_provider_sub_id(
        &self,
        provider_subscription_id: &str,
    ) -> AppResult<Option<SubscriptionRecord>>;
}

// ============================================================================
// Outcomes
// ============================================================================

/// What a reconciliation pass did to local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Created,
    Updated,
    Canceled,
    Deleted,
    /// Plan and period were re-synced from the provider without a
    /// user-visible status change.
    Refreshed,
    /// The event referenced state we do not track. Acknowledged and dropped.
    NoOp,
}

impl ReconcileOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileOutcome::Created => "created",
            ReconcileOutcome::Updated => "updated",
            ReconcileOutcome::Canceled => "canceled",
            ReconcileOutcome::Deleted => "deleted",
            ReconcileOutcome::Refreshed => "refreshed",
            ReconcileOutcome::NoOp => "noop",
        }
    }
}

// ============================================================================
// Use Cases
// ============================================================================

/// Folds verified provider events into the local subscription store and
/// fans out change notifications. Every handler is idempotent: replaying an
/// event, in any order, converges on the same stored state.
#[derive(Clone)]
pub struct ReconcileUseCases {
    store: Arc<dyn SubscriptionStore>,
    users: Arc<dyn UserRepo>,
    provider: Arc<dyn PaymentProviderPort>,
    notifier: Arc<dyn ChangeNotifier>,
}

impl ReconcileUseCases {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        users: Arc<dyn UserRepo>,
        provider: Arc<dyn PaymentProviderPort>,
        notifier: Arc<dyn ChangeNotifier>,
    ) -> Self {
        Self {
            store,
            users,
            provider,
            notifier,
        }
    }

    pub async fn apply(&self, event: &InboundEvent) -> AppResult<ReconcileOutcome> {
        match &event.kind {
            EventKind::CheckoutCompleted {
                subscription_ref,
                customer_ref,
            } => self.checkout_completed(subscription_ref, customer_ref).await,
            EventKind::SubscriptionUpdated {
                subscription_ref,
                plan_ref,
                period_end,
                cancel_at_period_end,
            } => {
                self.subscription_updated(
                    subscription_ref,
                    plan_ref.clone(),
                    *period_end,
                    *cancel_at_period_end,
                )
                .await
            }
            EventKind::SubscriptionDeleted { subscription_ref } => {
                self.subscription_deleted(subscription_ref).await
            }
            EventKind::InvoicePaymentSucceeded { subscription_ref } => {
                self.invoice_payment_succeeded(subscription_ref).await
            }
        }
    }

    /// Checkout finished at the provider. The session payload carries only
    /// references, so the full subscription is fetched before the record is
    /// materialized.
    async fn checkout_completed(
        &self,
        subscription_ref: &str,
        customer_ref: &str,
    ) -> AppResult<ReconcileOutcome> {
        let user_id = self.resolve_user(subscription_ref, customer_ref).await?;
        let info = self.fetch_subscription(subscription_ref).await?;
        let period_end = info.current_period_end.ok_or_else(|| {
            AppError::MalformedEvent(format!(
                "subscription {subscription_ref} has no current_period_end"
            ))
        })?;

        let record = self
            .store
            .upsert_by_user(&NewSubscriptionRecord {
                user_id,
                provider_subscription_id: info.subscription_id.as_str().to_string(),
                plan_id: info.price_id,
                current_period_end: period_end,
            })
            .await?;

        tracing::info!(
            user_id = %record.user_id,
            subscription_id = %record.provider_subscription_id,
            "Subscription created from completed checkout"
        );

        self.notifier
            .notify(record.user_id, SubscriptionChanged::new(ChangeStatus::Created))
            .await;
        Ok(ReconcileOutcome::Created)
    }

    /// The provider changed a subscription we may or may not know about.
    /// Unknown subscriptions are dropped silently: the checkout event that
    /// introduces them may still be in flight.
    async fn subscription_updated(
        &self,
        subscription_ref: &str,
        plan_ref: Option<String>,
        period_end: Option<NaiveDateTime>,
        cancel_at_period_end: bool,
    ) -> AppResult<ReconcileOutcome> {
        let patch = SubscriptionPatch {
            plan_id: plan_ref,
            current_period_end: period_end,
            cancel_at_period_end: Some(cancel_at_period_end),
        };

        let Some(record) = self
            .store
            .update_by_provider_sub_id(subscription_ref, &patch)
            .await?
        else {
            tracing::debug!(
                subscription_id = subscription_ref,
                "Update for untracked subscription, skipping"
            );
            return Ok(ReconcileOutcome::NoOp);
        };

        let (status, outcome) = if record.cancel_at_period_end {
            (ChangeStatus::Canceled, ReconcileOutcome::Canceled)
        } else {
            (ChangeStatus::Updated, ReconcileOutcome::Updated)
        };

        tracing::info!(
            user_id = %record.user_id,
            subscription_id = subscription_ref,
            outcome = outcome.as_str(),
            "Subscription updated"
        );

        self.notifier
            .notify(record.user_id, SubscriptionChanged::new(status))
            .await;
        Ok(outcome)
    }

    /// Terminal: the subscription no longer exists at the provider. The
    /// local record is removed and later events for the same id are no-ops.
    async fn subscription_deleted(&self, subscription_ref: &str) -> AppResult<ReconcileOutcome> {
        let Some(record) = self
            .store
            .delete_by_provider_sub_id(subscription_ref)
            .await?
        else {
            return Ok(ReconcileOutcome::NoOp);
        };

        tracing::info!(
            user_id = %record.user_id,
            subscription_id = subscription_ref,
            "Subscription deleted"
        );

        self.notifier
            .notify(record.user_id, SubscriptionChanged::new(ChangeStatus::Deleted))
            .await;
        Ok(ReconcileOutcome::Deleted)
    }

    /// A renewal payment settled. The invoice itself carries no period data,
    /// so the provider is asked for the fresh state. No notification: the
    /// user-visible status did not change.
    async fn invoice_payment_succeeded(
        &self,
        subscription_ref: &str,
    ) -> AppResult<ReconcileOutcome> {
        if self
            .store
            .find_by_provider_sub_id(subscription_ref)
            .await?
            .is_none()
        {
            tracing::debug!(
                subscription_id = subscription_ref,
                "Invoice for untracked subscription, skipping"
            );
            return Ok(ReconcileOutcome::NoOp);
        }

        let Some(info) = self
            .provider
            .get_subscription(&SubscriptionId::new(subscription_ref))
            .await?
        else {
            return Ok(ReconcileOutcome::NoOp);
        };

        let patch = SubscriptionPatch {
            plan_id: Some(info.price_id),
            current_period_end: info.current_period_end,
            cancel_at_period_end: None,
        };

        match self
            .store
            .update_by_provider_sub_id(subscription_ref, &patch)
            .await?
        {
            Some(record) => {
                tracing::info!(
                    user_id = %record.user_id,
                    subscription_id = subscription_ref,
                    "Subscription refreshed after payment"
                );
                Ok(ReconcileOutcome::Refreshed)
            }
            None => Ok(ReconcileOutcome::NoOp),
        }
    }

    /// Map a checkout event back to a user: first via a record we already
    /// hold for the subscription, then via the stored provider customer id.
    async fn resolve_user(&self, subscription_ref: &str, customer_ref: &str) -> AppResult<Uuid> {
        if let Some(record) = self.store.find_by_provider_sub_id(subscription_ref).await? {
            return Ok(record.user_id);
        }

        match self.users.get_by_provider_customer_id(customer_ref).await? {
            Some(user) => Ok(user.id),
            None => Err(AppError::UserNotFound(format!(
                "no user for provider customer {customer_ref}"
            ))),
        }
    }

    async fn fetch_subscription(&self, subscription_ref: &str) -> AppResult<SubscriptionInfo> {
        self.provider
            .get_subscription(&SubscriptionId::new(subscription_ref))
            .await?
            .ok_or_else(|| {
                AppError::MalformedEvent(format!(
                    "provider does not know subscription {subscription_ref}"
                ))
            })
    }
}
