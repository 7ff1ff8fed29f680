//! In-memory mock implementations for billing-related repository traits.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

use crate::{
    app_error::AppResult,
    application::ports::notifier::{ChangeNotifier, SubscriptionChanged},
    application::ports::payment_provider::{
        CheckoutResult, CheckoutUrls, CustomerId, PaymentProviderPort, SubscriptionId,
        SubscriptionInfo,
    },
    application::use_cases::billing::{UserProfile, UserRepo},
    application::use_cases::reconcile::{
        NewSubscriptionRecord, SubscriptionPatch, SubscriptionStore,
    },
    application::use_cases::webhook::EventLogRepo,
    domain::entities::subscription::SubscriptionRecord,
};

// ============================================================================
// InMemorySubscriptionStore
// ============================================================================

/// Mirrors the Postgres store semantics, including the forward-only
/// period-end guard, so reconciler tests exercise the same contract.
#[derive(Default)]
pub struct InMemorySubscriptionStore {
    records: Mutex<HashMap<Uuid, SubscriptionRecord>>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: SubscriptionRecord) {
        self.records.lock().unwrap().insert(record.user_id, record);
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Non-async lookup for assertions inside HTTP tests.
    pub fn find_by_user_sync(&self, user_id: Uuid) -> Option<SubscriptionRecord> {
        self.records.lock().unwrap().get(&user_id).cloned()
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn upsert_by_user(&self, input: &NewSubscriptionRecord) -> AppResult<SubscriptionRecord> {
        let mut records = self.records.lock().unwrap();
        let now = chrono::Utc::now().naive_utc();

        let period_end = match records.get(&input.user_id) {
            Some(existing)
                if existing.provider_subscription_id == input.provider_subscription_id =>
            {
                existing.current_period_end.max(input.current_period_end)
            }
            _ => input.current_period_end,
        };

        let record = SubscriptionRecord {
            user_id: input.user_id,
            provider_subscription_id: input.provider_subscription_id.clone(),
            plan_id: input.plan_id.clone(),
            current_period_end: period_end,
            cancel_at_period_end: false,
            created_at: records
                .get(&input.user_id)
                .and_then(|r| r.created_at)
                .or(Some(now)),
            updated_at: Some(now),
        };
        records.insert(input.user_id, record.clone());
        Ok(record)
    }

    async fn update_by_provider_sub_id(
        &self,
        provider_subscription_id: &str,
        patch: &SubscriptionPatch,
    ) -> AppResult<Option<SubscriptionRecord>> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .values_mut()
            .find(|r| r.provider_subscription_id == provider_subscription_id);

        let Some(record) = record else {
            return Ok(None);
        };

        if let Some(plan_id) = &patch.plan_id {
            record.plan_id = plan_id.clone();
        }
        if let Some(period_end) = patch.current_period_end {
            if period_end > record.current_period_end {
                record.current_period_end = period_end;
            }
        }
        if let Some(cancel) = patch.cancel_at_period_end {
            record.cancel_at_period_end = cancel;
        }
        record.updated_at = Some(chrono::Utc::now().naive_utc());

        Ok(Some(record.clone()))
    }

    async fn delete_by_provider_sub_id(
        &self,
        provider_subscription_id: &str,
    ) -> AppResult<Option<SubscriptionRecord>> {
        let mut records = self.records.lock().unwrap();
        let user_id = records
            .values()
            .find(|r| r.provider_subscription_id == provider_subscription_id)
            .map(|r| r.user_id);
        Ok(user_id.and_then(|id| records.remove(&id)))
    }

    async fn find_by_user(&self, user_id: Uuid) -> AppResult<Option<SubscriptionRecord>> {
        Ok(self.records.lock().unwrap().get(&user_id).cloned())
    }

    async fn find_by_provider_sub_id(
        &self,
        provider_subscription_id: &str,
    ) -> AppResult<Option<SubscriptionRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .find(|r| r.provider_subscription_id == provider_subscription_id)
            .cloned())
    }
}

// ============================================================================
// InMemoryUserRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryUserRepo {
    users: Mutex<HashMap<Uuid, UserProfile>>,
}

impl InMemoryUserRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: Vec<UserProfile>) -> Self {
        let map: HashMap<Uuid, UserProfile> = users.into_iter().map(|u| (u.id, u)).collect();
        Self {
            users: Mutex::new(map),
        }
    }

    pub fn insert(&self, user: UserProfile) {
        self.users.lock().unwrap().insert(user.id, user);
    }
}

#[async_trait]
impl UserRepo for InMemoryUserRepo {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<UserProfile>> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    async fn get_by_provider_customer_id(
        &self,
        provider_customer_id: &str,
    ) -> AppResult<Option<UserProfile>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.provider_customer_id.as_deref() == Some(provider_customer_id))
            .cloned())
    }

    async fn set_provider_customer_id(
        &self,
        id: Uuid,
        provider_customer_id: &str,
    ) -> AppResult<()> {
        if let Some(user) = self.users.lock().unwrap().get_mut(&id) {
            user.provider_customer_id = Some(provider_customer_id.to_string());
        }
        Ok(())
    }
}

// ============================================================================
// InMemoryEventLog
// ============================================================================

#[derive(Default)]
pub struct InMemoryEventLog {
    seen_ids: Mutex<HashSet<String>>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventLogRepo for InMemoryEventLog {
    async fn seen(&self, provider_event_id: &str) -> AppResult<bool> {
        Ok(self.seen_ids.lock().unwrap().contains(provider_event_id))
    }

    async fn record(&self, provider_event_id: &str, _kind: &str, _outcome: &str) -> AppResult<()> {
        self.seen_ids
            .lock()
            .unwrap()
            .insert(provider_event_id.to_string());
        Ok(())
    }
}

// ============================================================================
// RecordingNotifier
// ============================================================================

/// Captures notifications instead of delivering them.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(Uuid, SubscriptionChanged)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(Uuid, SubscriptionChanged)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChangeNotifier for RecordingNotifier {
    async fn notify(&self, user_id: Uuid, change: SubscriptionChanged) {
        self.sent.lock().unwrap().push((user_id, change));
    }
}

// ============================================================================
// StubPaymentProvider
// ============================================================================

/// Payment provider stub backed by a map of known subscriptions.
#[derive(Default)]
pub struct StubPaymentProvider {
    subscriptions: Mutex<HashMap<String, SubscriptionInfo>>,
    customers_created: AtomicUsize,
    subscription_lookups: AtomicUsize,
}

impl StubPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_subscription(&self, info: SubscriptionInfo) {
        self.subscriptions
            .lock()
            .unwrap()
            .insert(info.subscription_id.as_str().to_string(), info);
    }

    pub fn created_customers(&self) -> usize {
        self.customers_created.load(Ordering::SeqCst)
    }

    pub fn get_subscription_calls(&self) -> usize {
        self.subscription_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentProviderPort for StubPaymentProvider {
    async fn ensure_customer(&self, _email: &str, _user_id: Uuid) -> AppResult<CustomerId> {
        self.customers_created.fetch_add(1, Ordering::SeqCst);
        Ok(CustomerId::new(format!("cus_test_{}", Uuid::new_v4())))
    }

    async fn create_checkout(
        &self,
        customer: &CustomerId,
        _price_id: &str,
        _urls: &CheckoutUrls,
    ) -> AppResult<CheckoutResult> {
        Ok(CheckoutResult {
            checkout_url: format!("https://checkout.stripe.test/c/{}", customer.as_str()),
            session_id: format!("cs_test_{}", Uuid::new_v4()),
        })
    }

    async fn create_portal_session(
        &self,
        customer: &CustomerId,
        _return_url: &str,
    ) -> AppResult<String> {
        Ok(format!(
            "https://billing.stripe.test/p/{}",
            customer.as_str()
        ))
    }

    async fn get_subscription(
        &self,
        subscription_id: &SubscriptionId,
    ) -> AppResult<Option<SubscriptionInfo>> {
        self.subscription_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .get(subscription_id.as_str())
            .cloned())
    }
}
