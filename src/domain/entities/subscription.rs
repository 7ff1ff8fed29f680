use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Derived view of a stored subscription record. Never persisted verbatim;
/// computed from the record and the clock at read time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    None,
    Active,
    Canceling,
    Expired,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::None => "none",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Canceling => "canceling",
            SubscriptionStatus::Expired => "expired",
        }
    }
}

/// The local mirror of one user's provider subscription. At most one per
/// user; `provider_subscription_id` is a unique secondary key.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionRecord {
    pub user_id: Uuid,
    pub provider_subscription_id: String,
    pub plan_id: String,
    pub current_period_end: NaiveDateTime,
    pub cancel_at_period_end: bool,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl SubscriptionRecord {
    pub fn status_at(&self, now: NaiveDateTime) -> SubscriptionStatus {
        if self.current_period_end <= now {
            SubscriptionStatus::Expired
        } else if self.cancel_at_period_end {
            SubscriptionStatus::Canceling
        } else {
            SubscriptionStatus::Active
        }
    }
}
