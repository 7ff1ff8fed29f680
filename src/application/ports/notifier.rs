use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

/// What changed, from the client's point of view. Clients treat any of
/// these as a signal to re-fetch authoritative state, not as state itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    Created,
    Updated,
    Canceled,
    Deleted,
}

impl ChangeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeStatus::Created => "created",
            ChangeStatus::Updated => "updated",
            ChangeStatus::Canceled => "canceled",
            ChangeStatus::Deleted => "deleted",
        }
    }
}

/// The payload pushed to a user's live connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubscriptionChanged {
    #[serde(rename = "type")]
    pub event: &'static str,
    pub status: ChangeStatus,
}

impl SubscriptionChanged {
    pub fn new(status: ChangeStatus) -> Self {
        Self {
            event: "subscription_changed",
            status,
        }
    }
}

/// Fan-out port for live change notifications. Delivery is best-effort and
/// fire-and-forget: it never blocks or fails the reconciliation write path,
/// and silently drops when no connection is subscribed.
#[async_trait]
pub trait ChangeNotifier: Send + Sync {
    async fn notify(&self, user_id: Uuid, change: SubscriptionChanged);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_serializes_with_tag_and_status() {
        let json = serde_json::to_value(SubscriptionChanged::new(ChangeStatus::Created)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "subscription_changed", "status": "created"})
        );
    }
}
