use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::reconcile::ReconcileUseCases,
    domain::entities::inbound_event::{EventKind, InboundEvent},
};

// ============================================================================
// Repository Traits
// ============================================================================

/// Append-only log of processed provider events, used to suppress
/// at-least-once redeliveries. Best-effort: a miss means the event is
/// reprocessed, which the reconciler absorbs.
#[async_trait]
pub trait EventLogRepo: Send + Sync {
    async fn seen(&self, provider_event_id: &str) -> AppResult<bool>;

    async fn record(&self, provider_event_id: &str, kind: &str, outcome: &str) -> AppResult<()>;
}

// ============================================================================
// Classification
// ============================================================================

/// Classifier verdict for one provider envelope.
#[derive(Debug)]
pub enum Classified {
    Event(InboundEvent),
    /// Recognized envelope, irrelevant type. Acknowledged without side
    /// effects.
    Ignored,
}

/// Reduce a provider envelope to an [`InboundEvent`]. Unknown event types
/// are ignored, not errors; a recognized type with a broken payload is a
/// [`AppError::MalformedEvent`].
pub fn classify(envelope: &Value) -> AppResult<Classified> {
    let event_type = envelope["type"].as_str().unwrap_or_default();
    let event_id = envelope["id"].as_str().unwrap_or_default().to_string();
    let object = &envelope["data"]["object"];

    let kind = match event_type {
        "checkout.session.completed" => {
            let subscription_ref = non_empty_str(&object["subscription"]);
            let customer_ref = non_empty_str(&object["customer"]);
            match (subscription_ref, customer_ref) {
                (Some(sub), Some(cus)) => EventKind::CheckoutCompleted {
                    subscription_ref: sub,
                    customer_ref: cus,
                },
                _ => {
                    return Err(AppError::MalformedEvent(
                        "checkout.session.completed missing subscription or customer".to_string(),
                    ));
                }
            }
        }
        "customer.subscription.updated" => EventKind::SubscriptionUpdated {
            subscription_ref: required_id(object, event_type)?,
            plan_ref: object["items"]["data"][0]["price"]["id"]
                .as_str()
                .map(str::to_string),
            period_end: epoch_field(object, "current_period_end")?,
            cancel_at_period_end: object["cancel_at_period_end"].as_bool().unwrap_or(false),
        },
        "customer.subscription.deleted" => EventKind::SubscriptionDeleted {
            subscription_ref: required_id(object, event_type)?,
        },
        // Older API versions send `invoice.payment_succeeded`, newer ones
        // `invoice.paid`. Same meaning here.
        "invoice.payment_succeeded" | "invoice.paid" => {
            match non_empty_str(&object["subscription"]) {
                Some(sub) => EventKind::InvoicePaymentSucceeded {
                    subscription_ref: sub,
                },
                // One-off invoices carry no subscription. Not ours.
                None => return Ok(Classified::Ignored),
            }
        }
        _ => return Ok(Classified::Ignored),
    };

    Ok(Classified::Event(InboundEvent {
        provider_event_id: event_id,
        kind,
    }))
}

fn non_empty_str(value: &Value) -> Option<String> {
    value
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn required_id(object: &Value, event_type: &str) -> AppResult<String> {
    non_empty_str(&object["id"])
        .ok_or_else(|| AppError::MalformedEvent(format!("{event_type} missing object id")))
}

/// An absent or null field is fine; a present field that is not a unix
/// timestamp is a malformed event.
fn epoch_field(object: &Value, field: &str) -> AppResult<Option<NaiveDateTime>> {
    let value = &object[field];
    if value.is_null() {
        return Ok(None);
    }
    let secs = value
        .as_i64()
        .ok_or_else(|| AppError::MalformedEvent(format!("{field} is not a unix timestamp")))?;
    let ts = DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| AppError::MalformedEvent(format!("{field} is out of range")))?;
    Ok(Some(ts.naive_utc()))
}

// ============================================================================
// Use Cases
// ============================================================================

/// Acknowledgement body returned to the provider.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

impl WebhookAck {
    pub fn received() -> Self {
        Self { received: true }
    }
}

/// The webhook pipeline behind signature verification: classify, suppress
/// duplicates, reconcile, log.
#[derive(Clone)]
pub struct WebhookUseCases {
    reconciler: Arc<ReconcileUseCases>,
    event_log: Arc<dyn EventLogRepo>,
}

impl WebhookUseCases {
    pub fn new(reconciler: Arc<ReconcileUseCases>, event_log: Arc<dyn EventLogRepo>) -> Self {
        Self {
            reconciler,
            event_log,
        }
    }

    pub async fn process(&self, envelope: &Value) -> AppResult<WebhookAck> {
        let event = match classify(envelope)? {
            Classified::Event(event) => event,
            Classified::Ignored => {
                tracing::debug!(
                    event_type = envelope["type"].as_str().unwrap_or("<none>"),
                    "Ignoring unhandled event type"
                );
                return Ok(WebhookAck::received());
            }
        };

        let has_id = !event.provider_event_id.is_empty();
        if has_id && self.event_log.seen(&event.provider_event_id).await? {
            tracing::debug!(
                event_id = %event.provider_event_id,
                "Duplicate event, already processed"
            );
            return Ok(WebhookAck::received());
        }

        let outcome = self.reconciler.apply(&event).await?;

        if has_id {
            if let Err(err) = self
                .event_log
                .record(&event.provider_event_id, event.kind.name(), outcome.as_str())
                .await
            {
                tracing::warn!(
                    event_id = %event.provider_event_id,
                    error = %err,
                    "Failed to record processed event"
                );
            }
        }

        tracing::info!(
            event_id = %event.provider_event_id,
            kind = event.kind.name(),
            outcome = outcome.as_str(),
            "Processed provider event"
        );

        Ok(WebhookAck::received())
    }
}
