use chrono::NaiveDateTime;

/// A verified provider notification reduced to the minimum the reconciler
/// needs. Produced by the classifier, consumed once, never persisted.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    /// Provider event id, kept for duplicate suppression and logging.
    pub provider_event_id: String,
    pub kind: EventKind,
}

/// Closed set of provider event kinds this system reconciles on. Anything
/// the provider sends outside this set is acknowledged and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    CheckoutCompleted {
        subscription_ref: String,
        customer_ref: String,
    },
    SubscriptionUpdated {
        subscription_ref: String,
        plan_ref: Option<String>,
        period_end: Option<NaiveDateTime>,
        cancel_at_period_end: bool,
    },
    SubscriptionDeleted {
        subscription_ref: String,
    },
    InvoicePaymentSucceeded {
        subscription_ref: String,
    },
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::CheckoutCompleted { .. } => "checkout_completed",
            EventKind::SubscriptionUpdated { .. } => "subscription_updated",
            EventKind::SubscriptionDeleted { .. } => "subscription_deleted",
            EventKind::InvoicePaymentSucceeded { .. } => "invoice_payment_succeeded",
        }
    }
}
