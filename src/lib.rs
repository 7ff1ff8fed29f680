//! Subscription state reconciliation service: webhook-driven mirror of
//! payment-provider subscriptions with live WebSocket change notifications.

pub mod adapters;
pub mod application;
pub mod domain;
pub mod infra;

#[cfg(test)]
pub mod test_utils;

// Re-exports for shorter use statements.
pub use application::*;
pub use domain::*;
