use once_cell::sync::Lazy;
use serde::Serialize;

/// A purchasable plan. The catalog is static: plans are created in the
/// provider's dashboard and referenced here by price id.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub code: &'static str,
    pub name: &'static str,
    pub price_cents: i64,
    pub currency: &'static str,
    /// Provider price identifier (what checkout sessions and webhook
    /// payloads carry).
    pub price_id: &'static str,
    pub features: &'static [&'static str],
}

pub static PLAN_CATALOG: Lazy<Vec<Plan>> = Lazy::new(|| {
    vec![
        Plan {
            code: "basic",
            name: "Basic Plan",
            price_cents: 1000,
            currency: "usd",
            price_id: "price_1S3B6h31DyGrygnKbVjGXODK",
            features: &[
                "Manage up to 5 projects",
                "Basic analytics dashboard",
                "Email support",
                "10 GB of storage",
            ],
        },
        Plan {
            code: "pro",
            name: "Pro Plan",
            price_cents: 2500,
            currency: "usd",
            price_id: "price_1S3BJP31DyGrygnKzrFdMcE6",
            features: &[
                "Unlimited projects",
                "Advanced analytics & reports",
                "Priority email & chat support",
                "100 GB of storage & backup",
            ],
        },
    ]
});

/// Resolve a plan by its provider price id.
pub fn plan_by_price_id(price_id: &str) -> Option<&'static Plan> {
    PLAN_CATALOG.iter().find(|p| p.price_id == price_id)
}
