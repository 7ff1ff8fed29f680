//! Payment provider webhook handler.

use axum::{
    Json, Router, extract::State, http::HeaderMap, response::IntoResponse, routing::post,
};
use secrecy::ExposeSecret;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    infra::stripe_client::StripeClient,
};

/// POST /api/webhooks/stripe
///
/// Verifies the signature over the raw body, then hands the envelope to the
/// webhook pipeline. A non-2xx response makes Stripe redeliver, so only
/// genuine failures propagate; events we choose to skip still return 200.
async fn handle_stripe_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> AppResult<impl IntoResponse> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::SignatureInvalid("Missing Stripe signature".into()))?;

    // Verify against the body exactly as received, before any parsing.
    StripeClient::verify_webhook_signature(
        &body,
        signature,
        app_state.config.stripe_webhook_secret.expose_secret(),
    )?;

    let event: serde_json::Value = serde_json::from_str(&body)
        .map_err(|e| AppError::MalformedEvent(format!("Invalid webhook payload: {}", e)))?;

    let ack = app_state.webhook_use_cases.process(&event).await?;
    Ok(Json(ack))
}

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/stripe", post(handle_stripe_webhook))
}
