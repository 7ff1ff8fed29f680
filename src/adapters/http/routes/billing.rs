//! Authenticated billing endpoints: plan catalog, checkout, portal, and the
//! current user's subscription.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, header::AUTHORIZATION},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    application::jwt,
    infra::config::AppConfig,
};

fn bearer_user(headers: &HeaderMap, config: &AppConfig) -> AppResult<Uuid> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AppError::InvalidCredentials)?;
    jwt::verify_user_id(token, &config.jwt_secret)
}

/// GET /api/billing/plans
async fn get_plans(State(app_state): State<AppState>) -> impl IntoResponse {
    Json(app_state.billing_use_cases.plans())
}

#[derive(Deserialize)]
struct CheckoutRequest {
    price_id: String,
}

/// POST /api/billing/checkout-session
async fn create_checkout_session(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<impl IntoResponse> {
    let user_id = bearer_user(&headers, &app_state.config)?;
    let url = app_state
        .billing_use_cases
        .create_checkout_session(user_id, &payload.price_id, &app_state.config.client_url)
        .await?;
    Ok(Json(serde_json::json!({ "url": url })))
}

/// GET /api/billing/subscription
async fn get_subscription(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let user_id = bearer_user(&headers, &app_state.config)?;
    let subscription = app_state.billing_use_cases.get_subscription(user_id).await?;
    Ok(Json(serde_json::json!({ "subscription": subscription })))
}

/// POST /api/billing/portal-session
async fn create_portal_session(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let user_id = bearer_user(&headers, &app_state.config)?;
    let url = app_state
        .billing_use_cases
        .create_portal_session(user_id, &app_state.config.client_url)
        .await?;
    Ok(Json(serde_json::json!({ "url": url })))
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/plans", get(get_plans))
        .route("/checkout-session", post(create_checkout_session))
        .route("/subscription", get(get_subscription))
        .route("/portal-session", post(create_portal_session))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::json;

    use crate::domain::entities::plan::PLAN_CATALOG;
    use crate::test_utils::{TestApp, create_test_record, create_test_user};

    fn server(test_app: &TestApp) -> TestServer {
        TestServer::new(router().with_state(test_app.state.clone())).unwrap()
    }

    #[tokio::test]
    async fn plans_are_public() {
        let test_app = TestApp::new();
        let response = server(&test_app).get("/plans").await;
        response.assert_status_ok();

        let plans: serde_json::Value = response.json();
        assert_eq!(plans.as_array().unwrap().len(), PLAN_CATALOG.len());
        assert_eq!(plans[0]["code"], "basic");
    }

    #[tokio::test]
    async fn subscription_requires_bearer_token() {
        let test_app = TestApp::new();
        let response = server(&test_app).get("/subscription").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn subscription_is_null_for_new_user() {
        let test_app = TestApp::new();
        let user = create_test_user(|_| {});
        let token = test_app.issue_token(user.id);
        test_app.users.insert(user);

        let response = server(&test_app)
            .get("/subscription")
            .add_header(AUTHORIZATION, format!("Bearer {token}"))
            .await;

        response.assert_status_ok();
        response.assert_json(&json!({ "subscription": null }));
    }

    #[tokio::test]
    async fn subscription_returns_active_record() {
        let test_app = TestApp::new();
        let user = create_test_user(|_| {});
        let user_id = user.id;
        let token = test_app.issue_token(user_id);
        test_app.users.insert(user);
        test_app.store.insert(create_test_record(user_id, |r| {
            r.plan_id = PLAN_CATALOG[0].price_id.to_string();
        }));

        let response = server(&test_app)
            .get("/subscription")
            .add_header(AUTHORIZATION, format!("Bearer {token}"))
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["subscription"]["status"], "active");
        assert_eq!(body["subscription"]["plan_name"], "Basic Plan");
    }

    #[tokio::test]
    async fn checkout_session_returns_provider_url() {
        let test_app = TestApp::new();
        let user = create_test_user(|_| {});
        let token = test_app.issue_token(user.id);
        test_app.users.insert(user);

        let response = server(&test_app)
            .post("/checkout-session")
            .add_header(AUTHORIZATION, format!("Bearer {token}"))
            .json(&json!({ "price_id": PLAN_CATALOG[0].price_id }))
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert!(body["url"].as_str().unwrap().starts_with("https://"));
    }

    #[tokio::test]
    async fn checkout_session_rejects_unknown_price() {
        let test_app = TestApp::new();
        let user = create_test_user(|_| {});
        let token = test_app.issue_token(user.id);
        test_app.users.insert(user);

        let response = server(&test_app)
            .post("/checkout-session")
            .add_header(AUTHORIZATION, format!("Bearer {token}"))
            .json(&json!({ "price_id": "price_bogus" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn portal_session_requires_existing_customer() {
        let test_app = TestApp::new();
        let user = create_test_user(|u| u.provider_customer_id = None);
        let token = test_app.issue_token(user.id);
        test_app.users.insert(user);

        let response = server(&test_app)
            .post("/portal-session")
            .add_header(AUTHORIZATION, format!("Bearer {token}"))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }
}
