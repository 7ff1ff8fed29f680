use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::reconcile::{
        NewSubscriptionRecord, SubscriptionPatch, SubscriptionStore,
    },
    domain::entities::subscription::SubscriptionRecord,
};

fn row_to_record(row: &sqlx::postgres::PgRow) -> SubscriptionRecord {
    SubscriptionRecord {
        user_id: row.get("user_id"),
        provider_subscription_id: row.get("provider_subscription_id"),
        plan_id: row.get("plan_id"),
        current_period_end: row.get("current_period_end"),
        cancel_at_period_end: row.get("cancel_at_period_end"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const SELECT_COLS: &str = r#"
    user_id, provider_subscription_id, plan_id, current_period_end,
    cancel_at_period_end, created_at, updated_at
"#;

#[async_trait]
impl SubscriptionStore for PostgresPersistence {
    async fn upsert_by_user(&self, input: &NewSubscriptionRecord) -> AppResult<SubscriptionRecord> {
        // On a same-subscription replay the period end only moves forward;
        // a different provider subscription replaces the row.
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO subscriptions
                (user_id, provider_subscription_id, plan_id, current_period_end)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE SET
                provider_subscription_id = EXCLUDED.provider_subscription_id,
                plan_id = EXCLUDED.plan_id,
                current_period_end = CASE
                    WHEN subscriptions.provider_subscription_id = EXCLUDED.provider_subscription_id
                    THEN GREATEST(subscriptions.current_period_end, EXCLUDED.current_period_end)
                    ELSE EXCLUDED.current_period_end
                END,
                cancel_at_period_end = false,
                updated_at = CURRENT_TIMESTAMP
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(input.user_id)
        .bind(&input.provider_subscription_id)
        .bind(&input.plan_id)
        .bind(input.current_period_end)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row_to_record(&row))
    }

    async fn update_by_provider_sub_id(
        &self,
        provider_subscription_id: &str,
        patch: &SubscriptionPatch,
    ) -> AppResult<Option<SubscriptionRecord>> {
        // One statement so the period-end guard cannot race a concurrent
        // delivery. A stale period end keeps the stored value while the
        // other fields still apply.
        let row = sqlx::query(&format!(
            r#"
            UPDATE subscriptions SET
                plan_id = COALESCE($2, plan_id),
                current_period_end = CASE
                    WHEN $3::timestamp IS NULL THEN current_period_end
                    WHEN $3 > current_period_end THEN $3
                    ELSE current_period_end
                END,
                cancel_at_period_end = COALESCE($4, cancel_at_period_end),
                updated_at = CURRENT_TIMESTAMP
            WHERE provider_subscription_id = $1
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(provider_subscription_id)
        .bind(&patch.plan_id)
        .bind(patch.current_period_end)
        .bind(patch.cancel_at_period_end)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_record))
    }

    async fn delete_by_provider_sub_id(
        &self,
        provider_subscription_id: &str,
    ) -> AppResult<Option<SubscriptionRecord>> {
        let row = sqlx::query(&format!(
            "DELETE FROM subscriptions WHERE provider_subscription_id = $1 RETURNING {}",
            SELECT_COLS
        ))
        .bind(provider_subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_record))
    }

    async fn find_by_user(&self, user_id: Uuid) -> AppResult<Option<SubscriptionRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscriptions WHERE user_id = $1",
            SELECT_COLS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_record))
    }

    async fn find_by_provider_sub_id(
        &self,
        provider_subscription_id: &str,
    ) -> AppResult<Option<SubscriptionRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscriptions WHERE provider_subscription_id = $1",
            SELECT_COLS
        ))
        .bind(provider_subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_record))
    }
}
