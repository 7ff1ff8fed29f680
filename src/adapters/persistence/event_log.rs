use async_trait::async_trait;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::webhook::EventLogRepo,
};

#[async_trait]
impl EventLogRepo for PostgresPersistence {
    async fn seen(&self, provider_event_id: &str) -> AppResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM provider_events WHERE provider_event_id = $1",
        )
        .bind(provider_event_id)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(count > 0)
    }

    async fn record(&self, provider_event_id: &str, kind: &str, outcome: &str) -> AppResult<()> {
        // Concurrent deliveries of the same event may both get here; the
        // second insert is a no-op.
        sqlx::query(
            r#"
            INSERT INTO provider_events (provider_event_id, kind, outcome)
            VALUES ($1, $2, $3)
            ON CONFLICT (provider_event_id) DO NOTHING
            "#,
        )
        .bind(provider_event_id)
        .bind(kind)
        .bind(outcome)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }
}
