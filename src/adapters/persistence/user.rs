use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::billing::{UserProfile, UserRepo},
};

fn row_to_profile(row: &sqlx::postgres::PgRow) -> UserProfile {
    UserProfile {
        id: row.get("id"),
        email: row.get("email"),
        provider_customer_id: row.get("provider_customer_id"),
    }
}

#[async_trait]
impl UserRepo for PostgresPersistence {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<UserProfile>> {
        let row = sqlx::query("SELECT id, email, provider_customer_id FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_profile))
    }

    async fn get_by_provider_customer_id(
        &self,
        provider_customer_id: &str,
    ) -> AppResult<Option<UserProfile>> {
        let row = sqlx::query(
            "SELECT id, email, provider_customer_id FROM users WHERE provider_customer_id = $1",
        )
        .bind(provider_customer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_profile))
    }

    async fn set_provider_customer_id(
        &self,
        id: Uuid,
        provider_customer_id: &str,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE users SET provider_customer_id = $2, updated_at = CURRENT_TIMESTAMP WHERE id = $1",
        )
        .bind(id)
        .bind(provider_customer_id)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }
}
