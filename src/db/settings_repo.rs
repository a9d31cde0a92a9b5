// src/db/settings_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::payment::{PaymentSettingsView, UpdatePaymentSettings},
};

// Credenciais do gateway de pagamento por loja
#[derive(Clone)]
pub struct SettingsRepository {
    pool: PgPool,
}

impl SettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_payment_settings(
        &self,
        tenant_id: Uuid,
    ) -> Result<Option<PaymentSettingsView>, AppError> {
        let settings = sqlx::query_as::<_, PaymentSettingsView>(
            r#"
            SELECT gateway, public_key, active, (access_token <> '') AS access_token_configured
            FROM tenant_payment_configs
            WHERE tenant_id = $1
            "#,
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(settings)
    }

    pub async fn upsert_payment_settings<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        input: &UpdatePaymentSettings,
    ) -> Result<PaymentSettingsView, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // UPSERT (Insert or Update)
        let settings = sqlx::query_as::<_, PaymentSettingsView>(
            r#"
            INSERT INTO tenant_payment_configs (tenant_id, gateway, access_token, public_key, active)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (tenant_id)
            DO UPDATE SET
                gateway = EXCLUDED.gateway,
                access_token = EXCLUDED.access_token,
                public_key = EXCLUDED.public_key,
                active = EXCLUDED.active
            RETURNING gateway, public_key, active, (access_token <> '') AS access_token_configured
            "#,
        )
        .bind(tenant_id)
        .bind(&input.gateway)
        .bind(&input.access_token)
        .bind(&input.public_key)
        .bind(input.active)
        .fetch_one(executor)
        .await?;
        Ok(settings)
    }
}
