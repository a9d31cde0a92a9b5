// src/db/purchase_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::purchase::{Purchase, PurchaseDetail, PurchaseItem, PurchaseStatus},
};

#[derive(Clone)]
pub struct PurchaseRepository {
    pool: PgPool,
}

impl PurchaseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_purchases(
        &self,
        tenant_id: Uuid,
        status: Option<PurchaseStatus>,
    ) -> Result<Vec<Purchase>, AppError> {
        let purchases = sqlx::query_as::<_, Purchase>(
            r#"
            SELECT * FROM purchases
            WHERE tenant_id = $1 AND ($2::purchase_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(tenant_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(purchases)
    }

    pub async fn find_detail(
        &self,
        tenant_id: Uuid,
        purchase_id: Uuid,
    ) -> Result<Option<PurchaseDetail>, AppError> {
        let purchase = sqlx::query_as::<_, Purchase>(
            "SELECT * FROM purchases WHERE id = $1 AND tenant_id = $2",
        )
        .bind(purchase_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(purchase) = purchase else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, PurchaseItem>(
            "SELECT * FROM purchase_items WHERE tenant_id = $1 AND purchase_id = $2 ORDER BY id",
        )
        .bind(tenant_id)
        .bind(purchase_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(PurchaseDetail { purchase, items }))
    }
}
