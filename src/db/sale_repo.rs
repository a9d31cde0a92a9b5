// src/db/sale_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::sale::{Sale, SaleDetail, SaleItem, SaleStatus},
};

#[derive(Clone)]
pub struct SaleRepository {
    pool: PgPool,
}

impl SaleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_sales(
        &self,
        tenant_id: Uuid,
        status: Option<SaleStatus>,
    ) -> Result<Vec<Sale>, AppError> {
        let sales = sqlx::query_as::<_, Sale>(
            r#"
            SELECT * FROM sales
            WHERE tenant_id = $1 AND ($2::sale_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(tenant_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(sales)
    }

    pub async fn find_sale(&self, tenant_id: Uuid, sale_id: Uuid) -> Result<Option<Sale>, AppError> {
        let sale = sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE id = $1 AND tenant_id = $2")
            .bind(sale_id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(sale)
    }

    pub async fn find_detail(
        &self,
        tenant_id: Uuid,
        sale_id: Uuid,
    ) -> Result<Option<SaleDetail>, AppError> {
        let Some(sale) = self.find_sale(tenant_id, sale_id).await? else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, SaleItem>(
            "SELECT * FROM sale_items WHERE tenant_id = $1 AND sale_id = $2 ORDER BY id",
        )
        .bind(tenant_id)
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(SaleDetail { sale, items }))
    }
}
