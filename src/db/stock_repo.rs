// src/db/stock_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::stock::{MovementFilter, StockLevelView, StockMovement},
};

// Consultas do livro-razão. Toda escrita passa pelo `UnitOfWork`.
#[derive(Clone)]
pub struct StockRepository {
    pool: PgPool,
}

impl StockRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_levels(&self, tenant_id: Uuid) -> Result<Vec<StockLevelView>, AppError> {
        let levels = sqlx::query_as::<_, StockLevelView>(
            r#"
            SELECT
                s.part_id,
                p.name AS part_name,
                p.internal_code,
                s.quantity,
                s.updated_at
            FROM stock_levels s
            JOIN parts p ON p.id = s.part_id
            WHERE s.tenant_id = $1
            ORDER BY p.internal_code ASC NULLS LAST, p.name ASC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(levels)
    }

    pub async fn list_movements(
        &self,
        tenant_id: Uuid,
        filter: &MovementFilter,
    ) -> Result<Vec<StockMovement>, AppError> {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT * FROM stock_movements
            WHERE tenant_id = $1
              AND ($2::movement_kind IS NULL OR kind = $2)
              AND ($3::uuid IS NULL OR part_id = $3)
              AND ($4::uuid IS NULL OR purchase_id = $4)
            ORDER BY created_at DESC, id DESC
            LIMIT 500
            "#,
        )
        .bind(tenant_id)
        .bind(filter.kind)
        .bind(filter.part_id)
        .bind(filter.purchase_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(movements)
    }
}
