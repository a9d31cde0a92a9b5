// src/db/dashboard_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::dashboard::{DailySalesEntry, DashboardKpis, TopPartEntry},
};

// Os dias são contados no fuso da loja (America/Sao_Paulo).
// Apenas vendas FINALIZADA entram nos indicadores.

#[derive(Clone)]
pub struct DashboardRepository {
    pool: PgPool,
}

impl DashboardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // 1. Indicadores gerais
    pub async fn get_kpis<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<DashboardKpis, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        // Snapshot consistente das quatro consultas
        let mut tx = executor.begin().await?;

        // A. Quantidade vendida
        let quantity_sold = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COALESCE(SUM(i.quantity), 0)::BIGINT
            FROM sale_items i
            JOIN sales s ON s.id = i.sale_id
            WHERE s.tenant_id = $1
              AND s.status = 'FINALIZADA'
              AND ($2::date IS NULL OR (s.created_at AT TIME ZONE 'America/Sao_Paulo')::date >= $2)
              AND ($3::date IS NULL OR (s.created_at AT TIME ZONE 'America/Sao_Paulo')::date <= $3)
            "#,
        )
        .bind(tenant_id)
        .bind(from)
        .bind(to)
        .fetch_one(&mut *tx)
        .await?;

        // B. Valor vendido
        let amount_sold = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(s.total_amount), 0)::NUMERIC
            FROM sales s
            WHERE s.tenant_id = $1
              AND s.status = 'FINALIZADA'
              AND ($2::date IS NULL OR (s.created_at AT TIME ZONE 'America/Sao_Paulo')::date >= $2)
              AND ($3::date IS NULL OR (s.created_at AT TIME ZONE 'America/Sao_Paulo')::date <= $3)
            "#,
        )
        .bind(tenant_id)
        .bind(from)
        .bind(to)
        .fetch_one(&mut *tx)
        .await?;

        // C. Estoque atual (quantidade e valor a preço de venda)
        let (stock_quantity, stock_value) = sqlx::query_as::<_, (i64, Decimal)>(
            r#"
            SELECT
                COALESCE(SUM(e.quantity), 0)::BIGINT,
                COALESCE(SUM(e.quantity * p.sale_price), 0)::NUMERIC
            FROM stock_levels e
            JOIN parts p ON p.id = e.part_id
            WHERE e.tenant_id = $1
            "#,
        )
        .bind(tenant_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(DashboardKpis {
            quantity_sold,
            amount_sold,
            stock_quantity,
            stock_value,
        })
    }

    // 2. Vendido por dia (sem janela: últimos 30 dias)
    pub async fn get_daily_sales(
        &self,
        tenant_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<DailySalesEntry>, AppError> {
        let rows = sqlx::query_as::<_, DailySalesEntry>(
            r#"
            SELECT
                (s.created_at AT TIME ZONE 'America/Sao_Paulo')::date AS day,
                COALESCE(SUM(s.total_amount), 0)::NUMERIC AS total
            FROM sales s
            WHERE s.tenant_id = $1
              AND s.status = 'FINALIZADA'
              AND (s.created_at AT TIME ZONE 'America/Sao_Paulo')::date
                  >= COALESCE($2::date, (NOW() AT TIME ZONE 'America/Sao_Paulo')::date - 29)
              AND ($3::date IS NULL OR (s.created_at AT TIME ZONE 'America/Sao_Paulo')::date <= $3)
            GROUP BY 1
            ORDER BY 1 ASC
            "#,
        )
        .bind(tenant_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // 3. Top 5 peças por quantidade
    pub async fn get_top_parts(
        &self,
        tenant_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<TopPartEntry>, AppError> {
        let rows = sqlx::query_as::<_, TopPartEntry>(
            r#"
            SELECT
                p.internal_code,
                p.name,
                p.image_path,
                SUM(i.quantity)::BIGINT AS quantity
            FROM sale_items i
            JOIN sales s ON s.id = i.sale_id
            JOIN parts p ON p.id = i.part_id
            WHERE s.tenant_id = $1
              AND s.status = 'FINALIZADA'
              AND p.internal_code IS NOT NULL
              AND ($2::date IS NULL OR (s.created_at AT TIME ZONE 'America/Sao_Paulo')::date >= $2)
              AND ($3::date IS NULL OR (s.created_at AT TIME ZONE 'America/Sao_Paulo')::date <= $3)
            GROUP BY p.id, p.internal_code, p.name, p.image_path
            ORDER BY quantity DESC
            LIMIT 5
            "#,
        )
        .bind(tenant_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
