// src/db/pg_store.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::unit_of_work::{Store, UnitOfWork},
    models::{
        catalog::{Part, PhoneModel, Supplier},
        payment::PaymentConfig,
        purchase::{Purchase, PurchaseItem, PurchaseLine},
        sale::{NewSaleHeader, Sale, SaleItem, SaleLine},
        stock::{MovementKind, NewMovement, StockLevel, StockMovement},
    },
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, AppError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }
}

/// Unidade de trabalho sobre uma `sqlx::Transaction`.
/// Se for descartada sem `commit`, o sqlx faz rollback no drop.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }

    // ---
    // Catálogo
    // ---
    async fn find_part(&mut self, tenant_id: Uuid, part_id: Uuid) -> Result<Option<Part>, AppError> {
        let part = sqlx::query_as::<_, Part>("SELECT * FROM parts WHERE id = $1 AND tenant_id = $2")
            .bind(part_id)
            .bind(tenant_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(part)
    }

    async fn find_supplier(
        &mut self,
        tenant_id: Uuid,
        supplier_id: Uuid,
    ) -> Result<Option<Supplier>, AppError> {
        let supplier =
            sqlx::query_as::<_, Supplier>("SELECT * FROM suppliers WHERE id = $1 AND tenant_id = $2")
                .bind(supplier_id)
                .bind(tenant_id)
                .fetch_optional(&mut *self.tx)
                .await?;
        Ok(supplier)
    }

    async fn find_phone_model(
        &mut self,
        tenant_id: Uuid,
        phone_model_id: Uuid,
    ) -> Result<Option<PhoneModel>, AppError> {
        let model = sqlx::query_as::<_, PhoneModel>(
            "SELECT * FROM phone_models WHERE id = $1 AND tenant_id = $2",
        )
        .bind(phone_model_id)
        .bind(tenant_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(model)
    }

    async fn find_payment_config(&mut self, tenant_id: Uuid) -> Result<Option<PaymentConfig>, AppError> {
        let config = sqlx::query_as::<_, PaymentConfig>(
            r#"
            SELECT tenant_id, gateway, access_token, active
            FROM tenant_payment_configs
            WHERE tenant_id = $1
            "#,
        )
        .bind(tenant_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(config)
    }

    // ---
    // Livro-razão
    // ---
    async fn lock_stock_level(
        &mut self,
        tenant_id: Uuid,
        part_id: Uuid,
    ) -> Result<Option<StockLevel>, AppError> {
        let level = sqlx::query_as::<_, StockLevel>(
            r#"
            SELECT * FROM stock_levels
            WHERE tenant_id = $1 AND part_id = $2
            FOR UPDATE
            "#,
        )
        .bind(tenant_id)
        .bind(part_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(level)
    }

    async fn apply_stock_delta(
        &mut self,
        tenant_id: Uuid,
        part_id: Uuid,
        delta: i32,
    ) -> Result<StockLevel, AppError> {
        // UPSERT: cria o saldo na primeira movimentação da peça
        let level = sqlx::query_as::<_, StockLevel>(
            r#"
            INSERT INTO stock_levels (tenant_id, part_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (tenant_id, part_id) DO UPDATE
                SET quantity = stock_levels.quantity + EXCLUDED.quantity,
                    updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(part_id)
        .bind(delta)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(level)
    }

    async fn insert_movement(&mut self, movement: &NewMovement) -> Result<StockMovement, AppError> {
        let row = sqlx::query_as::<_, StockMovement>(
            r#"
            INSERT INTO stock_movements
                (tenant_id, part_id, supplier_id, purchase_id, sale_id,
                 kind, quantity, origin_movement_id, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(movement.tenant_id)
        .bind(movement.part_id)
        .bind(movement.supplier_id)
        .bind(movement.purchase_id)
        .bind(movement.sale_id)
        .bind(movement.kind)
        .bind(movement.quantity)
        .bind(movement.origin_movement_id)
        .bind(&movement.notes)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row)
    }

    async fn list_purchase_movements(
        &mut self,
        tenant_id: Uuid,
        purchase_id: Uuid,
        kind: MovementKind,
    ) -> Result<Vec<StockMovement>, AppError> {
        let rows = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT * FROM stock_movements
            WHERE tenant_id = $1 AND purchase_id = $2 AND kind = $3
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(tenant_id)
        .bind(purchase_id)
        .bind(kind)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows)
    }

    // ---
    // Compras
    // ---
    async fn insert_purchase(
        &mut self,
        tenant_id: Uuid,
        supplier_id: Uuid,
        notes: Option<&str>,
    ) -> Result<Purchase, AppError> {
        let purchase = sqlx::query_as::<_, Purchase>(
            r#"
            INSERT INTO purchases (tenant_id, supplier_id, notes)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(supplier_id)
        .bind(notes)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(purchase)
    }

    async fn insert_purchase_item(
        &mut self,
        tenant_id: Uuid,
        purchase_id: Uuid,
        line: &PurchaseLine,
    ) -> Result<PurchaseItem, AppError> {
        let item = sqlx::query_as::<_, PurchaseItem>(
            r#"
            INSERT INTO purchase_items (tenant_id, purchase_id, part_id, quantity, unit_cost)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(purchase_id)
        .bind(line.part_id)
        .bind(line.quantity)
        .bind(line.unit_cost)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(item)
    }

    async fn lock_purchase(
        &mut self,
        tenant_id: Uuid,
        purchase_id: Uuid,
    ) -> Result<Option<Purchase>, AppError> {
        let purchase = sqlx::query_as::<_, Purchase>(
            "SELECT * FROM purchases WHERE id = $1 AND tenant_id = $2 FOR UPDATE",
        )
        .bind(purchase_id)
        .bind(tenant_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(purchase)
    }

    async fn mark_purchase_reversed(
        &mut self,
        tenant_id: Uuid,
        purchase_id: Uuid,
        reversed_at: DateTime<Utc>,
    ) -> Result<Purchase, AppError> {
        let purchase = sqlx::query_as::<_, Purchase>(
            r#"
            UPDATE purchases
            SET status = 'ESTORNADA', reversed_at = $3
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            "#,
        )
        .bind(purchase_id)
        .bind(tenant_id)
        .bind(reversed_at)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(purchase)
    }

    // ---
    // Vendas
    // ---
    async fn insert_sale(&mut self, header: &NewSaleHeader) -> Result<Sale, AppError> {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            INSERT INTO sales
                (tenant_id, phone_model_id, customer_name, customer_phone,
                 payment_method, discount, total_amount, status, paid_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(header.tenant_id)
        .bind(header.phone_model_id)
        .bind(&header.customer_name)
        .bind(&header.customer_phone)
        .bind(header.payment_method)
        .bind(header.discount)
        .bind(header.total_amount)
        .bind(header.status)
        .bind(header.paid_at)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(sale)
    }

    async fn insert_sale_item(
        &mut self,
        tenant_id: Uuid,
        sale_id: Uuid,
        line: &SaleLine,
    ) -> Result<SaleItem, AppError> {
        let item = sqlx::query_as::<_, SaleItem>(
            r#"
            INSERT INTO sale_items (tenant_id, sale_id, part_id, quantity, unit_price, total_price)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(sale_id)
        .bind(line.part_id)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.total()?)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(item)
    }

    async fn lock_sale(&mut self, tenant_id: Uuid, sale_id: Uuid) -> Result<Option<Sale>, AppError> {
        let sale =
            sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE id = $1 AND tenant_id = $2 FOR UPDATE")
                .bind(sale_id)
                .bind(tenant_id)
                .fetch_optional(&mut *self.tx)
                .await?;
        Ok(sale)
    }

    async fn lock_sale_by_payment_id(&mut self, payment_id: &str) -> Result<Option<Sale>, AppError> {
        // Única busca sem tenant: o webhook só conhece o id externo.
        // O índice único parcial em payment_id garante no máximo uma linha.
        let sale = sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE payment_id = $1 FOR UPDATE")
            .bind(payment_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(sale)
    }

    async fn list_sale_items(
        &mut self,
        tenant_id: Uuid,
        sale_id: Uuid,
    ) -> Result<Vec<SaleItem>, AppError> {
        let items = sqlx::query_as::<_, SaleItem>(
            "SELECT * FROM sale_items WHERE tenant_id = $1 AND sale_id = $2 ORDER BY id",
        )
        .bind(tenant_id)
        .bind(sale_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(items)
    }

    async fn update_sale(&mut self, sale: &Sale) -> Result<Sale, AppError> {
        let updated = sqlx::query_as::<_, Sale>(
            r#"
            UPDATE sales
            SET status = $3,
                payment_method = $4,
                paid_at = $5,
                payment_id = $6,
                payment_status = $7,
                pix_qr_code = $8,
                pix_qr_code_base64 = $9
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            "#,
        )
        .bind(sale.id)
        .bind(sale.tenant_id)
        .bind(sale.status)
        .bind(sale.payment_method)
        .bind(sale.paid_at)
        .bind(&sale.payment_id)
        .bind(&sale.payment_status)
        .bind(&sale.pix_qr_code)
        .bind(&sale.pix_qr_code_base64)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(updated)
    }
}
