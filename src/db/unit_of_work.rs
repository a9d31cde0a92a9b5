// src/db/unit_of_work.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        catalog::{Part, PhoneModel, Supplier},
        payment::PaymentConfig,
        purchase::{Purchase, PurchaseItem, PurchaseLine},
        sale::{NewSaleHeader, Sale, SaleItem, SaleLine},
        stock::{MovementKind, NewMovement, StockLevel, StockMovement},
    },
};

/// Abre transações. Cada requisição / webhook usa uma unidade de trabalho própria.
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, AppError>;
}

/// Uma transação explícita sobre o banco.
///
/// `commit` consome a unidade; descartá-la sem commit desfaz tudo (rollback).
/// Toda consulta é filtrada por `tenant_id`, com uma única exceção:
/// `lock_sale_by_payment_id`, usada pelo webhook antes de conhecer a loja.
#[async_trait]
pub trait UnitOfWork: Send {
    async fn commit(self: Box<Self>) -> Result<(), AppError>;

    // ---
    // Catálogo (apenas leitura, para integridade referencial por loja)
    // ---
    async fn find_part(&mut self, tenant_id: Uuid, part_id: Uuid) -> Result<Option<Part>, AppError>;

    async fn find_supplier(
        &mut self,
        tenant_id: Uuid,
        supplier_id: Uuid,
    ) -> Result<Option<Supplier>, AppError>;

    async fn find_phone_model(
        &mut self,
        tenant_id: Uuid,
        phone_model_id: Uuid,
    ) -> Result<Option<PhoneModel>, AppError>;

    async fn find_payment_config(&mut self, tenant_id: Uuid) -> Result<Option<PaymentConfig>, AppError>;

    // ---
    // Livro-razão
    // ---
    /// SELECT ... FOR UPDATE no saldo da peça (None se a peça nunca movimentou).
    async fn lock_stock_level(
        &mut self,
        tenant_id: Uuid,
        part_id: Uuid,
    ) -> Result<Option<StockLevel>, AppError>;

    /// Soma `delta` ao saldo, criando a linha se ainda não existir.
    async fn apply_stock_delta(
        &mut self,
        tenant_id: Uuid,
        part_id: Uuid,
        delta: i32,
    ) -> Result<StockLevel, AppError>;

    async fn insert_movement(&mut self, movement: &NewMovement) -> Result<StockMovement, AppError>;

    async fn list_purchase_movements(
        &mut self,
        tenant_id: Uuid,
        purchase_id: Uuid,
        kind: MovementKind,
    ) -> Result<Vec<StockMovement>, AppError>;

    // ---
    // Compras
    // ---
    async fn insert_purchase(
        &mut self,
        tenant_id: Uuid,
        supplier_id: Uuid,
        notes: Option<&str>,
    ) -> Result<Purchase, AppError>;

    async fn insert_purchase_item(
        &mut self,
        tenant_id: Uuid,
        purchase_id: Uuid,
        line: &PurchaseLine,
    ) -> Result<PurchaseItem, AppError>;

    async fn lock_purchase(
        &mut self,
        tenant_id: Uuid,
        purchase_id: Uuid,
    ) -> Result<Option<Purchase>, AppError>;

    async fn mark_purchase_reversed(
        &mut self,
        tenant_id: Uuid,
        purchase_id: Uuid,
        reversed_at: DateTime<Utc>,
    ) -> Result<Purchase, AppError>;

    // ---
    // Vendas
    // ---
    async fn insert_sale(&mut self, header: &NewSaleHeader) -> Result<Sale, AppError>;

    async fn insert_sale_item(
        &mut self,
        tenant_id: Uuid,
        sale_id: Uuid,
        line: &SaleLine,
    ) -> Result<SaleItem, AppError>;

    async fn lock_sale(&mut self, tenant_id: Uuid, sale_id: Uuid) -> Result<Option<Sale>, AppError>;

    async fn lock_sale_by_payment_id(&mut self, payment_id: &str) -> Result<Option<Sale>, AppError>;

    async fn list_sale_items(
        &mut self,
        tenant_id: Uuid,
        sale_id: Uuid,
    ) -> Result<Vec<SaleItem>, AppError>;

    /// Grava os campos mutáveis da venda: status, forma de pagamento,
    /// pago_em e os dados do PIX.
    async fn update_sale(&mut self, sale: &Sale) -> Result<Sale, AppError>;
}
