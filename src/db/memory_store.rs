// src/db/memory_store.rs
//
// Store em memória para os testes dos workflows. Cada unidade de trabalho
// segura o mutex do estado inteiro até o commit/drop (serializa tudo, como
// um lock de linha bem grosso) e trabalha sobre uma cópia: commit grava a
// cópia de volta, drop descarta.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::unit_of_work::{Store, UnitOfWork},
    models::{
        catalog::{Part, PhoneModel, Supplier},
        payment::PaymentConfig,
        purchase::{Purchase, PurchaseItem, PurchaseLine, PurchaseStatus},
        sale::{NewSaleHeader, Sale, SaleItem, SaleLine},
        stock::{MovementKind, NewMovement, StockLevel, StockMovement},
    },
};

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub parts: Vec<Part>,
    pub suppliers: Vec<Supplier>,
    pub phone_models: Vec<PhoneModel>,
    pub payment_configs: Vec<PaymentConfig>,
    pub stock_levels: HashMap<(Uuid, Uuid), StockLevel>,
    pub movements: Vec<StockMovement>,
    pub purchases: Vec<Purchase>,
    pub purchase_items: Vec<PurchaseItem>,
    pub sales: Vec<Sale>,
    pub sale_items: Vec<SaleItem>,
}

impl MemoryState {
    pub fn stock_of(&self, tenant_id: Uuid, part_id: Uuid) -> i32 {
        self.stock_levels
            .get(&(tenant_id, part_id))
            .map(|l| l.quantity)
            .unwrap_or(0)
    }

    pub fn movement_sum(&self, tenant_id: Uuid, part_id: Uuid) -> i32 {
        self.movements
            .iter()
            .filter(|m| m.tenant_id == tenant_id && m.part_id == part_id)
            .map(|m| m.quantity)
            .sum()
    }

    pub fn movements_of_kind(&self, kind: MovementKind) -> Vec<&StockMovement> {
        self.movements.iter().filter(|m| m.kind == kind).collect()
    }

    pub fn sale(&self, sale_id: Uuid) -> Option<&Sale> {
        self.sales.iter().find(|s| s.id == sale_id)
    }

    pub fn purchase(&self, purchase_id: Uuid) -> Option<&Purchase> {
        self.purchases.iter().find(|p| p.id == purchase_id)
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }

    // --- Dados de apoio para os testes ---

    pub async fn seed_part(&self, tenant_id: Uuid, sale_price: Decimal) -> Part {
        let part = Part {
            id: Uuid::new_v4(),
            tenant_id,
            part_type: "Tela".into(),
            quality: "original".into(),
            name: Some("Tela teste".into()),
            internal_code: Some(format!("TL-{}", &Uuid::new_v4().simple().to_string()[..6])),
            part_brand: None,
            sale_price,
            min_price: None,
            image_path: None,
            notes: None,
            active: true,
            created_at: Utc::now(),
        };
        self.state.lock().await.parts.push(part.clone());
        part
    }

    pub async fn deactivate_part(&self, part_id: Uuid) {
        if let Some(part) = self.state.lock().await.parts.iter_mut().find(|p| p.id == part_id) {
            part.active = false;
        }
    }

    pub async fn seed_supplier(&self, tenant_id: Uuid) -> Supplier {
        let supplier = Supplier {
            id: Uuid::new_v4(),
            tenant_id,
            name: "Distribuidora Central".into(),
            document: None,
            kind: "PJ".into(),
            phone: None,
            email: None,
            notes: None,
            active: true,
            created_at: Utc::now(),
        };
        self.state.lock().await.suppliers.push(supplier.clone());
        supplier
    }

    pub async fn seed_phone_model(&self, tenant_id: Uuid) -> PhoneModel {
        let model = PhoneModel {
            id: Uuid::new_v4(),
            tenant_id,
            brand_id: Uuid::new_v4(),
            name: "Galaxy A52".into(),
            variant: None,
            active: true,
            created_at: Utc::now(),
        };
        self.state.lock().await.phone_models.push(model.clone());
        model
    }

    pub async fn seed_payment_config(&self, tenant_id: Uuid, access_token: &str) {
        self.state.lock().await.payment_configs.push(PaymentConfig {
            tenant_id,
            gateway: "mercadopago".into(),
            access_token: access_token.into(),
            active: true,
        });
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, AppError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryUnitOfWork { guard, working }))
    }
}

pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let MemoryUnitOfWork { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }

    async fn find_part(&mut self, tenant_id: Uuid, part_id: Uuid) -> Result<Option<Part>, AppError> {
        Ok(self
            .working
            .parts
            .iter()
            .find(|p| p.id == part_id && p.tenant_id == tenant_id)
            .cloned())
    }

    async fn find_supplier(
        &mut self,
        tenant_id: Uuid,
        supplier_id: Uuid,
    ) -> Result<Option<Supplier>, AppError> {
        Ok(self
            .working
            .suppliers
            .iter()
            .find(|s| s.id == supplier_id && s.tenant_id == tenant_id)
            .cloned())
    }

    async fn find_phone_model(
        &mut self,
        tenant_id: Uuid,
        phone_model_id: Uuid,
    ) -> Result<Option<PhoneModel>, AppError> {
        Ok(self
            .working
            .phone_models
            .iter()
            .find(|m| m.id == phone_model_id && m.tenant_id == tenant_id)
            .cloned())
    }

    async fn find_payment_config(&mut self, tenant_id: Uuid) -> Result<Option<PaymentConfig>, AppError> {
        Ok(self
            .working
            .payment_configs
            .iter()
            .find(|c| c.tenant_id == tenant_id)
            .cloned())
    }

    async fn lock_stock_level(
        &mut self,
        tenant_id: Uuid,
        part_id: Uuid,
    ) -> Result<Option<StockLevel>, AppError> {
        Ok(self.working.stock_levels.get(&(tenant_id, part_id)).cloned())
    }

    async fn apply_stock_delta(
        &mut self,
        tenant_id: Uuid,
        part_id: Uuid,
        delta: i32,
    ) -> Result<StockLevel, AppError> {
        let level = self
            .working
            .stock_levels
            .entry((tenant_id, part_id))
            .or_insert_with(|| StockLevel {
                id: Uuid::new_v4(),
                tenant_id,
                part_id,
                quantity: 0,
                updated_at: Utc::now(),
            });
        level.quantity += delta;
        level.updated_at = Utc::now();
        Ok(level.clone())
    }

    async fn insert_movement(&mut self, movement: &NewMovement) -> Result<StockMovement, AppError> {
        let row = StockMovement {
            id: Uuid::new_v4(),
            tenant_id: movement.tenant_id,
            part_id: movement.part_id,
            supplier_id: movement.supplier_id,
            purchase_id: movement.purchase_id,
            sale_id: movement.sale_id,
            kind: movement.kind,
            quantity: movement.quantity,
            origin_movement_id: movement.origin_movement_id,
            notes: movement.notes.clone(),
            created_at: Utc::now(),
        };
        self.working.movements.push(row.clone());
        Ok(row)
    }

    async fn list_purchase_movements(
        &mut self,
        tenant_id: Uuid,
        purchase_id: Uuid,
        kind: MovementKind,
    ) -> Result<Vec<StockMovement>, AppError> {
        Ok(self
            .working
            .movements
            .iter()
            .filter(|m| {
                m.tenant_id == tenant_id && m.purchase_id == Some(purchase_id) && m.kind == kind
            })
            .cloned()
            .collect())
    }

    async fn insert_purchase(
        &mut self,
        tenant_id: Uuid,
        supplier_id: Uuid,
        notes: Option<&str>,
    ) -> Result<Purchase, AppError> {
        let purchase = Purchase {
            id: Uuid::new_v4(),
            tenant_id,
            supplier_id,
            notes: notes.map(str::to_string),
            status: PurchaseStatus::Ativa,
            created_at: Utc::now(),
            reversed_at: None,
        };
        self.working.purchases.push(purchase.clone());
        Ok(purchase)
    }

    async fn insert_purchase_item(
        &mut self,
        tenant_id: Uuid,
        purchase_id: Uuid,
        line: &PurchaseLine,
    ) -> Result<PurchaseItem, AppError> {
        let item = PurchaseItem {
            id: Uuid::new_v4(),
            tenant_id,
            purchase_id,
            part_id: line.part_id,
            quantity: line.quantity,
            unit_cost: line.unit_cost,
        };
        self.working.purchase_items.push(item.clone());
        Ok(item)
    }

    async fn lock_purchase(
        &mut self,
        tenant_id: Uuid,
        purchase_id: Uuid,
    ) -> Result<Option<Purchase>, AppError> {
        Ok(self
            .working
            .purchases
            .iter()
            .find(|p| p.id == purchase_id && p.tenant_id == tenant_id)
            .cloned())
    }

    async fn mark_purchase_reversed(
        &mut self,
        tenant_id: Uuid,
        purchase_id: Uuid,
        reversed_at: DateTime<Utc>,
    ) -> Result<Purchase, AppError> {
        let purchase = self
            .working
            .purchases
            .iter_mut()
            .find(|p| p.id == purchase_id && p.tenant_id == tenant_id)
            .ok_or(AppError::NotFound("Compra"))?;
        purchase.status = PurchaseStatus::Estornada;
        purchase.reversed_at = Some(reversed_at);
        Ok(purchase.clone())
    }

    async fn insert_sale(&mut self, header: &NewSaleHeader) -> Result<Sale, AppError> {
        let sale = Sale {
            id: Uuid::new_v4(),
            tenant_id: header.tenant_id,
            phone_model_id: header.phone_model_id,
            customer_name: header.customer_name.clone(),
            customer_phone: header.customer_phone.clone(),
            payment_method: header.payment_method,
            discount: header.discount,
            total_amount: header.total_amount,
            status: header.status,
            created_at: Utc::now(),
            paid_at: header.paid_at,
            payment_id: None,
            payment_status: None,
            pix_qr_code: None,
            pix_qr_code_base64: None,
        };
        self.working.sales.push(sale.clone());
        Ok(sale)
    }

    async fn insert_sale_item(
        &mut self,
        tenant_id: Uuid,
        sale_id: Uuid,
        line: &SaleLine,
    ) -> Result<SaleItem, AppError> {
        let item = SaleItem {
            id: Uuid::new_v4(),
            tenant_id,
            sale_id,
            part_id: line.part_id,
            quantity: line.quantity,
            unit_price: line.unit_price,
            total_price: line.total()?,
        };
        self.working.sale_items.push(item.clone());
        Ok(item)
    }

    async fn lock_sale(&mut self, tenant_id: Uuid, sale_id: Uuid) -> Result<Option<Sale>, AppError> {
        Ok(self
            .working
            .sales
            .iter()
            .find(|s| s.id == sale_id && s.tenant_id == tenant_id)
            .cloned())
    }

    async fn lock_sale_by_payment_id(&mut self, payment_id: &str) -> Result<Option<Sale>, AppError> {
        Ok(self
            .working
            .sales
            .iter()
            .find(|s| s.payment_id.as_deref() == Some(payment_id))
            .cloned())
    }

    async fn list_sale_items(
        &mut self,
        tenant_id: Uuid,
        sale_id: Uuid,
    ) -> Result<Vec<SaleItem>, AppError> {
        Ok(self
            .working
            .sale_items
            .iter()
            .filter(|i| i.tenant_id == tenant_id && i.sale_id == sale_id)
            .cloned()
            .collect())
    }

    async fn update_sale(&mut self, sale: &Sale) -> Result<Sale, AppError> {
        let row = self
            .working
            .sales
            .iter_mut()
            .find(|s| s.id == sale.id && s.tenant_id == sale.tenant_id)
            .ok_or(AppError::NotFound("Venda"))?;
        row.status = sale.status;
        row.payment_method = sale.payment_method;
        row.paid_at = sale.paid_at;
        row.payment_id = sale.payment_id.clone();
        row.payment_status = sale.payment_status.clone();
        row.pix_qr_code = sale.pix_qr_code.clone();
        row.pix_qr_code_base64 = sale.pix_qr_code_base64.clone();
        Ok(row.clone())
    }
}
