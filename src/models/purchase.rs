// src/models/purchase.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// ATIVA -> ESTORNADA é uma transição de mão única.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "purchase_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseStatus {
    Ativa,
    Estornada,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub supplier_id: Uuid,
    pub notes: Option<String>,
    pub status: PurchaseStatus,
    pub created_at: DateTime<Utc>,
    pub reversed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseItem {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub purchase_id: Uuid,
    pub part_id: Uuid,
    #[schema(example = 5)]
    pub quantity: i32,
    #[schema(example = "10.00")]
    pub unit_cost: Decimal,
}

// Linha de entrada de uma compra
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseLine {
    pub part_id: Uuid,
    pub quantity: i32,
    pub unit_cost: Decimal,
}

#[derive(Debug, Clone)]
pub struct NewPurchase {
    pub tenant_id: Uuid,
    pub supplier_id: Uuid,
    pub notes: Option<String>,
    pub lines: Vec<PurchaseLine>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseDetail {
    #[serde(flatten)]
    pub purchase: Purchase,
    pub items: Vec<PurchaseItem>,
}

impl PurchaseDetail {
    pub fn total_cost(&self) -> Decimal {
        self.items
            .iter()
            .map(|i| Decimal::from(i.quantity) * i.unit_cost)
            .sum()
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PurchaseFilter {
    pub status: Option<PurchaseStatus>,
}
