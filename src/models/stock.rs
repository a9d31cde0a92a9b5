// src/models/stock.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// --- Tipos de movimentação ---
// Quantidades são gravadas COM SINAL: a soma das movimentações de uma peça
// é sempre igual ao saldo em `stock_levels`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "movement_kind", rename_all = "lowercase")] // Banco
#[serde(rename_all = "lowercase")] // JSON
pub enum MovementKind {
    Entrada,   // compra (+)
    Saida,     // venda (-)
    Ajuste,    // correção manual (+/-)
    Defeito,   // peça descartada (-)
    Devolucao, // cancelamento de venda (+)
    Estorno,   // negação de uma movimentação anterior
}

impl MovementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MovementKind::Entrada => "entrada",
            MovementKind::Saida => "saida",
            MovementKind::Ajuste => "ajuste",
            MovementKind::Defeito => "defeito",
            MovementKind::Devolucao => "devolucao",
            MovementKind::Estorno => "estorno",
        }
    }
}

// --- Saldo atual (projeção) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockLevel {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub part_id: Uuid,
    #[schema(example = 12)]
    pub quantity: i32,
    pub updated_at: DateTime<Utc>,
}

// Saldo com os dados da peça, para listagens.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockLevelView {
    pub part_id: Uuid,
    pub part_name: Option<String>,
    pub internal_code: Option<String>,
    pub quantity: i32,
    pub updated_at: DateTime<Utc>,
}

// --- Movimentação (livro-razão, imutável) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub part_id: Uuid,
    pub supplier_id: Option<Uuid>,
    pub purchase_id: Option<Uuid>,
    pub sale_id: Option<Uuid>,
    pub kind: MovementKind,
    #[schema(example = -2)]
    pub quantity: i32,
    pub origin_movement_id: Option<Uuid>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

/// Lançamento ainda não gravado.
#[derive(Debug, Clone)]
pub struct NewMovement {
    pub tenant_id: Uuid,
    pub part_id: Uuid,
    pub kind: MovementKind,
    pub quantity: i32,
    pub origin_movement_id: Option<Uuid>,
    pub purchase_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub sale_id: Option<Uuid>,
    pub notes: String,
}

impl NewMovement {
    pub fn new(
        tenant_id: Uuid,
        part_id: Uuid,
        kind: MovementKind,
        quantity: i32,
        notes: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id,
            part_id,
            kind,
            quantity,
            origin_movement_id: None,
            purchase_id: None,
            supplier_id: None,
            sale_id: None,
            notes: notes.into(),
        }
    }

    pub fn with_purchase(mut self, purchase_id: Uuid, supplier_id: Option<Uuid>) -> Self {
        self.purchase_id = Some(purchase_id);
        self.supplier_id = supplier_id;
        self
    }

    pub fn with_origin(mut self, origin_movement_id: Uuid) -> Self {
        self.origin_movement_id = Some(origin_movement_id);
        self
    }

    pub fn with_sale(mut self, sale_id: Uuid) -> Self {
        self.sale_id = Some(sale_id);
        self
    }
}

// Filtro da listagem de movimentações
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct MovementFilter {
    pub kind: Option<MovementKind>,
    pub part_id: Option<Uuid>,
    pub purchase_id: Option<Uuid>,
}
