// src/models/catalog.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- 1. Marcas de celular ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = "Samsung")]
    pub name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

// --- 2. Modelos de celular ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PhoneModel {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub brand_id: Uuid,
    #[schema(example = "Galaxy A52")]
    pub name: String,
    // ex: 2021, Pro, Plus
    #[schema(example = "5G")]
    pub variant: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

// --- 3. Peças ---
// Unidade vendável/comprável do catálogo. O saldo fica em `stock_levels`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = "Tela")]
    pub part_type: String,
    // original | primeira_linha | compativel
    #[schema(example = "original")]
    pub quality: String,
    pub name: Option<String>,
    #[schema(example = "TL-A52-ORI")]
    pub internal_code: Option<String>,
    pub part_brand: Option<String>,
    #[schema(example = "250.00")]
    pub sale_price: Decimal,
    pub min_price: Option<Decimal>,
    pub image_path: Option<String>,
    pub notes: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

// --- 4. Compatibilidade Peça <-> Modelo ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PartCompatibility {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub part_id: Uuid,
    pub phone_model_id: Uuid,
}

// --- 5. Fornecedores ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = "Distribuidora Central")]
    pub name: String,
    pub document: Option<String>,
    // PF | PJ
    #[schema(example = "PJ")]
    pub kind: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

// Dados de criação de peça (vindo do handler já validado)
#[derive(Debug, Clone)]
pub struct NewPart {
    pub part_type: String,
    pub quality: String,
    pub name: Option<String>,
    pub internal_code: Option<String>,
    pub part_brand: Option<String>,
    pub sale_price: Decimal,
    pub min_price: Option<Decimal>,
    pub image_path: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewSupplier {
    pub name: String,
    pub document: Option<String>,
    pub kind: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
}

// Onde a peça já aparece; qualquer uso impede a exclusão
#[derive(Debug, Clone, Copy, Default, FromRow)]
pub struct PartUsage {
    pub sale_items: i64,
    pub purchase_items: i64,
    pub movements: i64,
}

impl PartUsage {
    pub fn delete_blocker(&self) -> Option<&'static str> {
        if self.sale_items > 0 {
            Some("Não é possível excluir. Peça usada em vendas.")
        } else if self.purchase_items > 0 {
            Some("Não é possível excluir. Peça usada em compras.")
        } else if self.movements > 0 {
            Some("Não é possível excluir. Peça com movimentações de estoque.")
        } else {
            None
        }
    }
}
