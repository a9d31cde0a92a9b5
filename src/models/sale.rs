// src/models/sale.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::common::{
    error::AppError,
    validation::{ensure_money, max_money},
};

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "sale_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleStatus {
    Orcamento,           // cotação, sem efeito no estoque
    AguardandoPagamento, // PIX online pendente
    Finalizada,
    Cancelada,
}

impl SaleStatus {
    /// Transições permitidas. ORCAMENTO só vira FINALIZADA pela conversão explícita.
    pub fn can_transition_to(self, next: SaleStatus) -> bool {
        matches!(
            (self, next),
            (SaleStatus::Orcamento, SaleStatus::Finalizada)
                | (SaleStatus::AguardandoPagamento, SaleStatus::Finalizada)
                | (SaleStatus::AguardandoPagamento, SaleStatus::Cancelada)
                | (SaleStatus::Finalizada, SaleStatus::Cancelada)
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "payment_method", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Dinheiro,
    Pix, // PIX confirmado no balcão
    Cartao,
}

// --- Structs de Operação ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub phone_model_id: Uuid,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    // None para orçamentos
    pub payment_method: Option<PaymentMethod>,
    #[schema(example = "0.00")]
    pub discount: Decimal,
    #[schema(example = "200.00")]
    pub total_amount: Decimal,
    pub status: SaleStatus,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,

    // PIX online
    pub payment_id: Option<String>,
    pub payment_status: Option<String>,
    pub pix_qr_code: Option<String>,
    pub pix_qr_code_base64: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub sale_id: Uuid,
    pub part_id: Uuid,
    #[schema(example = 4)]
    pub quantity: i32,
    #[schema(example = "50.00")]
    pub unit_price: Decimal,
    #[schema(example = "200.00")]
    pub total_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleLine {
    pub part_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl SaleLine {
    /// qtd × preço, limitado ao que cabe em NUMERIC(10, 2).
    pub fn total(&self) -> Result<Decimal, AppError> {
        Decimal::from(self.quantity)
            .checked_mul(self.unit_price)
            .filter(|total| total.abs() <= max_money())
            .ok_or_else(|| {
                AppError::InvalidInput(format!("O total do item da peça {} excede o limite.", self.part_id))
            })
    }
}

/// Como a venda nasce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaleKind {
    /// Dinheiro / cartão / PIX no balcão: FINALIZADA, baixa o estoque na hora.
    Direct(PaymentMethod),
    /// PIX online: AGUARDANDO_PAGAMENTO até o webhook confirmar.
    PixOnline,
    /// Orçamento: nenhum efeito no estoque.
    Quote,
}

impl SaleKind {
    pub fn initial_status(self) -> SaleStatus {
        match self {
            SaleKind::Direct(_) => SaleStatus::Finalizada,
            SaleKind::PixOnline => SaleStatus::AguardandoPagamento,
            SaleKind::Quote => SaleStatus::Orcamento,
        }
    }

    pub fn payment_method(self) -> Option<PaymentMethod> {
        match self {
            SaleKind::Direct(method) => Some(method),
            SaleKind::PixOnline => Some(PaymentMethod::Pix),
            SaleKind::Quote => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewSale {
    pub tenant_id: Uuid,
    pub phone_model_id: Uuid,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub discount: Decimal,
    pub lines: Vec<SaleLine>,
    pub kind: SaleKind,
}

/// Cabeçalho gravado antes dos itens.
#[derive(Debug, Clone)]
pub struct NewSaleHeader {
    pub tenant_id: Uuid,
    pub phone_model_id: Uuid,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub discount: Decimal,
    pub total_amount: Decimal,
    pub status: SaleStatus,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleDetail {
    #[serde(flatten)]
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

// Resposta enxuta para o polling da tela de PIX
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleStatusView {
    pub status: SaleStatus,
    pub payment_status: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub pix_qr_code: Option<String>,
    pub pix_qr_code_base64: Option<String>,
}

impl From<&Sale> for SaleStatusView {
    fn from(sale: &Sale) -> Self {
        Self {
            status: sale.status,
            payment_status: sale.payment_status.clone(),
            payment_method: sale.payment_method,
            pix_qr_code: sale.pix_qr_code.clone(),
            pix_qr_code_base64: sale.pix_qr_code_base64.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SaleFilter {
    pub status: Option<SaleStatus>,
}

/// valor_total = Σ(qtd × preço) − desconto.
/// O desconto não pode ser negativo nem maior que o subtotal.
pub fn compute_total(lines: &[SaleLine], discount: Decimal) -> Result<Decimal, AppError> {
    if discount.is_sign_negative() && !discount.is_zero() {
        return Err(AppError::InvalidInput("O desconto não pode ser negativo.".into()));
    }
    ensure_money(discount, "Desconto")?;

    let mut subtotal = Decimal::ZERO;
    for line in lines {
        ensure_money(line.unit_price, "Preço unitário")?;
        subtotal = subtotal
            .checked_add(line.total()?)
            .filter(|s| *s <= max_money())
            .ok_or_else(|| AppError::InvalidInput("O subtotal da venda excede o limite.".into()))?;
    }
    if discount > subtotal {
        return Err(AppError::InvalidInput(format!(
            "O desconto ({discount}) é maior que o subtotal ({subtotal})."
        )));
    }
    Ok(subtotal - discount)
}
