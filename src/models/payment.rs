// src/models/payment.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// Credenciais do gateway da loja (tabela `tenant_payment_configs`)
#[derive(Clone, FromRow)]
pub struct PaymentConfig {
    pub tenant_id: Uuid,
    pub gateway: String,
    pub access_token: String,
    pub active: bool,
}

impl std::fmt::Debug for PaymentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentConfig")
            .field("tenant_id", &self.tenant_id)
            .field("gateway", &self.gateway)
            .field("access_token", &"[REDACTED]")
            .field("active", &self.active)
            .finish()
    }
}

// Visão pública da configuração: o token nunca sai da API.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSettingsView {
    #[schema(example = "mercadopago")]
    pub gateway: String,
    pub public_key: Option<String>,
    pub active: bool,
    pub access_token_configured: bool,
}

#[derive(Debug, Clone)]
pub struct UpdatePaymentSettings {
    pub gateway: String,
    pub access_token: String,
    pub public_key: Option<String>,
    pub active: bool,
}

// --- Contrato do gateway ---

#[derive(Debug, Clone)]
pub struct CreatePaymentRequest {
    pub amount: Decimal,
    pub description: String,
    pub payer_email: String,
    pub idempotency_key: Uuid,
}

/// Cobrança PIX criada no gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedPayment {
    pub id: String,
    pub status: String,
    pub pix_qr_code: String,
    pub pix_qr_code_base64: String,
}

/// Situação autoritativa de um pagamento, consultada no gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayPayment {
    pub id: String,
    pub status: String,
    pub transaction_amount: Decimal,
}

impl GatewayPayment {
    pub const APPROVED: &'static str = "approved";

    pub fn is_approved(&self) -> bool {
        self.status == Self::APPROVED
    }
}

// --- Webhook de entrada ---

// O gateway manda o id ora como número, ora como string.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ExternalId {
    Number(u64),
    Text(String),
}

impl ExternalId {
    pub fn into_string(self) -> String {
        match self {
            ExternalId::Number(n) => n.to_string(),
            ExternalId::Text(s) => s,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookData {
    pub id: Option<ExternalId>,
}

/// Formato reconhecido: `{ "type": "payment", "data": { "id": <id> } }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookNotification {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub data: Option<WebhookData>,
}

impl WebhookNotification {
    /// Id do pagamento, apenas para eventos do tipo `payment`.
    pub fn payment_id(&self) -> Option<String> {
        if self.kind.as_deref() != Some("payment") {
            return None;
        }
        self.data
            .as_ref()
            .and_then(|d| d.id.clone())
            .map(ExternalId::into_string)
            .filter(|id| !id.trim().is_empty())
    }
}

/// Resultado do processamento de uma notificação. Nenhum deles é erro.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Ignored,
    SaleNotFound,
    AlreadyProcessed,
    SaleCancelled,
    NotApproved(String),
    Finalized,
}

impl WebhookOutcome {
    pub fn status_tag(&self) -> &'static str {
        match self {
            WebhookOutcome::Ignored => "ignored",
            WebhookOutcome::SaleNotFound => "sale not found",
            WebhookOutcome::AlreadyProcessed => "already processed",
            WebhookOutcome::SaleCancelled => "sale cancelled",
            WebhookOutcome::NotApproved(_) => "not approved",
            WebhookOutcome::Finalized => "ok",
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WebhookAck {
    #[schema(example = "ok")]
    pub status: String,
}
