// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::models::sale::SaleStatus;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Dados inválidos: {0}")]
    InvalidInput(String),

    #[error("Registro duplicado: {0}")]
    Conflict(String),

    #[error("{0} não encontrado(a)")]
    NotFound(&'static str),

    // --- Livro-razão / workflows ---
    #[error("Esta compra já foi estornada")]
    PurchaseAlreadyReversed,

    #[error("Nenhuma movimentação de entrada encontrada para estorno")]
    NoMovementsFound,

    #[error("Estoque insuficiente para a peça {part_id}: disponível {available}, necessário {required}")]
    InsufficientStock {
        part_id: Uuid,
        available: i32,
        required: i32,
    },

    #[error("Esta venda já está cancelada")]
    SaleAlreadyCancelled,

    #[error("Transição de status inválida: {from:?} -> {to:?}")]
    InvalidSaleTransition { from: SaleStatus, to: SaleStatus },

    // --- Pagamento ---
    #[error("Valor divergente: esperado {expected}, recebido {received}")]
    AmountMismatch { expected: Decimal, received: Decimal },

    #[error("Gateway de pagamento indisponível: {0}")]
    GatewayUnavailable(String),

    #[error("Resposta inválida do gateway de pagamento: {0}")]
    GatewayResponse(String),

    #[error("Loja sem configuração de pagamento ativa")]
    PaymentNotConfigured,

    // --- Autenticação ---
    #[error("Token inválido")]
    InvalidToken,

    #[error("Assinatura do webhook inválida")]
    InvalidSignature,

    #[error("Acesso negado: {0}")]
    Forbidden(String),

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),
}

// A resposta de erro que vai para o cliente (também usada como rejeição dos extratores).
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self { status, error: error.into(), details: None }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PurchaseAlreadyReversed
            | AppError::SaleAlreadyCancelled
            | AppError::InvalidSaleTransition { .. } => StatusCode::CONFLICT,
            AppError::NoMovementsFound
            | AppError::InsufficientStock { .. }
            | AppError::PaymentNotConfigured => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::AmountMismatch { .. } => StatusCode::BAD_REQUEST,
            AppError::GatewayUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::GatewayResponse(_) => StatusCode::BAD_GATEWAY,
            AppError::InvalidToken | AppError::InvalidSignature => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Converte o erro de domínio na resposta pública.
    pub fn to_api_error(&self) -> ApiError {
        let status = self.status_code();
        match self {
            // Retorna todos os detalhes da validação.
            AppError::ValidationError(errors) => {
                let mut details = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), json!(messages));
                }
                ApiError {
                    status,
                    error: "Um ou mais campos são inválidos.".to_string(),
                    details: Some(Value::Object(details)),
                }
            }
            AppError::InsufficientStock { part_id, available, required } => ApiError {
                status,
                error: self.to_string(),
                details: Some(json!({
                    "partId": part_id,
                    "available": available,
                    "required": required,
                })),
            },
            AppError::GatewayUnavailable(_) | AppError::GatewayResponse(_) => {
                tracing::warn!("Falha no gateway de pagamento: {}", self);
                ApiError::new(status, "O gateway de pagamento não respondeu corretamente.")
            }
            // Erros internos: loga o detalhe e devolve mensagem genérica.
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                tracing::error!("Erro Interno do Servidor: {}", self);
                ApiError::new(status, "Ocorreu um erro inesperado.")
            }
            _ => ApiError::new(status, self.to_string()),
        }
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        err.to_api_error()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error().into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_errors_map_to_client_statuses() {
        assert_eq!(AppError::PurchaseAlreadyReversed.status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::SaleAlreadyCancelled.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::InsufficientStock { part_id: Uuid::nil(), available: 1, required: 5 }
                .status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::GatewayUnavailable("timeout".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn internal_errors_hide_details() {
        let api = AppError::InternalServerError(anyhow::anyhow!("senha do banco: 123")).to_api_error();
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!api.error.contains("123"));
    }

    #[test]
    fn insufficient_stock_carries_details() {
        let part_id = Uuid::new_v4();
        let api = AppError::InsufficientStock { part_id, available: 2, required: 5 }.to_api_error();
        let details = api.details.expect("detalhes presentes");
        assert_eq!(details["available"], 2);
        assert_eq!(details["required"], 5);
    }
}
