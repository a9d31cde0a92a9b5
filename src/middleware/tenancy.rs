// src/middleware/tenancy.rs

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, StatusCode},
};
use uuid::Uuid;

use crate::common::error::{ApiError, AppError};

// O nome do nosso cabeçalho HTTP customizado
const TENANT_ID_HEADER: &str = "x-tenant-id";

// Loja (tenant) da requisição, já validada pelo `tenant_guard`.
#[derive(Debug, Clone, Copy)]
pub struct TenantContext(pub Uuid);

pub(crate) fn parse_tenant_header(headers: &HeaderMap) -> Result<Uuid, AppError> {
    let value = headers
        .get(TENANT_ID_HEADER)
        .ok_or_else(|| AppError::InvalidInput("O cabeçalho X-Tenant-ID é obrigatório.".to_string()))?;

    let value_str = value.to_str().map_err(|_| {
        AppError::InvalidInput("Cabeçalho X-Tenant-ID contém caracteres inválidos.".to_string())
    })?;

    Uuid::parse_str(value_str.trim())
        .map_err(|_| AppError::InvalidInput("Cabeçalho X-Tenant-ID inválido (não é um UUID).".to_string()))
}

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantContext>()
            .copied()
            .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "Contexto da loja não encontrado"))
    }
}
