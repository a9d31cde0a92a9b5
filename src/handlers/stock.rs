// src/handlers/stock.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        rbac::{PermStockRead, PermStockWrite, RequirePermission},
        tenancy::TenantContext,
    },
    models::stock::{MovementFilter, MovementKind, StockLevelView, StockMovement},
    services::stock_service::StockAdjustment,
};

// ---
// Payload: ajuste manual / peça com defeito
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdjustStockPayload {
    pub part_id: Uuid,

    // "ajuste" (com sinal) ou "defeito" (contagem positiva)
    #[schema(example = "ajuste")]
    pub kind: MovementKind,

    #[validate(range(min = -100000, max = 100000, message = "Quantidade fora do limite."))]
    #[schema(example = -2)]
    pub quantity: i32,

    #[validate(length(max = 500, message = "Observação muito longa."))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdjustStockResponse {
    pub movement: StockMovement,
    // Saldo da peça após o ajuste
    pub quantity: i32,
}

#[utoipa::path(
    get,
    path = "/api/stock",
    tag = "Stock",
    responses((status = 200, description = "Saldo atual por peça", body = Vec<StockLevelView>)),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn list_levels(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    _guard: RequirePermission<PermStockRead>,
) -> Result<impl IntoResponse, ApiError> {
    let levels = app_state.stock_repo.list_levels(tenant.0).await?;
    Ok((StatusCode::OK, Json(levels)))
}

#[utoipa::path(
    get,
    path = "/api/stock/movements",
    tag = "Stock",
    responses((status = 200, description = "Movimentações (mais recentes primeiro)", body = Vec<StockMovement>)),
    params(
        MovementFilter,
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_movements(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    _guard: RequirePermission<PermStockRead>,
    Query(filter): Query<MovementFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let movements = app_state.stock_repo.list_movements(tenant.0, &filter).await?;
    Ok((StatusCode::OK, Json(movements)))
}

#[utoipa::path(
    post,
    path = "/api/stock/adjustments",
    tag = "Stock",
    request_body = AdjustStockPayload,
    responses(
        (status = 201, description = "Movimentação registrada", body = AdjustStockResponse),
        (status = 404, description = "Peça não encontrada"),
        (status = 422, description = "Estoque insuficiente")
    ),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn adjust_stock(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    _guard: RequirePermission<PermStockWrite>,
    Json(payload): Json<AdjustStockPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let input = StockAdjustment {
        tenant_id: tenant.0,
        part_id: payload.part_id,
        kind: payload.kind,
        quantity: payload.quantity,
        notes: payload.notes.filter(|n| !n.trim().is_empty()),
    };

    // 1. Abre a unidade de trabalho
    let mut uow = app_state.store.begin().await?;

    // 2. Regra de negócio
    let recorded = app_state.stock_service.adjust_stock(uow.as_mut(), input).await?;

    // 3. Commit
    uow.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(AdjustStockResponse {
            movement: recorded.movement,
            quantity: recorded.level.quantity,
        }),
    ))
}
