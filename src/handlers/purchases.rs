// src/handlers/purchases.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        validation::validate_money,
    },
    config::AppState,
    middleware::{
        rbac::{PermStockRead, PermStockWrite, RequirePermission},
        tenancy::TenantContext,
    },
    models::purchase::{NewPurchase, Purchase, PurchaseDetail, PurchaseFilter, PurchaseLine},
};

// ---
// Payloads
// ---
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseLinePayload {
    pub part_id: Uuid,

    // Linhas com quantidade <= 0 são ignoradas
    #[validate(range(max = 100000, message = "Quantidade acima do limite."))]
    #[schema(example = 5)]
    pub quantity: i32,

    #[validate(custom(function = "validate_money"))]
    #[schema(example = 35.9)]
    pub unit_cost: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePurchasePayload {
    pub supplier_id: Uuid,

    #[validate(length(max = 500, message = "Observação muito longa."))]
    pub notes: Option<String>,

    #[validate(length(min = 1, message = "A compra precisa de ao menos um item."), nested)]
    pub items: Vec<PurchaseLinePayload>,
}

#[utoipa::path(
    post,
    path = "/api/purchases",
    tag = "Purchases",
    request_body = CreatePurchasePayload,
    responses(
        (status = 201, description = "Compra registrada com as entradas de estoque", body = PurchaseDetail),
        (status = 404, description = "Fornecedor ou peça não encontrados")
    ),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn create_purchase(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    _guard: RequirePermission<PermStockWrite>,
    Json(payload): Json<CreatePurchasePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let input = NewPurchase {
        tenant_id: tenant.0,
        supplier_id: payload.supplier_id,
        notes: payload.notes.filter(|n| !n.trim().is_empty()),
        lines: payload
            .items
            .into_iter()
            .map(|i| PurchaseLine {
                part_id: i.part_id,
                quantity: i.quantity,
                unit_cost: i.unit_cost,
            })
            .collect(),
    };

    let mut uow = app_state.store.begin().await?;
    let detail = app_state.purchase_service.create_purchase(uow.as_mut(), input).await?;
    uow.commit().await?;

    Ok((StatusCode::CREATED, Json(detail)))
}

#[utoipa::path(
    get,
    path = "/api/purchases",
    tag = "Purchases",
    responses((status = 200, description = "Compras da loja", body = Vec<Purchase>)),
    params(
        PurchaseFilter,
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_purchases(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    _guard: RequirePermission<PermStockRead>,
    Query(filter): Query<PurchaseFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let purchases = app_state
        .purchase_repo
        .list_purchases(tenant.0, filter.status)
        .await?;
    Ok((StatusCode::OK, Json(purchases)))
}

#[utoipa::path(
    get,
    path = "/api/purchases/{purchase_id}",
    tag = "Purchases",
    responses(
        (status = 200, description = "Compra com itens", body = PurchaseDetail),
        (status = 404, description = "Compra não encontrada")
    ),
    params(
        ("purchase_id" = Uuid, Path, description = "ID da Compra"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_purchase(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    _guard: RequirePermission<PermStockRead>,
    Path(purchase_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = app_state
        .purchase_repo
        .find_detail(tenant.0, purchase_id)
        .await?
        .ok_or(AppError::NotFound("Compra"))?;
    Ok((StatusCode::OK, Json(detail)))
}

// Estorno: tudo ou nada
#[utoipa::path(
    post,
    path = "/api/purchases/{purchase_id}/reverse",
    tag = "Purchases",
    responses(
        (status = 200, description = "Compra estornada", body = Purchase),
        (status = 404, description = "Compra não encontrada"),
        (status = 409, description = "Compra já estornada"),
        (status = 422, description = "Estoque insuficiente ou sem entradas")
    ),
    params(
        ("purchase_id" = Uuid, Path, description = "ID da Compra"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn reverse_purchase(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    _guard: RequirePermission<PermStockWrite>,
    Path(purchase_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut uow = app_state.store.begin().await?;
    let purchase = app_state
        .purchase_service
        .reverse_purchase(uow.as_mut(), tenant.0, purchase_id)
        .await?;
    uow.commit().await?;

    Ok((StatusCode::OK, Json(purchase)))
}
