// src/handlers/dashboard.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid; // Importante para o Swagger params

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{
        rbac::{PermReportsRead, RequirePermission},
        tenancy::TenantContext,
    },
    models::dashboard::{DailySalesEntry, DashboardKpis, PeriodQuery, TopPartEntry},
};

// GET /api/dashboard/kpis
#[utoipa::path(
    get,
    path = "/api/dashboard/kpis",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Vendido no período e posição atual do estoque", body = DashboardKpis),
        (status = 400, description = "Período inválido"),
        (status = 401, description = "Não autorizado"),
        (status = 403, description = "Sem acesso à loja")
    ),
    params(
        PeriodQuery,
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_kpis(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    _guard: RequirePermission<PermReportsRead>,
    Query(period): Query<PeriodQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let kpis = app_state
        .dashboard_service
        .get_kpis(&app_state.db_pool, tenant.0, &period)
        .await?;

    Ok((StatusCode::OK, Json(kpis)))
}

// GET /api/dashboard/daily-sales
#[utoipa::path(
    get,
    path = "/api/dashboard/daily-sales",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Total vendido por dia (padrão: últimos 30 dias)", body = Vec<DailySalesEntry>)
    ),
    params(
        PeriodQuery,
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_daily_sales(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    _guard: RequirePermission<PermReportsRead>,
    Query(period): Query<PeriodQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let chart = app_state
        .dashboard_service
        .get_daily_sales(tenant.0, &period)
        .await?;

    Ok((StatusCode::OK, Json(chart)))
}

// GET /api/dashboard/top-parts
#[utoipa::path(
    get,
    path = "/api/dashboard/top-parts",
    tag = "Dashboard",
    responses(
        (status = 200, description = "As 5 peças mais vendidas", body = Vec<TopPartEntry>)
    ),
    params(
        PeriodQuery,
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_top_parts(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    _guard: RequirePermission<PermReportsRead>,
    Query(period): Query<PeriodQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let parts = app_state
        .dashboard_service
        .get_top_parts(tenant.0, &period)
        .await?;

    Ok((StatusCode::OK, Json(parts)))
}
