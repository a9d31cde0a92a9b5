// src/handlers/sales.rs

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
        rbac::{PermSalesRead, PermSalesWrite, RequirePermission},
        tenancy::TenantContext,
    },
    models::sale::{
        NewSale, PaymentMethod, Sale, SaleDetail, SaleFilter, SaleKind, SaleLine, SaleStatusView,
    },
};

// ---
// Forma de pagamento escolhida no balcão
// ---
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SaleKindPayload {
    Dinheiro,
    Cartao,
    // PIX conferido no balcão
    Pix,
    // QR code gerado pelo gateway
    PixOnline,
    Orcamento,
}

impl From<SaleKindPayload> for SaleKind {
    fn from(kind: SaleKindPayload) -> Self {
        match kind {
            SaleKindPayload::Dinheiro => SaleKind::Direct(PaymentMethod::Dinheiro),
            SaleKindPayload::Cartao => SaleKind::Direct(PaymentMethod::Cartao),
            SaleKindPayload::Pix => SaleKind::Direct(PaymentMethod::Pix),
            SaleKindPayload::PixOnline => SaleKind::PixOnline,
            SaleKindPayload::Orcamento => SaleKind::Quote,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleLinePayload {
    pub part_id: Uuid,

    // Linhas com quantidade <= 0 são ignoradas
    #[validate(range(max = 100000, message = "Quantidade acima do limite."))]
    #[schema(example = 1)]
    pub quantity: i32,

    #[validate(custom(function = "validate_money"))]
    #[schema(example = 180.0)]
    pub unit_price: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSalePayload {
    pub phone_model_id: Uuid,

    #[validate(length(max = 120, message = "Nome do cliente muito longo."))]
    pub customer_name: Option<String>,

    #[validate(length(max = 20, message = "Telefone inválido."))]
    pub customer_phone: Option<String>,

    #[schema(example = "dinheiro")]
    pub kind: SaleKindPayload,

    #[validate(custom(function = "validate_money"))]
    #[serde(default)]
    pub discount: Decimal,

    #[validate(length(min = 1, message = "A venda precisa de ao menos um item."), nested)]
    pub items: Vec<SaleLinePayload>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConvertQuotePayload {
    #[schema(example = "cartao")]
    pub payment_method: PaymentMethod,
}

// ---
// Handlers
// ---
#[utoipa::path(
    post,
    path = "/api/sales",
    tag = "Sales",
    request_body = CreateSalePayload,
    responses(
        (status = 201, description = "Venda registrada (PIX online devolve o QR code)", body = SaleDetail),
        (status = 404, description = "Modelo ou peça não encontrados"),
        (status = 422, description = "Loja sem configuração de pagamento"),
        (status = 503, description = "Gateway de pagamento indisponível")
    ),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn create_sale(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    _guard: RequirePermission<PermSalesWrite>,
    Json(payload): Json<CreateSalePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let input = NewSale {
        tenant_id: tenant.0,
        phone_model_id: payload.phone_model_id,
        customer_name: payload.customer_name.filter(|n| !n.trim().is_empty()),
        customer_phone: payload.customer_phone.filter(|p| !p.trim().is_empty()),
        discount: payload.discount,
        lines: payload
            .items
            .into_iter()
            .map(|i| SaleLine {
                part_id: i.part_id,
                quantity: i.quantity,
                unit_price: i.unit_price,
            })
            .collect(),
        kind: payload.kind.into(),
    };

    let mut uow = app_state.store.begin().await?;
    let detail = app_state.sale_service.create_sale(uow.as_mut(), input).await?;
    uow.commit().await?;

    Ok((StatusCode::CREATED, Json(detail)))
}

#[utoipa::path(
    get,
    path = "/api/sales",
    tag = "Sales",
    responses((status = 200, description = "Vendas da loja", body = Vec<Sale>)),
    params(
        SaleFilter,
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_sales(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    _guard: RequirePermission<PermSalesRead>,
    Query(filter): Query<SaleFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let sales = app_state.sale_repo.list_sales(tenant.0, filter.status).await?;
    Ok((StatusCode::OK, Json(sales)))
}

#[utoipa::path(
    get,
    path = "/api/sales/{sale_id}",
    tag = "Sales",
    responses(
        (status = 200, description = "Venda com itens", body = SaleDetail),
        (status = 404, description = "Venda não encontrada")
    ),
    params(
        ("sale_id" = Uuid, Path, description = "ID da Venda"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_sale(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    _guard: RequirePermission<PermSalesRead>,
    Path(sale_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = app_state
        .sale_repo
        .find_detail(tenant.0, sale_id)
        .await?
        .ok_or(AppError::NotFound("Venda"))?;
    Ok((StatusCode::OK, Json(detail)))
}

// Polling da tela do QR code
#[utoipa::path(
    get,
    path = "/api/sales/{sale_id}/status",
    tag = "Sales",
    responses(
        (status = 200, description = "Status da venda e do pagamento", body = SaleStatusView),
        (status = 404, description = "Venda não encontrada")
    ),
    params(
        ("sale_id" = Uuid, Path, description = "ID da Venda"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_sale_status(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    _guard: RequirePermission<PermSalesRead>,
    Path(sale_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let sale = app_state
        .sale_repo
        .find_sale(tenant.0, sale_id)
        .await?
        .ok_or(AppError::NotFound("Venda"))?;
    Ok((StatusCode::OK, Json(SaleStatusView::from(&sale))))
}

#[utoipa::path(
    post,
    path = "/api/sales/{sale_id}/convert",
    tag = "Sales",
    request_body = ConvertQuotePayload,
    responses(
        (status = 200, description = "Orçamento convertido em venda finalizada", body = Sale),
        (status = 404, description = "Venda não encontrada"),
        (status = 409, description = "A venda não é um orçamento")
    ),
    params(
        ("sale_id" = Uuid, Path, description = "ID da Venda"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn convert_quote(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    _guard: RequirePermission<PermSalesWrite>,
    Path(sale_id): Path<Uuid>,
    Json(payload): Json<ConvertQuotePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let mut uow = app_state.store.begin().await?;
    let sale = app_state
        .sale_service
        .convert_quote(uow.as_mut(), tenant.0, sale_id, payload.payment_method)
        .await?;
    uow.commit().await?;

    Ok((StatusCode::OK, Json(sale)))
}

#[utoipa::path(
    post,
    path = "/api/sales/{sale_id}/cancel",
    tag = "Sales",
    responses(
        (status = 200, description = "Venda cancelada (estoque devolvido se já tinha saído)", body = Sale),
        (status = 404, description = "Venda não encontrada"),
        (status = 409, description = "Venda já cancelada ou transição inválida")
    ),
    params(
        ("sale_id" = Uuid, Path, description = "ID da Venda"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn cancel_sale(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    _guard: RequirePermission<PermSalesWrite>,
    Path(sale_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut uow = app_state.store.begin().await?;
    let sale = app_state
        .sale_service
        .cancel_sale(uow.as_mut(), tenant.0, sale_id)
        .await?;
    uow.commit().await?;

    Ok((StatusCode::OK, Json(sale)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sale_kind_payload_maps_to_workflow() {
        let kind: SaleKindPayload = serde_json::from_str("\"pix_online\"").unwrap();
        assert_eq!(SaleKind::from(kind), SaleKind::PixOnline);

        let kind: SaleKindPayload = serde_json::from_str("\"cartao\"").unwrap();
        assert_eq!(SaleKind::from(kind), SaleKind::Direct(PaymentMethod::Cartao));

        let kind: SaleKindPayload = serde_json::from_str("\"orcamento\"").unwrap();
        assert_eq!(SaleKind::from(kind), SaleKind::Quote);
    }

    #[test]
    fn negative_discount_fails_validation() {
        let payload: CreateSalePayload = serde_json::from_value(serde_json::json!({
            "phoneModelId": Uuid::new_v4(),
            "kind": "dinheiro",
            "discount": -5.0,
            "items": [{ "partId": Uuid::new_v4(), "quantity": 1, "unitPrice": 10.0 }]
        }))
        .unwrap();
        assert!(payload.validate().is_err());
    }
    fn payload_with_line(quantity: i32, unit_price: serde_json::Value) -> CreateSalePayload {
        serde_json::from_value(serde_json::json!({
            "phoneModelId": Uuid::new_v4(),
            "kind": "pix_online",
            "items": [{ "partId": Uuid::new_v4(), "quantity": quantity, "unitPrice": unit_price }]
        }))
        .unwrap()
    }

    #[test]
    fn unit_price_must_fit_in_cents() {
        assert!(payload_with_line(3, serde_json::json!(33.333)).validate().is_err());
        assert!(payload_with_line(3, serde_json::json!(33.33)).validate().is_ok());
    }

    #[test]
    fn oversized_line_fails_validation() {
        assert!(payload_with_line(1000, serde_json::json!(7.9e27)).validate().is_err());
        assert!(payload_with_line(100_001, serde_json::json!(10.0)).validate().is_err());
    }
}
