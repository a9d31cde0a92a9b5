// src/handlers/catalog.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        validation::{validate_money, validate_positive},
    },
    config::AppState,
    middleware::{
        rbac::{PermCatalogWrite, RequirePermission},
        tenancy::TenantContext,
    },
    models::catalog::{Brand, NewPart, NewSupplier, Part, PartCompatibility, PhoneModel, Supplier},
};

// ---
// Payloads
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBrandPayload {
    #[validate(length(min = 1, max = 80, message = "O nome da marca é obrigatório."))]
    #[schema(example = "Samsung")]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePhoneModelPayload {
    pub brand_id: Uuid,
    #[validate(length(min = 1, max = 120, message = "O nome do modelo é obrigatório."))]
    #[schema(example = "Galaxy A52")]
    pub name: String,
    pub variant: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PhoneModelQuery {
    pub brand_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePartPayload {
    #[validate(length(min = 1, message = "O tipo da peça é obrigatório."))]
    #[schema(example = "Tela")]
    pub part_type: String,

    #[validate(length(min = 1, message = "A qualidade é obrigatória."))]
    #[schema(example = "Original")]
    pub quality: String,

    pub name: Option<String>,
    pub internal_code: Option<String>,
    pub part_brand: Option<String>,

    #[validate(custom(function = "validate_positive"))]
    pub sale_price: Decimal,

    #[validate(custom(function = "validate_money"))]
    pub min_price: Option<Decimal>,

    pub image_path: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddCompatibilityPayload {
    pub phone_model_id: Uuid,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSupplierPayload {
    #[validate(length(min = 1, max = 150, message = "O nome do fornecedor é obrigatório."))]
    pub name: String,

    // CPF ou CNPJ
    pub document: Option<String>,

    // "PF" ou "PJ"
    #[validate(length(min = 2, max = 2, message = "O tipo deve ser PF ou PJ."))]
    #[serde(default = "default_supplier_kind")]
    #[schema(example = "PF")]
    pub kind: String,

    pub phone: Option<String>,

    #[validate(email(message = "E-mail inválido."))]
    pub email: Option<String>,

    pub notes: Option<String>,
}

fn default_supplier_kind() -> String {
    "PF".to_string()
}

// --- Edição (PUT): mesmos campos da criação + `active` ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBrandPayload {
    #[validate(length(min = 1, max = 80, message = "O nome da marca é obrigatório."))]
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePhoneModelPayload {
    pub brand_id: Uuid,
    #[validate(length(min = 1, max = 120, message = "O nome do modelo é obrigatório."))]
    pub name: String,
    pub variant: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePartPayload {
    #[serde(flatten)]
    #[validate(nested)]
    pub part: CreatePartPayload,
    #[serde(default = "default_active")]
    pub active: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSupplierPayload {
    #[serde(flatten)]
    #[validate(nested)]
    pub supplier: CreateSupplierPayload,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl From<CreatePartPayload> for NewPart {
    fn from(payload: CreatePartPayload) -> Self {
        NewPart {
            part_type: payload.part_type.trim().to_string(),
            quality: payload.quality.trim().to_string(),
            name: payload.name,
            internal_code: payload.internal_code.filter(|c| !c.trim().is_empty()),
            part_brand: payload.part_brand,
            sale_price: payload.sale_price,
            min_price: payload.min_price,
            image_path: payload.image_path,
            notes: payload.notes,
        }
    }
}

impl TryFrom<CreateSupplierPayload> for NewSupplier {
    type Error = AppError;

    fn try_from(payload: CreateSupplierPayload) -> Result<Self, Self::Error> {
        let kind = payload.kind.to_uppercase();
        if kind != "PF" && kind != "PJ" {
            return Err(AppError::InvalidInput("O tipo do fornecedor deve ser PF ou PJ.".to_string()));
        }
        Ok(NewSupplier {
            name: payload.name.trim().to_string(),
            document: payload.document.filter(|d| !d.trim().is_empty()),
            kind,
            phone: payload.phone,
            email: payload.email,
            notes: payload.notes,
        })
    }
}

// ---
// Marcas
// ---
#[utoipa::path(
    post,
    path = "/api/catalog/brands",
    tag = "Catalog",
    request_body = CreateBrandPayload,
    responses(
        (status = 201, description = "Marca criada", body = Brand),
        (status = 409, description = "Marca já existe")
    ),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn create_brand(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    _guard: RequirePermission<PermCatalogWrite>,
    Json(payload): Json<CreateBrandPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let brand = app_state
        .catalog_service
        .create_brand(&app_state.db_pool, tenant.0, &payload.name)
        .await?;

    Ok((StatusCode::CREATED, Json(brand)))
}

#[utoipa::path(
    get,
    path = "/api/catalog/brands",
    tag = "Catalog",
    responses((status = 200, description = "Marcas da loja", body = Vec<Brand>)),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn list_brands(
    State(app_state): State<AppState>,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let brands = app_state.catalog_service.list_brands(tenant.0).await?;
    Ok((StatusCode::OK, Json(brands)))
}

#[utoipa::path(
    put,
    path = "/api/catalog/brands/{brand_id}",
    tag = "Catalog",
    request_body = UpdateBrandPayload,
    responses(
        (status = 200, description = "Marca atualizado(a)", body = Brand),
        (status = 404, description = "Marca não encontrada"),
        (status = 409, description = "Nome já usado")
    ),
    params(
        ("brand_id" = Uuid, Path, description = "ID da Marca"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_brand(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    _guard: RequirePermission<PermCatalogWrite>,
    Path(brand_id): Path<Uuid>,
    Json(payload): Json<UpdateBrandPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let brand = app_state
        .catalog_service
        .update_brand(&app_state.db_pool, tenant.0, brand_id, &payload.name, payload.active)
        .await?;

    Ok((StatusCode::OK, Json(brand)))
}

#[utoipa::path(
    delete,
    path = "/api/catalog/brands/{brand_id}",
    tag = "Catalog",
    responses(
        (status = 204, description = "Marca excluído(a)"),
        (status = 404, description = "Marca não encontrada"),
        (status = 409, description = "Existem modelos vinculados")
    ),
    params(
        ("brand_id" = Uuid, Path, description = "ID da Marca"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_brand(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    _guard: RequirePermission<PermCatalogWrite>,
    Path(brand_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .catalog_service
        .delete_brand(&app_state.db_pool, tenant.0, brand_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

// ---
// Modelos de celular
// ---
#[utoipa::path(
    post,
    path = "/api/catalog/models",
    tag = "Catalog",
    request_body = CreatePhoneModelPayload,
    responses(
        (status = 201, description = "Modelo criado", body = PhoneModel),
        (status = 404, description = "Marca não encontrada"),
        (status = 409, description = "Modelo já existe para a marca")
    ),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn create_phone_model(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    _guard: RequirePermission<PermCatalogWrite>,
    Json(payload): Json<CreatePhoneModelPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let model = app_state
        .catalog_service
        .create_phone_model(
            &app_state.db_pool,
            tenant.0,
            payload.brand_id,
            &payload.name,
            payload.variant.as_deref(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(model)))
}

#[utoipa::path(
    get,
    path = "/api/catalog/models",
    tag = "Catalog",
    responses((status = 200, description = "Modelos da loja", body = Vec<PhoneModel>)),
    params(
        PhoneModelQuery,
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_phone_models(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<PhoneModelQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let models = app_state
        .catalog_service
        .list_phone_models(tenant.0, query.brand_id)
        .await?;
    Ok((StatusCode::OK, Json(models)))
}

#[utoipa::path(
    put,
    path = "/api/catalog/models/{model_id}",
    tag = "Catalog",
    request_body = UpdatePhoneModelPayload,
    responses(
        (status = 200, description = "Modelo atualizado(a)", body = PhoneModel),
        (status = 404, description = "Modelo ou marca não encontrados"),
        (status = 409, description = "Nome já usado")
    ),
    params(
        ("model_id" = Uuid, Path, description = "ID do Modelo"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_phone_model(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    _guard: RequirePermission<PermCatalogWrite>,
    Path(model_id): Path<Uuid>,
    Json(payload): Json<UpdatePhoneModelPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let model = app_state
        .catalog_service
        .update_phone_model(
            &app_state.db_pool,
            tenant.0,
            model_id,
            payload.brand_id,
            &payload.name,
            payload.variant.as_deref(),
            payload.active,
        )
        .await?;

    Ok((StatusCode::OK, Json(model)))
}

#[utoipa::path(
    delete,
    path = "/api/catalog/models/{model_id}",
    tag = "Catalog",
    responses(
        (status = 204, description = "Modelo excluído(a)"),
        (status = 404, description = "Modelo ou marca não encontrados"),
        (status = 409, description = "Existem vendas para o modelo")
    ),
    params(
        ("model_id" = Uuid, Path, description = "ID do Modelo"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_phone_model(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    _guard: RequirePermission<PermCatalogWrite>,
    Path(model_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .catalog_service
        .delete_phone_model(&app_state.db_pool, tenant.0, model_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

// Peças compatíveis com um modelo (tela de venda)
#[utoipa::path(
    get,
    path = "/api/catalog/models/{model_id}/parts",
    tag = "Catalog",
    responses((status = 200, description = "Peças ativas compatíveis", body = Vec<Part>)),
    params(
        ("model_id" = Uuid, Path, description = "ID do Modelo"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_compatible_parts(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(model_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let parts = app_state
        .catalog_service
        .list_compatible_parts(tenant.0, model_id)
        .await?;
    Ok((StatusCode::OK, Json(parts)))
}

// ---
// Peças
// ---
#[utoipa::path(
    post,
    path = "/api/catalog/parts",
    tag = "Catalog",
    request_body = CreatePartPayload,
    responses(
        (status = 201, description = "Peça cadastrada", body = Part),
        (status = 400, description = "Preço mínimo maior que o preço de venda")
    ),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn create_part(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    _guard: RequirePermission<PermCatalogWrite>,
    Json(payload): Json<CreatePartPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let part = app_state
        .catalog_service
        .create_part(&app_state.db_pool, tenant.0, payload.into())
        .await?;

    Ok((StatusCode::CREATED, Json(part)))
}

#[utoipa::path(
    get,
    path = "/api/catalog/parts",
    tag = "Catalog",
    responses((status = 200, description = "Peças da loja", body = Vec<Part>)),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn list_parts(
    State(app_state): State<AppState>,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let parts = app_state.catalog_service.list_parts(tenant.0).await?;
    Ok((StatusCode::OK, Json(parts)))
}

#[utoipa::path(
    put,
    path = "/api/catalog/parts/{part_id}",
    tag = "Catalog",
    request_body = UpdatePartPayload,
    responses(
        (status = 200, description = "Peça atualizado(a)", body = Part),
        (status = 404, description = "Peça não encontrada"),
        (status = 409, description = "Nome já usado")
    ),
    params(
        ("part_id" = Uuid, Path, description = "ID da Peça"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_part(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    _guard: RequirePermission<PermCatalogWrite>,
    Path(part_id): Path<Uuid>,
    Json(payload): Json<UpdatePartPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let part = app_state
        .catalog_service
        .update_part(&app_state.db_pool, tenant.0, part_id, payload.part.into(), payload.active)
        .await?;

    Ok((StatusCode::OK, Json(part)))
}

#[utoipa::path(
    delete,
    path = "/api/catalog/parts/{part_id}",
    tag = "Catalog",
    responses(
        (status = 204, description = "Peça excluído(a)"),
        (status = 404, description = "Peça não encontrada"),
        (status = 409, description = "Peça já vendida, comprada ou movimentada")
    ),
    params(
        ("part_id" = Uuid, Path, description = "ID da Peça"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_part(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    _guard: RequirePermission<PermCatalogWrite>,
    Path(part_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .catalog_service
        .delete_part(&app_state.db_pool, tenant.0, part_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/catalog/parts/{part_id}/compatibility",
    tag = "Catalog",
    request_body = AddCompatibilityPayload,
    responses(
        (status = 201, description = "Compatibilidade registrada", body = PartCompatibility),
        (status = 404, description = "Peça ou modelo não encontrado"),
        (status = 409, description = "Compatibilidade já registrada")
    ),
    params(
        ("part_id" = Uuid, Path, description = "ID da Peça"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_compatibility(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    _guard: RequirePermission<PermCatalogWrite>,
    Path(part_id): Path<Uuid>,
    Json(payload): Json<AddCompatibilityPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let link = app_state
        .catalog_service
        .add_compatibility(&app_state.db_pool, tenant.0, part_id, payload.phone_model_id)
        .await?;

    Ok((StatusCode::CREATED, Json(link)))
}

// ---
// Fornecedores
// ---
#[utoipa::path(
    post,
    path = "/api/catalog/suppliers",
    tag = "Catalog",
    request_body = CreateSupplierPayload,
    responses(
        (status = 201, description = "Fornecedor cadastrado", body = Supplier),
        (status = 409, description = "Fornecedor já cadastrado")
    ),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn create_supplier(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    _guard: RequirePermission<PermCatalogWrite>,
    Json(payload): Json<CreateSupplierPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;
    let input = NewSupplier::try_from(payload)?;

    let supplier = app_state
        .catalog_service
        .create_supplier(&app_state.db_pool, tenant.0, input)
        .await?;

    Ok((StatusCode::CREATED, Json(supplier)))
}

#[utoipa::path(
    get,
    path = "/api/catalog/suppliers",
    tag = "Catalog",
    responses((status = 200, description = "Fornecedores da loja", body = Vec<Supplier>)),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn list_suppliers(
    State(app_state): State<AppState>,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let suppliers = app_state.catalog_service.list_suppliers(tenant.0).await?;
    Ok((StatusCode::OK, Json(suppliers)))
}

#[utoipa::path(
    put,
    path = "/api/catalog/suppliers/{supplier_id}",
    tag = "Catalog",
    request_body = UpdateSupplierPayload,
    responses(
        (status = 200, description = "Fornecedor atualizado(a)", body = Supplier),
        (status = 404, description = "Fornecedor não encontrado"),
        (status = 409, description = "Nome já usado")
    ),
    params(
        ("supplier_id" = Uuid, Path, description = "ID do Fornecedor"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_supplier(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    _guard: RequirePermission<PermCatalogWrite>,
    Path(supplier_id): Path<Uuid>,
    Json(payload): Json<UpdateSupplierPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;
    let input = NewSupplier::try_from(payload.supplier)?;

    let supplier = app_state
        .catalog_service
        .update_supplier(&app_state.db_pool, tenant.0, supplier_id, input, payload.active)
        .await?;

    Ok((StatusCode::OK, Json(supplier)))
}

#[utoipa::path(
    delete,
    path = "/api/catalog/suppliers/{supplier_id}",
    tag = "Catalog",
    responses(
        (status = 204, description = "Fornecedor excluído(a)"),
        (status = 404, description = "Fornecedor não encontrado"),
        (status = 409, description = "Fornecedor usado em compras")
    ),
    params(
        ("supplier_id" = Uuid, Path, description = "ID do Fornecedor"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_supplier(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    _guard: RequirePermission<PermCatalogWrite>,
    Path(supplier_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .catalog_service
        .delete_supplier(&app_state.db_pool, tenant.0, supplier_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
