// src/handlers/settings.rs

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        rbac::{PermSettingsWrite, RequirePermission},
        tenancy::TenantContext,
    },
    models::payment::{PaymentSettingsView, UpdatePaymentSettings},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentSettingsPayload {
    #[validate(length(min = 1, max = 30, message = "Gateway inválido."))]
    #[serde(default = "default_gateway")]
    #[schema(example = "mercadopago")]
    pub gateway: String,

    #[validate(length(min = 1, message = "O access token é obrigatório."))]
    pub access_token: String,

    pub public_key: Option<String>,

    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_gateway() -> String {
    "mercadopago".to_string()
}

fn default_active() -> bool {
    true
}

// GET /api/settings/payment
#[utoipa::path(
    get,
    path = "/api/settings/payment",
    tag = "Settings",
    responses(
        (status = 200, description = "Configuração do gateway (sem o token)", body = PaymentSettingsView),
        (status = 404, description = "Loja ainda sem configuração")
    ),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn get_payment_settings(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    _guard: RequirePermission<PermSettingsWrite>,
) -> Result<impl IntoResponse, ApiError> {
    let settings = app_state
        .settings_repo
        .get_payment_settings(tenant.0)
        .await?
        .ok_or(AppError::NotFound("Configuração de pagamento"))?;

    Ok((StatusCode::OK, Json(settings)))
}

// PUT /api/settings/payment
#[utoipa::path(
    put,
    path = "/api/settings/payment",
    tag = "Settings",
    request_body = UpdatePaymentSettingsPayload,
    responses(
        (status = 200, description = "Configuração salva", body = PaymentSettingsView)
    ),
    params(("x-tenant-id" = Uuid, Header, description = "ID da Loja")),
    security(("api_jwt" = []))
)]
pub async fn update_payment_settings(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    _guard: RequirePermission<PermSettingsWrite>,
    Json(payload): Json<UpdatePaymentSettingsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let input = UpdatePaymentSettings {
        gateway: payload.gateway.trim().to_lowercase(),
        access_token: payload.access_token.trim().to_string(),
        public_key: payload.public_key.filter(|k| !k.trim().is_empty()),
        active: payload.active,
    };

    let updated = app_state
        .settings_repo
        .upsert_payment_settings(&app_state.db_pool, tenant.0, &input)
        .await?;

    tracing::info!("⚙️ Configuração de pagamento da loja {} atualizada", tenant.0);
    Ok((StatusCode::OK, Json(updated)))
}
