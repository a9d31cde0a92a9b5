// src/middleware/auth.rs

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::tenancy::{parse_tenant_header, TenantContext},
    models::auth::Claims,
};

// Usuário autenticado (claims do JWT), disponível nos handlers
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Claims);

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn authenticate(app_state: &AppState, headers: &HeaderMap) -> Result<AuthenticatedUser, AppError> {
    let token = bearer_token(headers).ok_or(AppError::InvalidToken)?;
    let claims = app_state.auth_service.validate_token(token)?;
    Ok(AuthenticatedUser(claims))
}

// Rotas que só exigem login
pub async fn auth_guard(
    State(app_state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let user = authenticate(&app_state, request.headers())?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

// Rotas da loja: login + X-Tenant-ID de uma loja à qual o usuário pertence
pub async fn tenant_guard(
    State(app_state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let user = authenticate(&app_state, request.headers())?;
    let tenant_id = parse_tenant_header(request.headers())?;

    if !user.0.belongs_to(tenant_id) {
        tracing::warn!("⛔ Usuário {} tentou acessar a loja {}", user.0.sub, tenant_id);
        return Err(AppError::Forbidden("Você não tem acesso a esta loja.".to_string()));
    }

    request.extensions_mut().insert(user);
    request.extensions_mut().insert(TenantContext(tenant_id));
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AppError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_prefix_is_required() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));
    }
}
