// src/middleware/rbac.rs

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use std::marker::PhantomData;

use crate::{common::error::ApiError, middleware::auth::AuthenticatedUser};

/// 1. O Trait que define o que é uma Permissão
pub trait PermissionDef: Send + Sync + 'static {
    fn slug() -> &'static str;
}

/// 2. O Extractor (Guardião). As permissões vêm no próprio token.
pub struct RequirePermission<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // A. Extrai Usuário
        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .ok_or_else(|| ApiError::new(StatusCode::UNAUTHORIZED, "Usuário não autenticado"))?;

        // B. Confere o slug
        let required_perm = T::slug();
        if !user.0.has_permission(required_perm) {
            return Err(ApiError::new(
                StatusCode::FORBIDDEN,
                format!("Você precisa da permissão '{}' para realizar esta ação.", required_perm),
            ));
        }

        Ok(RequirePermission(PhantomData))
    }
}

// ---
// DEFINIÇÃO DAS PERMISSÕES (TIPOS)
// ---

pub struct PermCatalogWrite;
impl PermissionDef for PermCatalogWrite {
    fn slug() -> &'static str { "catalog:write" }
}

pub struct PermStockRead;
impl PermissionDef for PermStockRead {
    fn slug() -> &'static str { "stock:read" }
}

pub struct PermStockWrite;
impl PermissionDef for PermStockWrite {
    fn slug() -> &'static str { "stock:write" }
}

pub struct PermSalesRead;
impl PermissionDef for PermSalesRead {
    fn slug() -> &'static str { "sales:read" }
}

pub struct PermSalesWrite;
impl PermissionDef for PermSalesWrite {
    fn slug() -> &'static str { "sales:write" }
}

pub struct PermReportsRead;
impl PermissionDef for PermReportsRead {
    fn slug() -> &'static str { "reports:read" }
}

pub struct PermSettingsWrite;
impl PermissionDef for PermSettingsWrite {
    fn slug() -> &'static str { "settings:write" }
}
