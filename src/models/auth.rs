// src/models/auth.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Estrutura de dados ("claims") dentro do JWT.
// O token é emitido pelo serviço de identidade que compartilha o JWT_SECRET.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid, // Subject (ID do usuário)
    // Lojas (tenants) às quais o usuário pertence
    #[serde(default)]
    pub tenants: Vec<Uuid>,
    // Slugs de permissão, ex: "stock:write"
    #[serde(default)]
    pub permissions: Vec<String>,
    pub exp: usize, // Expiration time (quando o token expira)
    pub iat: usize, // Issued At (quando o token foi criado)
}

impl Claims {
    pub fn belongs_to(&self, tenant_id: Uuid) -> bool {
        self.tenants.contains(&tenant_id)
    }

    pub fn has_permission(&self, slug: &str) -> bool {
        self.permissions.iter().any(|p| p == slug)
    }
}
