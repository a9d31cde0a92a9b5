// src/services/auth.rs

use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::{common::error::AppError, models::auth::Claims};

/// Valida os tokens emitidos pelo serviço de identidade (HS256, segredo compartilhado).
#[derive(Clone)]
pub struct AuthService {
    jwt_secret: String,
}

impl AuthService {
    pub fn new(jwt_secret: String) -> Self {
        Self { jwt_secret }
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, AppError> {
        let validation = Validation::default();
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &validation,
        )
        .map_err(|_| AppError::InvalidToken)?;
        Ok(token_data.claims)
    }
}
