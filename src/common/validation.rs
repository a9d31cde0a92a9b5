// src/common/validation.rs

use rust_decimal::Decimal;
use validator::ValidationError;

use crate::common::error::AppError;

/// Maior valor que cabe em NUMERIC(10, 2).
pub fn max_money() -> Decimal {
    Decimal::new(9_999_999_999, 2)
}

// ---
// Validações customizadas reaproveitadas pelos payloads
// ---
pub fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() && !val.is_zero() {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.message = Some("O valor não pode ser negativo.".into());
        return Err(err);
    }
    Ok(())
}

/// Valor monetário: não negativo, no máximo 2 casas e dentro de NUMERIC(10, 2).
pub fn validate_money(val: &Decimal) -> Result<(), ValidationError> {
    validate_not_negative(val)?;
    if let Err(message) = money_fits(*val) {
        let mut err = ValidationError::new("money");
        err.message = Some(message.into());
        return Err(err);
    }
    Ok(())
}

pub fn validate_positive(val: &Decimal) -> Result<(), ValidationError> {
    if *val <= Decimal::ZERO {
        let mut err = ValidationError::new("range");
        err.message = Some("O valor deve ser maior que zero.".into());
        return Err(err);
    }
    validate_money(val)
}

/// Mesma regra de `validate_money` para valores que chegam aos serviços.
pub fn ensure_money(val: Decimal, field: &str) -> Result<(), AppError> {
    money_fits(val).map_err(|message| AppError::InvalidInput(format!("{field}: {message}")))
}

fn money_fits(val: Decimal) -> Result<(), &'static str> {
    if val.normalize().scale() > 2 {
        return Err("O valor aceita no máximo duas casas decimais.");
    }
    if val.abs() > max_money() {
        return Err("O valor excede o limite permitido.");
    }
    Ok(())
}
