use crate::common::error::AppError;

// ---
// Helper: tradução de violação de chave única
// ---
/// Converte erro de violação de chave única em `AppError::Conflict`;
/// qualquer outro erro segue como `DatabaseError`.
pub(crate) fn map_unique_violation(e: sqlx::Error, message: impl FnOnce() -> String) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return AppError::Conflict(message());
        }
    }
    e.into()
}
