// src/services/stock_service.rs

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::UnitOfWork,
    models::stock::{MovementKind, NewMovement},
    services::stock_ledger::{RecordedMovement, StockLedger},
};

/// Ajuste manual pedido pelo balcão.
#[derive(Debug, Clone)]
pub struct StockAdjustment {
    pub tenant_id: Uuid,
    pub part_id: Uuid,
    pub kind: MovementKind,
    pub quantity: i32,
    pub notes: Option<String>,
}

#[derive(Clone, Default)]
pub struct StockService {
    ledger: StockLedger,
}

impl StockService {
    pub fn new(ledger: StockLedger) -> Self {
        Self { ledger }
    }

    /// `ajuste` aceita quantidade com sinal; `defeito` recebe a contagem de
    /// peças descartadas e grava a saída negativa. Nenhum dos dois pode
    /// deixar o saldo abaixo de zero.
    #[tracing::instrument(skip(self, uow), fields(tenant = %input.tenant_id, part = %input.part_id))]
    pub async fn adjust_stock(
        &self,
        uow: &mut dyn UnitOfWork,
        input: StockAdjustment,
    ) -> Result<RecordedMovement, AppError> {
        // 1. Normaliza o sinal conforme o tipo
        let (delta, default_note) = match input.kind {
            MovementKind::Ajuste if input.quantity != 0 => (input.quantity, "Ajuste manual"),
            MovementKind::Defeito if input.quantity > 0 => (-input.quantity, "Peça com defeito"),
            MovementKind::Ajuste | MovementKind::Defeito => {
                return Err(AppError::InvalidInput(
                    "Quantidade inválida para o tipo de ajuste.".to_string(),
                ));
            }
            other => {
                return Err(AppError::InvalidInput(format!(
                    "O tipo '{}' não pode ser lançado manualmente.",
                    other.as_str()
                )));
            }
        };

        // 2. A peça precisa ser da loja
        uow.find_part(input.tenant_id, input.part_id)
            .await?
            .ok_or(AppError::NotFound("Peça"))?;

        // 3. Saldo não pode ficar negativo
        let available = uow
            .lock_stock_level(input.tenant_id, input.part_id)
            .await?
            .map(|l| l.quantity)
            .unwrap_or(0);
        if available + delta < 0 {
            return Err(AppError::InsufficientStock {
                part_id: input.part_id,
                available,
                required: -delta,
            });
        }

        let notes = input
            .notes
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| default_note.to_string());

        let recorded = self
            .ledger
            .record_movement(
                uow,
                NewMovement::new(input.tenant_id, input.part_id, input.kind, delta, notes),
            )
            .await?;

        tracing::info!("🛠️ Ajuste de estoque: peça {} agora com {}", input.part_id, recorded.level.quantity);
        Ok(recorded)
    }
}
