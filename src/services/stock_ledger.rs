// src/services/stock_ledger.rs

use crate::{
    common::error::AppError,
    db::UnitOfWork,
    models::stock::{MovementKind, NewMovement, StockLevel, StockMovement},
};

#[derive(Debug, Clone)]
pub struct RecordedMovement {
    pub movement: StockMovement,
    pub level: StockLevel,
}

/// Primitiva do livro-razão: grava a movimentação e ajusta o saldo na mesma
/// unidade de trabalho do chamador.
///
/// Não aplica regra de negócio (saldo negativo etc.): cada workflow decide
/// se pode ou não deixar o estoque abaixo de zero.
#[derive(Debug, Clone, Default)]
pub struct StockLedger;

impl StockLedger {
    pub fn new() -> Self {
        Self
    }

    pub async fn record_movement(
        &self,
        uow: &mut dyn UnitOfWork,
        movement: NewMovement,
    ) -> Result<RecordedMovement, AppError> {
        if movement.quantity == 0 {
            return Err(AppError::InvalidInput(
                "Movimentação com quantidade zero.".to_string(),
            ));
        }
        if movement.kind == MovementKind::Estorno && movement.origin_movement_id.is_none() {
            return Err(AppError::InvalidInput(
                "Estorno precisa referenciar a movimentação de origem.".to_string(),
            ));
        }

        // Trava o saldo antes de alterar (evita lost update entre transações)
        uow.lock_stock_level(movement.tenant_id, movement.part_id).await?;

        let recorded = uow.insert_movement(&movement).await?;
        let level = uow
            .apply_stock_delta(movement.tenant_id, movement.part_id, movement.quantity)
            .await?;

        tracing::debug!(
            "📦 {} {:+} peça {} (saldo {})",
            movement.kind.as_str(),
            movement.quantity,
            movement.part_id,
            level.quantity
        );

        Ok(RecordedMovement { movement: recorded, level })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{memory_store::MemoryStore, Store};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    #[tokio::test]
    async fn level_tracks_signed_sum_of_movements() {
        let store = MemoryStore::new();
        let tenant = Uuid::new_v4();
        let part = store.seed_part(tenant, Decimal::from(50)).await;
        let ledger = StockLedger::new();

        let mut uow = store.begin().await.unwrap();
        for (kind, qty) in [
            (MovementKind::Entrada, 10),
            (MovementKind::Saida, -4),
            (MovementKind::Ajuste, 2),
            (MovementKind::Defeito, -1),
        ] {
            ledger
                .record_movement(uow.as_mut(), NewMovement::new(tenant, part.id, kind, qty, "teste"))
                .await
                .unwrap();
        }
        uow.commit().await.unwrap();

        let state = store.snapshot().await;
        assert_eq!(state.stock_of(tenant, part.id), 7);
        assert_eq!(state.movement_sum(tenant, part.id), 7);
    }

    #[tokio::test]
    async fn estorno_without_origin_is_rejected() {
        let store = MemoryStore::new();
        let tenant = Uuid::new_v4();
        let part = store.seed_part(tenant, Decimal::from(50)).await;

        let mut uow = store.begin().await.unwrap();
        let err = StockLedger::new()
            .record_movement(
                uow.as_mut(),
                NewMovement::new(tenant, part.id, MovementKind::Estorno, -1, "sem origem"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn dropped_unit_of_work_rolls_back() {
        let store = MemoryStore::new();
        let tenant = Uuid::new_v4();
        let part = store.seed_part(tenant, Decimal::from(50)).await;

        {
            let mut uow = store.begin().await.unwrap();
            StockLedger::new()
                .record_movement(
                    uow.as_mut(),
                    NewMovement::new(tenant, part.id, MovementKind::Entrada, 3, "sem commit"),
                )
                .await
                .unwrap();
        }

        let state = store.snapshot().await;
        assert!(state.movements.is_empty());
        assert_eq!(state.stock_of(tenant, part.id), 0);
    }
}
