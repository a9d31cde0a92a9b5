// src/services/purchase_service.rs

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::{error::AppError, validation::ensure_money},
    db::UnitOfWork,
    models::{
        purchase::{NewPurchase, Purchase, PurchaseDetail, PurchaseLine, PurchaseStatus},
        stock::{MovementKind, NewMovement},
    },
    services::stock_ledger::StockLedger,
};

#[derive(Clone, Default)]
pub struct PurchaseService {
    ledger: StockLedger,
}

impl PurchaseService {
    pub fn new(ledger: StockLedger) -> Self {
        Self { ledger }
    }

    // --- CREATE PURCHASE (ENTRADA) ---
    #[tracing::instrument(skip(self, uow, input), fields(tenant = %input.tenant_id, supplier = %input.supplier_id))]
    pub async fn create_purchase(
        &self,
        uow: &mut dyn UnitOfWork,
        input: NewPurchase,
    ) -> Result<PurchaseDetail, AppError> {
        if input.lines.is_empty() {
            return Err(AppError::InvalidInput("A compra precisa de ao menos um item.".to_string()));
        }
        if input.lines.iter().any(|l| l.unit_cost < Decimal::ZERO) {
            return Err(AppError::InvalidInput("O custo unitário não pode ser negativo.".to_string()));
        }
        for line in &input.lines {
            ensure_money(line.unit_cost, "Custo unitário")?;
        }

        // 1. Fornecedor da loja
        uow.find_supplier(input.tenant_id, input.supplier_id)
            .await?
            .ok_or(AppError::NotFound("Fornecedor"))?;

        // 2. Linhas com quantidade <= 0 são ignoradas; as demais seguem a ordem de part_id
        let mut lines: Vec<&PurchaseLine> = input
            .lines
            .iter()
            .filter(|l| {
                if l.quantity <= 0 {
                    tracing::warn!("⚠️ Item ignorado na compra: peça {} com quantidade {}", l.part_id, l.quantity);
                    false
                } else {
                    true
                }
            })
            .collect();
        if lines.is_empty() {
            return Err(AppError::InvalidInput(
                "Nenhum item da compra tem quantidade positiva.".to_string(),
            ));
        }
        lines.sort_by_key(|l| l.part_id);

        // 3. Cabeçalho
        let purchase = uow
            .insert_purchase(input.tenant_id, input.supplier_id, input.notes.as_deref())
            .await?;
        let note = format!("Compra #{}", purchase.id);

        // 4. Item + entrada por linha
        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            uow.find_part(input.tenant_id, line.part_id)
                .await?
                .ok_or(AppError::NotFound("Peça"))?;

            items.push(uow.insert_purchase_item(input.tenant_id, purchase.id, line).await?);

            let movement = NewMovement::new(
                input.tenant_id,
                line.part_id,
                MovementKind::Entrada,
                line.quantity,
                note.clone(),
            )
            .with_purchase(purchase.id, Some(input.supplier_id));
            self.ledger.record_movement(uow, movement).await?;
        }

        let detail = PurchaseDetail { purchase, items };
        tracing::info!(
            "✅ Compra {} registrada com {} item(ns), custo total {}",
            detail.purchase.id,
            detail.items.len(),
            detail.total_cost()
        );
        Ok(detail)
    }

    // --- REVERSE PURCHASE (ESTORNO) ---
    /// Todas as verificações rodam antes da primeira escrita.
    /// Saldos são travados e estornados em ordem de `part_id`, a mesma das vendas.
    #[tracing::instrument(skip(self, uow))]
    pub async fn reverse_purchase(
        &self,
        uow: &mut dyn UnitOfWork,
        tenant_id: Uuid,
        purchase_id: Uuid,
    ) -> Result<Purchase, AppError> {
        // 1. Trava a compra
        let purchase = uow
            .lock_purchase(tenant_id, purchase_id)
            .await?
            .ok_or(AppError::NotFound("Compra"))?;
        if purchase.status == PurchaseStatus::Estornada {
            return Err(AppError::PurchaseAlreadyReversed);
        }

        // 2. Entradas geradas pela compra
        let mut movements = uow
            .list_purchase_movements(tenant_id, purchase_id, MovementKind::Entrada)
            .await?;
        if movements.is_empty() {
            return Err(AppError::NoMovementsFound);
        }
        movements.sort_by_key(|m| m.part_id);

        // 3. Saldo suficiente por peça (somando linhas repetidas da mesma peça)
        let mut required: Vec<(Uuid, i32)> = Vec::new();
        for m in &movements {
            match required.iter_mut().find(|(part, _)| *part == m.part_id) {
                Some((_, qty)) => *qty += m.quantity,
                None => required.push((m.part_id, m.quantity)),
            }
        }
        for (part_id, qty) in &required {
            let available = uow
                .lock_stock_level(tenant_id, *part_id)
                .await?
                .map(|l| l.quantity)
                .unwrap_or(0);
            if available < *qty {
                tracing::warn!(
                    "⛔ Estorno da compra {} bloqueado: peça {} tem {} e precisa de {}",
                    purchase_id,
                    part_id,
                    available,
                    qty
                );
                return Err(AppError::InsufficientStock {
                    part_id: *part_id,
                    available,
                    required: *qty,
                });
            }
        }

        // 4. Um estorno por entrada, com referência à origem
        let note = format!("Estorno da compra #{}", purchase_id);
        for m in &movements {
            let reversal = NewMovement::new(tenant_id, m.part_id, MovementKind::Estorno, -m.quantity, note.clone())
                .with_purchase(purchase_id, m.supplier_id)
                .with_origin(m.id);
            self.ledger.record_movement(uow, reversal).await?;
        }

        // 5. ATIVA -> ESTORNADA
        let reversed = uow.mark_purchase_reversed(tenant_id, purchase_id, Utc::now()).await?;
        tracing::info!("↩️ Compra {} estornada ({} movimentações)", purchase_id, movements.len());
        Ok(reversed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{memory_store::MemoryStore, Store};

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    struct Fixture {
        store: MemoryStore,
        tenant: Uuid,
        supplier: Uuid,
        part_a: Uuid,
        part_b: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let tenant = Uuid::new_v4();
        let supplier = store.seed_supplier(tenant).await.id;
        let part_a = store.seed_part(tenant, dec("25.00")).await.id;
        let part_b = store.seed_part(tenant, dec("40.00")).await.id;
        Fixture { store, tenant, supplier, part_a, part_b }
    }

    fn line(part_id: Uuid, quantity: i32, cost: &str) -> PurchaseLine {
        PurchaseLine { part_id, quantity, unit_cost: dec(cost) }
    }

    async fn buy(f: &Fixture, lines: Vec<PurchaseLine>) -> Result<PurchaseDetail, AppError> {
        let mut uow = f.store.begin().await?;
        let detail = PurchaseService::default()
            .create_purchase(
                uow.as_mut(),
                NewPurchase { tenant_id: f.tenant, supplier_id: f.supplier, notes: None, lines },
            )
            .await?;
        uow.commit().await?;
        Ok(detail)
    }

    async fn reverse(f: &Fixture, purchase_id: Uuid) -> Result<Purchase, AppError> {
        let mut uow = f.store.begin().await?;
        let purchase = PurchaseService::default()
            .reverse_purchase(uow.as_mut(), f.tenant, purchase_id)
            .await?;
        uow.commit().await?;
        Ok(purchase)
    }

    #[tokio::test]
    async fn purchase_writes_one_entrada_per_line() {
        let f = fixture().await;
        let detail = buy(&f, vec![line(f.part_a, 5, "10.00"), line(f.part_b, 3, "20.00")])
            .await
            .unwrap();

        assert_eq!(detail.items.len(), 2);
        assert_eq!(detail.total_cost(), dec("110.00"));

        let state = f.store.snapshot().await;
        let entradas = state.movements_of_kind(MovementKind::Entrada);
        assert_eq!(entradas.len(), 2);
        assert!(entradas.iter().all(|m| m.purchase_id == Some(detail.purchase.id)));
        assert!(entradas.iter().all(|m| m.supplier_id == Some(f.supplier)));
        assert_eq!(entradas[0].notes, format!("Compra #{}", detail.purchase.id));
        assert_eq!(state.stock_of(f.tenant, f.part_a), 5);
        assert_eq!(state.stock_of(f.tenant, f.part_b), 3);
    }

    #[tokio::test]
    async fn non_positive_lines_are_skipped() {
        let f = fixture().await;
        let detail = buy(&f, vec![line(f.part_a, 2, "10.00"), line(f.part_b, 0, "20.00")])
            .await
            .unwrap();

        assert_eq!(detail.items.len(), 1);
        let state = f.store.snapshot().await;
        assert_eq!(state.movements.len(), 1);
        assert_eq!(state.stock_of(f.tenant, f.part_b), 0);
    }

    #[tokio::test]
    async fn purchase_with_only_empty_lines_is_rejected() {
        let f = fixture().await;
        let err = buy(&f, vec![line(f.part_a, 0, "10.00"), line(f.part_b, -1, "20.00")])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert!(f.store.snapshot().await.purchases.is_empty());
    }

    #[tokio::test]
    async fn unknown_part_aborts_whole_purchase() {
        let f = fixture().await;
        let err = buy(&f, vec![line(f.part_a, 5, "10.00"), line(Uuid::new_v4(), 1, "5.00")])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound("Peça")));

        let state = f.store.snapshot().await;
        assert!(state.purchases.is_empty());
        assert!(state.purchase_items.is_empty());
        assert!(state.movements.is_empty());
        assert_eq!(state.stock_of(f.tenant, f.part_a), 0);
    }

    #[tokio::test]
    async fn reversal_negates_every_entrada() {
        let f = fixture().await;
        let detail = buy(&f, vec![line(f.part_a, 5, "10.00"), line(f.part_b, 3, "20.00")])
            .await
            .unwrap();

        let reversed = reverse(&f, detail.purchase.id).await.unwrap();
        assert_eq!(reversed.status, PurchaseStatus::Estornada);
        assert!(reversed.reversed_at.is_some());

        let state = f.store.snapshot().await;
        let entradas = state.movements_of_kind(MovementKind::Entrada);
        let estornos = state.movements_of_kind(MovementKind::Estorno);
        let mut quantities: Vec<i32> = estornos.iter().map(|m| m.quantity).collect();
        quantities.sort();
        assert_eq!(quantities, vec![-5, -3]);
        for e in &estornos {
            let origin = entradas
                .iter()
                .find(|m| Some(m.id) == e.origin_movement_id)
                .expect("estorno aponta para a entrada");
            assert_eq!(e.quantity, -origin.quantity);
            assert_eq!(e.part_id, origin.part_id);
        }
        assert_eq!(state.stock_of(f.tenant, f.part_a), 0);
        assert_eq!(state.stock_of(f.tenant, f.part_b), 0);
        assert_eq!(state.movement_sum(f.tenant, f.part_a), 0);
    }

    #[tokio::test]
    async fn second_reversal_is_rejected() {
        let f = fixture().await;
        let detail = buy(&f, vec![line(f.part_a, 5, "10.00")]).await.unwrap();
        reverse(&f, detail.purchase.id).await.unwrap();

        let err = reverse(&f, detail.purchase.id).await.unwrap_err();
        assert!(matches!(err, AppError::PurchaseAlreadyReversed));
        assert_eq!(f.store.snapshot().await.movements_of_kind(MovementKind::Estorno).len(), 1);
    }

    #[tokio::test]
    async fn consumed_stock_blocks_reversal() {
        let f = fixture().await;
        let detail = buy(&f, vec![line(f.part_a, 5, "10.00"), line(f.part_b, 3, "20.00")])
            .await
            .unwrap();

        // Venda consome parte da peça B
        let mut uow = f.store.begin().await.unwrap();
        StockLedger::new()
            .record_movement(
                uow.as_mut(),
                NewMovement::new(f.tenant, f.part_b, MovementKind::Saida, -2, "Venda"),
            )
            .await
            .unwrap();
        uow.commit().await.unwrap();
        let before = f.store.snapshot().await;

        let err = reverse(&f, detail.purchase.id).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::InsufficientStock { available: 1, required: 3, .. }
        ));

        let after = f.store.snapshot().await;
        assert_eq!(after.movements.len(), before.movements.len());
        assert_eq!(after.stock_of(f.tenant, f.part_a), 5);
        assert_eq!(after.stock_of(f.tenant, f.part_b), 1);
        assert_eq!(
            after.purchase(detail.purchase.id).map(|p| p.status),
            Some(PurchaseStatus::Ativa)
        );
    }

    #[tokio::test]
    async fn repeated_part_lines_are_checked_together() {
        let f = fixture().await;
        let detail = buy(&f, vec![line(f.part_a, 2, "10.00"), line(f.part_a, 3, "11.00")])
            .await
            .unwrap();

        let mut uow = f.store.begin().await.unwrap();
        StockLedger::new()
            .record_movement(
                uow.as_mut(),
                NewMovement::new(f.tenant, f.part_a, MovementKind::Saida, -1, "Venda"),
            )
            .await
            .unwrap();
        uow.commit().await.unwrap();

        let err = reverse(&f, detail.purchase.id).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::InsufficientStock { available: 4, required: 5, .. }
        ));
    }

    #[tokio::test]
    async fn fractional_cost_is_rejected() {
        let f = fixture().await;
        let err = buy(&f, vec![line(f.part_a, 3, "33.333")]).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert!(f.store.snapshot().await.purchases.is_empty());
    }

    #[tokio::test]
    async fn stock_rows_are_touched_in_part_order() {
        let f = fixture().await;
        let (low, high) = if f.part_a < f.part_b { (f.part_a, f.part_b) } else { (f.part_b, f.part_a) };
        let detail = buy(&f, vec![line(high, 2, "10.00"), line(low, 1, "20.00")])
            .await
            .unwrap();
        reverse(&f, detail.purchase.id).await.unwrap();

        let state = f.store.snapshot().await;
        let order = |kind| -> Vec<Uuid> {
            state.movements_of_kind(kind).iter().map(|m| m.part_id).collect()
        };
        assert_eq!(order(MovementKind::Entrada), vec![low, high]);
        assert_eq!(order(MovementKind::Estorno), vec![low, high]);
    }

    #[tokio::test]
    async fn purchase_without_movements_cannot_be_reversed() {
        let f = fixture().await;
        let mut uow = f.store.begin().await.unwrap();
        let purchase = uow.insert_purchase(f.tenant, f.supplier, None).await.unwrap();
        uow.commit().await.unwrap();

        let err = reverse(&f, purchase.id).await.unwrap_err();
        assert!(matches!(err, AppError::NoMovementsFound));
    }

    #[tokio::test]
    async fn reversal_is_tenant_scoped() {
        let f = fixture().await;
        let detail = buy(&f, vec![line(f.part_a, 1, "10.00")]).await.unwrap();

        let mut uow = f.store.begin().await.unwrap();
        let err = PurchaseService::default()
            .reverse_purchase(uow.as_mut(), Uuid::new_v4(), detail.purchase.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound("Compra")));
    }
}
