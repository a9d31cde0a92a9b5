// src/services/sale_service.rs

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::UnitOfWork,
    models::{
        payment::{CreatePaymentRequest, PaymentConfig},
        sale::{
            compute_total, NewSale, NewSaleHeader, PaymentMethod, Sale, SaleDetail, SaleItem, SaleKind,
            SaleLine, SaleStatus,
        },
        stock::{MovementKind, NewMovement},
    },
    services::{payment_gateway::PaymentGateway, stock_ledger::StockLedger},
};

#[derive(Clone)]
pub struct SaleService {
    ledger: StockLedger,
    gateway: Arc<dyn PaymentGateway>,
    payer_email_domain: String,
}

impl SaleService {
    pub fn new(ledger: StockLedger, gateway: Arc<dyn PaymentGateway>, payer_email_domain: String) -> Self {
        Self { ledger, gateway, payer_email_domain }
    }

    // --- CREATE SALE (balcão, PIX online ou orçamento) ---
    #[tracing::instrument(skip(self, uow, input), fields(tenant = %input.tenant_id, kind = ?input.kind))]
    pub async fn create_sale(&self, uow: &mut dyn UnitOfWork, input: NewSale) -> Result<SaleDetail, AppError> {
        if input.lines.is_empty() {
            return Err(AppError::InvalidInput("A venda precisa de ao menos um item.".to_string()));
        }
        if input.lines.iter().any(|l| l.unit_price < Decimal::ZERO) {
            return Err(AppError::InvalidInput("O preço unitário não pode ser negativo.".to_string()));
        }

        // 1. Modelo do aparelho
        uow.find_phone_model(input.tenant_id, input.phone_model_id)
            .await?
            .ok_or(AppError::NotFound("Modelo"))?;

        // 2. Linhas válidas (quantidade > 0) e peças da loja
        let lines: Vec<SaleLine> = input
            .lines
            .into_iter()
            .filter(|l| {
                if l.quantity <= 0 {
                    tracing::warn!("⚠️ Item ignorado na venda: peça {} com quantidade {}", l.part_id, l.quantity);
                    false
                } else {
                    true
                }
            })
            .collect();
        if lines.is_empty() {
            return Err(AppError::InvalidInput(
                "Nenhum item da venda tem quantidade positiva.".to_string(),
            ));
        }
        for line in &lines {
            let part = uow
                .find_part(input.tenant_id, line.part_id)
                .await?
                .ok_or(AppError::NotFound("Peça"))?;
            if !part.active {
                return Err(AppError::InvalidInput(format!(
                    "A peça {} está inativa e não pode ser vendida.",
                    part.id
                )));
            }
        }

        // 3. valor_total = Σ itens − desconto
        let total_amount = compute_total(&lines, input.discount)?;

        // 4. PIX online exige credenciais ativas da loja
        let payment_config = match input.kind {
            SaleKind::PixOnline => Some(active_config(uow, input.tenant_id).await?),
            _ => None,
        };

        // 5. Cabeçalho + itens
        let status = input.kind.initial_status();
        let header = NewSaleHeader {
            tenant_id: input.tenant_id,
            phone_model_id: input.phone_model_id,
            customer_name: input.customer_name,
            customer_phone: input.customer_phone,
            payment_method: input.kind.payment_method(),
            discount: input.discount,
            total_amount,
            status,
            paid_at: (status == SaleStatus::Finalizada).then(Utc::now),
        };
        let mut sale = uow.insert_sale(&header).await?;

        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            items.push(uow.insert_sale_item(input.tenant_id, sale.id, line).await?);
        }

        // 6. Efeito conforme o tipo
        match (input.kind, payment_config) {
            (SaleKind::Direct(_), _) => {
                self.apply_sale_exit(uow, &sale, &items).await?;
            }
            (SaleKind::PixOnline, Some(config)) => {
                let created = self
                    .gateway
                    .create_payment(
                        &config.access_token,
                        &CreatePaymentRequest {
                            amount: total_amount,
                            description: format!("Venda FITCELL #{}", sale.id),
                            payer_email: format!("cliente{}@{}", sale.id.simple(), self.payer_email_domain),
                            idempotency_key: sale.id,
                        },
                    )
                    .await?;

                sale.payment_id = Some(created.id);
                sale.payment_status = Some(created.status);
                sale.pix_qr_code = Some(created.pix_qr_code);
                sale.pix_qr_code_base64 = Some(created.pix_qr_code_base64);
                sale = uow.update_sale(&sale).await?;
            }
            _ => {}
        }

        tracing::info!("🧾 Venda {} criada ({:?}, total {})", sale.id, sale.status, sale.total_amount);
        Ok(SaleDetail { sale, items })
    }

    // --- CONVERT QUOTE ---
    /// ORCAMENTO -> FINALIZADA, com a mesma baixa de estoque de uma venda direta.
    #[tracing::instrument(skip(self, uow))]
    pub async fn convert_quote(
        &self,
        uow: &mut dyn UnitOfWork,
        tenant_id: Uuid,
        sale_id: Uuid,
        payment_method: PaymentMethod,
    ) -> Result<Sale, AppError> {
        let mut sale = uow
            .lock_sale(tenant_id, sale_id)
            .await?
            .ok_or(AppError::NotFound("Venda"))?;

        if sale.status != SaleStatus::Orcamento {
            return Err(AppError::InvalidSaleTransition {
                from: sale.status,
                to: SaleStatus::Finalizada,
            });
        }

        sale.status = SaleStatus::Finalizada;
        sale.payment_method = Some(payment_method);
        sale.paid_at = Some(Utc::now());
        let sale = uow.update_sale(&sale).await?;

        let items = uow.list_sale_items(tenant_id, sale_id).await?;
        self.apply_sale_exit(uow, &sale, &items).await?;

        tracing::info!("✅ Orçamento {} convertido em venda", sale_id);
        Ok(sale)
    }

    // --- CANCEL SALE ---
    /// Devoluções seguem a ordem de `part_id`, como em `apply_sale_exit`.
    #[tracing::instrument(skip(self, uow))]
    pub async fn cancel_sale(
        &self,
        uow: &mut dyn UnitOfWork,
        tenant_id: Uuid,
        sale_id: Uuid,
    ) -> Result<Sale, AppError> {
        let mut sale = uow
            .lock_sale(tenant_id, sale_id)
            .await?
            .ok_or(AppError::NotFound("Venda"))?;

        if sale.status == SaleStatus::Cancelada {
            return Err(AppError::SaleAlreadyCancelled);
        }
        if !sale.status.can_transition_to(SaleStatus::Cancelada) {
            return Err(AppError::InvalidSaleTransition {
                from: sale.status,
                to: SaleStatus::Cancelada,
            });
        }

        // Só devolve ao estoque o que de fato saiu
        if sale.status == SaleStatus::Finalizada {
            let note = format!("Estorno venda #{}", sale_id);
            let mut items = uow.list_sale_items(tenant_id, sale_id).await?;
            items.sort_by_key(|i| i.part_id);
            for item in items {
                let movement =
                    NewMovement::new(tenant_id, item.part_id, MovementKind::Devolucao, item.quantity, note.clone())
                        .with_sale(sale_id);
                self.ledger.record_movement(uow, movement).await?;
            }
        }

        sale.status = SaleStatus::Cancelada;
        let sale = uow.update_sale(&sale).await?;
        tracing::info!("🚫 Venda {} cancelada", sale_id);
        Ok(sale)
    }

    /// Uma saída por item. O saldo pode ficar negativo (venda sem estoque é registrada).
    ///
    /// Os saldos são travados em ordem de `part_id`: vendas concorrentes com as
    /// mesmas peças em ordens diferentes não podem se bloquear mutuamente.
    pub(crate) async fn apply_sale_exit(
        &self,
        uow: &mut dyn UnitOfWork,
        sale: &Sale,
        items: &[SaleItem],
    ) -> Result<(), AppError> {
        let note = format!("Venda #{}", sale.id);
        let mut ordered: Vec<&SaleItem> = items.iter().collect();
        ordered.sort_by_key(|i| i.part_id);
        for item in ordered {
            let movement =
                NewMovement::new(sale.tenant_id, item.part_id, MovementKind::Saida, -item.quantity, note.clone())
                    .with_sale(sale.id);
            let recorded = self.ledger.record_movement(uow, movement).await?;
            if recorded.level.quantity < 0 {
                tracing::warn!(
                    "⚠️ Estoque negativo: peça {} ficou com {} após a venda {}",
                    item.part_id,
                    recorded.level.quantity,
                    sale.id
                );
            }
        }
        Ok(())
    }
}

/// Credenciais ativas do gateway para a loja.
pub(crate) async fn active_config(uow: &mut dyn UnitOfWork, tenant_id: Uuid) -> Result<PaymentConfig, AppError> {
    uow.find_payment_config(tenant_id)
        .await?
        .filter(|c| c.active && !c.access_token.is_empty())
        .ok_or(AppError::PaymentNotConfigured)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{memory_store::MemoryStore, Store},
        services::payment_gateway::fake::FakeGateway,
    };

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    struct Fixture {
        store: MemoryStore,
        gateway: Arc<FakeGateway>,
        service: SaleService,
        tenant: Uuid,
        model: Uuid,
        part: Uuid,
    }

    async fn fixture(initial_stock: i32) -> Fixture {
        let store = MemoryStore::new();
        let gateway = Arc::new(FakeGateway::new());
        let service = SaleService::new(StockLedger::new(), gateway.clone(), "fitcell.local".into());
        let tenant = Uuid::new_v4();
        let model = store.seed_phone_model(tenant).await.id;
        let part = store.seed_part(tenant, dec("50.00")).await.id;

        if initial_stock != 0 {
            let mut uow = store.begin().await.unwrap();
            StockLedger::new()
                .record_movement(
                    uow.as_mut(),
                    NewMovement::new(tenant, part, MovementKind::Entrada, initial_stock, "carga"),
                )
                .await
                .unwrap();
            uow.commit().await.unwrap();
        }
        Fixture { store, gateway, service, tenant, model, part }
    }

    fn new_sale(f: &Fixture, kind: SaleKind, quantity: i32) -> NewSale {
        NewSale {
            tenant_id: f.tenant,
            phone_model_id: f.model,
            customer_name: Some("Maria".into()),
            customer_phone: None,
            discount: Decimal::ZERO,
            lines: vec![SaleLine { part_id: f.part, quantity, unit_price: dec("50.00") }],
            kind,
        }
    }

    async fn sell(f: &Fixture, kind: SaleKind, quantity: i32) -> Result<SaleDetail, AppError> {
        let mut uow = f.store.begin().await?;
        let detail = f.service.create_sale(uow.as_mut(), new_sale(f, kind, quantity)).await?;
        uow.commit().await?;
        Ok(detail)
    }

    async fn cancel(f: &Fixture, sale_id: Uuid) -> Result<Sale, AppError> {
        let mut uow = f.store.begin().await?;
        let sale = f.service.cancel_sale(uow.as_mut(), f.tenant, sale_id).await?;
        uow.commit().await?;
        Ok(sale)
    }

    #[tokio::test]
    async fn sale_and_cancel_round_trip() {
        let f = fixture(10).await;
        let detail = sell(&f, SaleKind::Direct(PaymentMethod::Dinheiro), 4).await.unwrap();
        assert_eq!(detail.sale.status, SaleStatus::Finalizada);
        assert_eq!(detail.sale.total_amount, dec("200.00"));
        assert!(detail.sale.paid_at.is_some());
        assert_eq!(f.store.snapshot().await.stock_of(f.tenant, f.part), 6);

        let cancelled = cancel(&f, detail.sale.id).await.unwrap();
        assert_eq!(cancelled.status, SaleStatus::Cancelada);

        let state = f.store.snapshot().await;
        assert_eq!(state.stock_of(f.tenant, f.part), 10);
        let devolucoes = state.movements_of_kind(MovementKind::Devolucao);
        assert_eq!(devolucoes.len(), 1);
        assert_eq!(devolucoes[0].quantity, 4);
        assert_eq!(devolucoes[0].notes, format!("Estorno venda #{}", detail.sale.id));

        // Segundo cancelamento: erro e nenhuma movimentação nova
        let err = cancel(&f, detail.sale.id).await.unwrap_err();
        assert!(matches!(err, AppError::SaleAlreadyCancelled));
        assert_eq!(f.store.snapshot().await.movements.len(), state.movements.len());
    }

    #[tokio::test]
    async fn oversell_is_allowed() {
        let f = fixture(1).await;
        sell(&f, SaleKind::Direct(PaymentMethod::Cartao), 3).await.unwrap();

        let state = f.store.snapshot().await;
        assert_eq!(state.stock_of(f.tenant, f.part), -2);
        assert_eq!(state.movement_sum(f.tenant, f.part), -2);
    }

    #[tokio::test]
    async fn quote_has_no_stock_effect_until_converted() {
        let f = fixture(5).await;
        let detail = sell(&f, SaleKind::Quote, 2).await.unwrap();
        assert_eq!(detail.sale.status, SaleStatus::Orcamento);
        assert_eq!(detail.sale.payment_method, None);
        assert_eq!(f.store.snapshot().await.stock_of(f.tenant, f.part), 5);

        let mut uow = f.store.begin().await.unwrap();
        let converted = f
            .service
            .convert_quote(uow.as_mut(), f.tenant, detail.sale.id, PaymentMethod::Pix)
            .await
            .unwrap();
        uow.commit().await.unwrap();

        assert_eq!(converted.status, SaleStatus::Finalizada);
        assert_eq!(converted.payment_method, Some(PaymentMethod::Pix));
        let state = f.store.snapshot().await;
        assert_eq!(state.stock_of(f.tenant, f.part), 3);
        assert_eq!(state.movements_of_kind(MovementKind::Saida).len(), 1);
    }

    #[tokio::test]
    async fn finalized_sale_cannot_be_converted_again() {
        let f = fixture(5).await;
        let detail = sell(&f, SaleKind::Direct(PaymentMethod::Dinheiro), 1).await.unwrap();

        let mut uow = f.store.begin().await.unwrap();
        let err = f
            .service
            .convert_quote(uow.as_mut(), f.tenant, detail.sale.id, PaymentMethod::Dinheiro)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidSaleTransition { from: SaleStatus::Finalizada, .. }
        ));
    }

    #[tokio::test]
    async fn quote_cannot_be_cancelled() {
        let f = fixture(5).await;
        let detail = sell(&f, SaleKind::Quote, 1).await.unwrap();
        let err = cancel(&f, detail.sale.id).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidSaleTransition { from: SaleStatus::Orcamento, to: SaleStatus::Cancelada }
        ));
    }

    #[tokio::test]
    async fn pix_sale_waits_for_payment() {
        let f = fixture(5).await;
        f.store.seed_payment_config(f.tenant, "APP_USR-loja").await;

        let detail = sell(&f, SaleKind::PixOnline, 2).await.unwrap();
        assert_eq!(detail.sale.status, SaleStatus::AguardandoPagamento);
        assert_eq!(detail.sale.payment_id.as_deref(), Some("PIX-1"));
        assert!(detail.sale.pix_qr_code.is_some());

        let requests = f.gateway.created_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].amount, dec("100.00"));
        assert_eq!(requests[0].description, format!("Venda FITCELL #{}", detail.sale.id));

        let state = f.store.snapshot().await;
        assert_eq!(state.stock_of(f.tenant, f.part), 5);
        assert!(state.movements_of_kind(MovementKind::Saida).is_empty());

        // Cancelar antes do pagamento não devolve nada
        cancel(&f, detail.sale.id).await.unwrap();
        let state = f.store.snapshot().await;
        assert_eq!(state.stock_of(f.tenant, f.part), 5);
        assert!(state.movements_of_kind(MovementKind::Devolucao).is_empty());
    }

    #[tokio::test]
    async fn pix_sale_requires_payment_config() {
        let f = fixture(5).await;
        let err = sell(&f, SaleKind::PixOnline, 1).await.unwrap_err();
        assert!(matches!(err, AppError::PaymentNotConfigured));
        assert!(f.store.snapshot().await.sales.is_empty());
    }

    #[tokio::test]
    async fn gateway_failure_rolls_back_pix_sale() {
        let f = fixture(5).await;
        f.store.seed_payment_config(f.tenant, "APP_USR-loja").await;
        f.gateway.set_unavailable(true);

        let err = sell(&f, SaleKind::PixOnline, 1).await.unwrap_err();
        assert!(matches!(err, AppError::GatewayUnavailable(_)));
        let state = f.store.snapshot().await;
        assert!(state.sales.is_empty());
        assert!(state.sale_items.is_empty());
    }

    #[tokio::test]
    async fn fractional_cents_never_reach_the_gateway() {
        let f = fixture(5).await;
        f.store.seed_payment_config(f.tenant, "APP_USR-loja").await;
        let mut input = new_sale(&f, SaleKind::PixOnline, 3);
        input.lines[0].unit_price = dec("33.333");

        let mut uow = f.store.begin().await.unwrap();
        let err = f.service.create_sale(uow.as_mut(), input).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        drop(uow);

        assert!(f.gateway.created_requests().is_empty());
        assert!(f.store.snapshot().await.sales.is_empty());
    }

    #[tokio::test]
    async fn inactive_part_cannot_be_sold_or_quoted() {
        let f = fixture(5).await;
        f.store.deactivate_part(f.part).await;

        for kind in [SaleKind::Direct(PaymentMethod::Dinheiro), SaleKind::Quote] {
            let err = sell(&f, kind, 1).await.unwrap_err();
            assert!(matches!(err, AppError::InvalidInput(_)));
        }
        let state = f.store.snapshot().await;
        assert!(state.sales.is_empty());
        assert_eq!(state.stock_of(f.tenant, f.part), 5);
    }

    #[tokio::test]
    async fn exits_are_recorded_in_part_order() {
        let f = fixture(5).await;
        let other = f.store.seed_part(f.tenant, dec("30.00")).await.id;
        let (first, second) = if other > f.part { (other, f.part) } else { (f.part, other) };

        let mut input = new_sale(&f, SaleKind::Direct(PaymentMethod::Cartao), 1);
        input.lines = vec![
            SaleLine { part_id: first, quantity: 1, unit_price: dec("50.00") },
            SaleLine { part_id: second, quantity: 2, unit_price: dec("30.00") },
        ];
        let mut uow = f.store.begin().await.unwrap();
        let detail = f.service.create_sale(uow.as_mut(), input).await.unwrap();
        uow.commit().await.unwrap();

        let state = f.store.snapshot().await;
        let saidas: Vec<Uuid> = state
            .movements_of_kind(MovementKind::Saida)
            .iter()
            .map(|m| m.part_id)
            .collect();
        assert_eq!(saidas, vec![second, first]);

        cancel(&f, detail.sale.id).await.unwrap();
        let state = f.store.snapshot().await;
        let devolucoes: Vec<Uuid> = state
            .movements_of_kind(MovementKind::Devolucao)
            .iter()
            .map(|m| m.part_id)
            .collect();
        assert_eq!(devolucoes, vec![second, first]);
    }

    #[tokio::test]
    async fn discount_above_subtotal_is_rejected() {
        let f = fixture(5).await;
        let mut input = new_sale(&f, SaleKind::Direct(PaymentMethod::Dinheiro), 1);
        input.discount = dec("60.00");

        let mut uow = f.store.begin().await.unwrap();
        let err = f.service.create_sale(uow.as_mut(), input).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}
