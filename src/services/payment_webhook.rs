// src/services/payment_webhook.rs

use std::sync::Arc;

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{
    common::error::AppError,
    db::UnitOfWork,
    models::{
        payment::{WebhookNotification, WebhookOutcome},
        sale::SaleStatus,
    },
    services::{
        payment_gateway::PaymentGateway,
        sale_service::{active_config, SaleService},
    },
};

type HmacSha256 = Hmac<Sha256>;

/// Reconciliação das notificações do gateway com as vendas PIX.
///
/// A venda é travada (FOR UPDATE) antes da checagem de idempotência: duas
/// entregas simultâneas do mesmo pagamento são serializadas e a segunda
/// encontra a venda já FINALIZADA.
#[derive(Clone)]
pub struct PaymentWebhookService {
    sales: SaleService,
    gateway: Arc<dyn PaymentGateway>,
}

impl PaymentWebhookService {
    pub fn new(sales: SaleService, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { sales, gateway }
    }

    /// Processa uma notificação. Os desfechos de negócio voltam como
    /// `WebhookOutcome`; erros (gateway fora, valor divergente) abortam a
    /// unidade de trabalho e o gateway reenviará.
    #[tracing::instrument(skip(self, uow, notification))]
    pub async fn handle_notification(
        &self,
        uow: &mut dyn UnitOfWork,
        notification: &WebhookNotification,
    ) -> Result<WebhookOutcome, AppError> {
        // 1. Só eventos de pagamento com id
        let Some(payment_id) = notification.payment_id() else {
            tracing::debug!("Notificação ignorada: {:?}", notification.kind);
            return Ok(WebhookOutcome::Ignored);
        };

        // 2. Trava a venda pelo id externo
        let Some(mut sale) = uow.lock_sale_by_payment_id(&payment_id).await? else {
            tracing::info!("Pagamento {} sem venda correspondente", payment_id);
            return Ok(WebhookOutcome::SaleNotFound);
        };

        // 3. Idempotência
        match sale.status {
            SaleStatus::AguardandoPagamento => {}
            SaleStatus::Finalizada => {
                tracing::info!("🔁 Pagamento {} já processado (venda {})", payment_id, sale.id);
                return Ok(WebhookOutcome::AlreadyProcessed);
            }
            SaleStatus::Cancelada => {
                tracing::warn!("Pagamento {} para venda cancelada {}", payment_id, sale.id);
                return Ok(WebhookOutcome::SaleCancelled);
            }
            SaleStatus::Orcamento => {
                tracing::warn!("Pagamento {} aponta para o orçamento {}", payment_id, sale.id);
                return Ok(WebhookOutcome::Ignored);
            }
        }

        // 4. Situação autoritativa no gateway (nunca confia no corpo do webhook)
        let config = active_config(uow, sale.tenant_id).await?;
        let payment = self.gateway.get_payment(&config.access_token, &payment_id).await?;

        // 5. Ainda não aprovado: guarda o status para o polling da tela
        if !payment.is_approved() {
            sale.payment_status = Some(payment.status.clone());
            uow.update_sale(&sale).await?;
            tracing::info!("⏳ Pagamento {} com status '{}'", payment_id, payment.status);
            return Ok(WebhookOutcome::NotApproved(payment.status));
        }

        // 6. Valor pago precisa bater com o total da venda
        let received = payment.transaction_amount.round_dp(2);
        let expected = sale.total_amount.round_dp(2);
        if received != expected {
            tracing::error!(
                "🚨 Valor divergente no pagamento {} (venda {}): esperado {}, recebido {}",
                payment_id,
                sale.id,
                expected,
                received
            );
            return Err(AppError::AmountMismatch { expected, received });
        }

        // 7. Finaliza e baixa o estoque
        sale.status = SaleStatus::Finalizada;
        sale.paid_at = Some(Utc::now());
        sale.payment_status = Some(payment.status);
        let sale = uow.update_sale(&sale).await?;

        let items = uow.list_sale_items(sale.tenant_id, sale.id).await?;
        self.sales.apply_sale_exit(uow, &sale, &items).await?;

        tracing::info!("💰 Venda {} finalizada pelo pagamento {}", sale.id, payment_id);
        Ok(WebhookOutcome::Finalized)
    }
}

/// Confere o cabeçalho `x-signature` (`ts=<unix>,v1=<hex>`): HMAC-SHA256 de
/// `id:<data.id>;request-id:<x-request-id>;ts:<ts>;` com o segredo do webhook.
pub fn verify_signature(secret: &str, signature_header: &str, request_id: &str, data_id: &str) -> bool {
    let mut ts = None;
    let mut v1 = None;
    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("ts", value)) => ts = Some(value.trim()),
            Some(("v1", value)) => v1 = Some(value.trim()),
            _ => {}
        }
    }
    let (Some(ts), Some(v1)) = (ts, v1) else {
        return false;
    };
    let Ok(expected) = hex::decode(v1) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };

    let manifest = format!("id:{};request-id:{};ts:{};", data_id, request_id, ts);
    mac.update(manifest.as_bytes());
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{memory_store::MemoryStore, Store},
        models::{
            sale::{NewSale, SaleKind, SaleLine},
            stock::{MovementKind, NewMovement},
        },
        services::{payment_gateway::fake::FakeGateway, stock_ledger::StockLedger},
    };
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    struct Fixture {
        store: MemoryStore,
        gateway: Arc<FakeGateway>,
        service: PaymentWebhookService,
        tenant: Uuid,
        part: Uuid,
        sale_id: Uuid,
        payment_id: String,
    }

    /// Venda PIX de 2 × 60,00 = 120,00 aguardando pagamento, com 10 peças em estoque.
    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let gateway = Arc::new(FakeGateway::new());
        let sales = SaleService::new(StockLedger::new(), gateway.clone(), "fitcell.local".into());
        let service = PaymentWebhookService::new(sales.clone(), gateway.clone());

        let tenant = Uuid::new_v4();
        let model = store.seed_phone_model(tenant).await.id;
        let part = store.seed_part(tenant, dec("60.00")).await.id;
        store.seed_payment_config(tenant, "APP_USR-loja").await;

        let mut uow = store.begin().await.unwrap();
        StockLedger::new()
            .record_movement(uow.as_mut(), NewMovement::new(tenant, part, MovementKind::Entrada, 10, "carga"))
            .await
            .unwrap();
        let detail = sales
            .create_sale(
                uow.as_mut(),
                NewSale {
                    tenant_id: tenant,
                    phone_model_id: model,
                    customer_name: None,
                    customer_phone: None,
                    discount: Decimal::ZERO,
                    lines: vec![SaleLine { part_id: part, quantity: 2, unit_price: dec("60.00") }],
                    kind: SaleKind::PixOnline,
                },
            )
            .await
            .unwrap();
        uow.commit().await.unwrap();

        let payment_id = detail.sale.payment_id.clone().unwrap();
        Fixture { store, gateway, service, tenant, part, sale_id: detail.sale.id, payment_id }
    }

    fn notification(payment_id: &str) -> WebhookNotification {
        serde_json::from_value(serde_json::json!({
            "type": "payment",
            "data": { "id": payment_id }
        }))
        .unwrap()
    }

    async fn deliver(
        store: &MemoryStore,
        service: &PaymentWebhookService,
        notification: &WebhookNotification,
    ) -> Result<WebhookOutcome, AppError> {
        let mut uow = store.begin().await?;
        let outcome = service.handle_notification(uow.as_mut(), notification).await?;
        uow.commit().await?;
        Ok(outcome)
    }

    #[tokio::test]
    async fn approved_payment_finalizes_once() {
        let f = fixture().await;
        f.gateway.set_payment(&f.payment_id, "approved", dec("120.00"));
        let n = notification(&f.payment_id);

        let mut outcomes = Vec::new();
        for _ in 0..3 {
            outcomes.push(deliver(&f.store, &f.service, &n).await.unwrap());
        }
        assert_eq!(
            outcomes,
            vec![
                WebhookOutcome::Finalized,
                WebhookOutcome::AlreadyProcessed,
                WebhookOutcome::AlreadyProcessed
            ]
        );
        assert_eq!(f.gateway.get_calls(), 1);

        let state = f.store.snapshot().await;
        let sale = state.sale(f.sale_id).unwrap();
        assert_eq!(sale.status, SaleStatus::Finalizada);
        assert!(sale.paid_at.is_some());
        assert_eq!(sale.payment_status.as_deref(), Some("approved"));
        let saidas = state.movements_of_kind(MovementKind::Saida);
        assert_eq!(saidas.len(), 1);
        assert_eq!(saidas[0].quantity, -2);
        assert_eq!(saidas[0].sale_id, Some(f.sale_id));
        assert_eq!(state.stock_of(f.tenant, f.part), 8);
    }

    #[tokio::test]
    async fn amount_mismatch_changes_nothing() {
        let f = fixture().await;
        f.gateway.set_payment(&f.payment_id, "approved", dec("99.00"));

        let err = deliver(&f.store, &f.service, &notification(&f.payment_id))
            .await
            .unwrap_err();
        match err {
            AppError::AmountMismatch { expected, received } => {
                assert_eq!(expected, dec("120.00"));
                assert_eq!(received, dec("99.00"));
            }
            other => panic!("erro inesperado: {other:?}"),
        }

        let state = f.store.snapshot().await;
        assert_eq!(state.sale(f.sale_id).unwrap().status, SaleStatus::AguardandoPagamento);
        assert!(state.movements_of_kind(MovementKind::Saida).is_empty());
        assert_eq!(state.stock_of(f.tenant, f.part), 10);
    }

    #[tokio::test]
    async fn pending_payment_only_records_status() {
        let f = fixture().await;
        f.gateway.set_payment(&f.payment_id, "in_process", dec("120.00"));

        let outcome = deliver(&f.store, &f.service, &notification(&f.payment_id))
            .await
            .unwrap();
        assert_eq!(outcome, WebhookOutcome::NotApproved("in_process".into()));

        let state = f.store.snapshot().await;
        let sale = state.sale(f.sale_id).unwrap();
        assert_eq!(sale.status, SaleStatus::AguardandoPagamento);
        assert_eq!(sale.payment_status.as_deref(), Some("in_process"));
        assert!(state.movements_of_kind(MovementKind::Saida).is_empty());
    }

    #[tokio::test]
    async fn gateway_outage_leaves_sale_pending() {
        let f = fixture().await;
        f.gateway.set_unavailable(true);

        let err = deliver(&f.store, &f.service, &notification(&f.payment_id))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::GatewayUnavailable(_)));
        let state = f.store.snapshot().await;
        assert_eq!(state.sale(f.sale_id).unwrap().status, SaleStatus::AguardandoPagamento);
        assert!(state.movements_of_kind(MovementKind::Saida).is_empty());
    }

    #[tokio::test]
    async fn unrelated_notifications_are_no_ops() {
        let f = fixture().await;

        let other_type: WebhookNotification =
            serde_json::from_str(r#"{"type":"merchant_order","data":{"id":"1"}}"#).unwrap();
        assert_eq!(
            deliver(&f.store, &f.service, &other_type).await.unwrap(),
            WebhookOutcome::Ignored
        );
        assert_eq!(
            deliver(&f.store, &f.service, &notification("desconhecido")).await.unwrap(),
            WebhookOutcome::SaleNotFound
        );
        assert_eq!(f.gateway.get_calls(), 0);
    }

    #[tokio::test]
    async fn cancelled_sale_is_not_finalized() {
        let f = fixture().await;
        f.gateway.set_payment(&f.payment_id, "approved", dec("120.00"));

        let sales = SaleService::new(StockLedger::new(), f.gateway.clone(), "fitcell.local".into());
        let mut uow = f.store.begin().await.unwrap();
        sales.cancel_sale(uow.as_mut(), f.tenant, f.sale_id).await.unwrap();
        uow.commit().await.unwrap();

        let outcome = deliver(&f.store, &f.service, &notification(&f.payment_id))
            .await
            .unwrap();
        assert_eq!(outcome, WebhookOutcome::SaleCancelled);
        assert_eq!(f.gateway.get_calls(), 0);
        assert_eq!(f.store.snapshot().await.stock_of(f.tenant, f.part), 10);
    }

    #[tokio::test]
    async fn concurrent_deliveries_finalize_exactly_once() {
        let f = fixture().await;
        f.gateway.set_payment(&f.payment_id, "approved", dec("120.00"));
        let n = notification(&f.payment_id);

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let store = f.store.clone();
                let service = f.service.clone();
                let n = n.clone();
                tokio::spawn(async move { deliver(&store, &service, &n).await })
            })
            .collect();

        let mut outcomes = Vec::new();
        for h in handles {
            outcomes.push(h.await.unwrap().unwrap());
        }

        assert_eq!(outcomes.iter().filter(|o| **o == WebhookOutcome::Finalized).count(), 1);
        assert_eq!(
            outcomes.iter().filter(|o| **o == WebhookOutcome::AlreadyProcessed).count(),
            1
        );
        let state = f.store.snapshot().await;
        assert_eq!(state.movements_of_kind(MovementKind::Saida).len(), 1);
        assert_eq!(state.stock_of(f.tenant, f.part), 8);
        assert_eq!(state.movement_sum(f.tenant, f.part), 8);
    }

    // --- Assinatura ---

    fn sign(secret: &str, manifest: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(manifest.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn valid_signature_is_accepted() {
        let v1 = sign("segredo", "id:123;request-id:req-1;ts:1700000000;");
        let header = format!("ts=1700000000,v1={}", v1);
        assert!(verify_signature("segredo", &header, "req-1", "123"));
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let v1 = sign("segredo", "id:123;request-id:req-1;ts:1700000000;");
        let header = format!("ts=1700000000,v1={}", v1);
        assert!(!verify_signature("segredo", &header, "req-1", "999"));
        assert!(!verify_signature("outro", &header, "req-1", "123"));
        assert!(!verify_signature("segredo", "v1=abc", "req-1", "123"));
        assert!(!verify_signature("segredo", "ts=1,v1=nao-e-hex", "req-1", "123"));
    }
}
