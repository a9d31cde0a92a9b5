// src/services/payment_gateway.rs

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    common::error::AppError,
    models::payment::{CreatePaymentRequest, CreatedPayment, ExternalId, GatewayPayment},
};

/// Cliente do provedor de pagamentos. As credenciais são da loja,
/// por isso o token vai em cada chamada.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment(
        &self,
        access_token: &str,
        request: &CreatePaymentRequest,
    ) -> Result<CreatedPayment, AppError>;

    async fn get_payment(&self, access_token: &str, payment_id: &str) -> Result<GatewayPayment, AppError>;
}

// ---
// Mercado Pago (API REST v1)
// ---

#[derive(Clone)]
pub struct MercadoPagoClient {
    client: reqwest::Client,
    base_url: String,
}

impl MercadoPagoClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::InternalServerError(e.into()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn read_payment(response: reqwest::Response) -> Result<MpPayment, AppError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }
        response
            .json::<MpPayment>()
            .await
            .map_err(|e| AppError::GatewayResponse(format!("corpo inválido: {}", e)))
    }
}

// Formatos da API (validados na desserialização)

#[derive(Serialize)]
struct MpCreatePayment<'a> {
    transaction_amount: Decimal,
    description: &'a str,
    payment_method_id: &'static str,
    payer: MpPayer<'a>,
}

#[derive(Serialize)]
struct MpPayer<'a> {
    email: &'a str,
}

#[derive(Deserialize)]
struct MpPayment {
    id: ExternalId,
    status: String,
    transaction_amount: Decimal,
    point_of_interaction: Option<MpPointOfInteraction>,
}

#[derive(Deserialize)]
struct MpPointOfInteraction {
    transaction_data: MpTransactionData,
}

#[derive(Deserialize)]
struct MpTransactionData {
    qr_code: String,
    qr_code_base64: String,
}

/// 5xx / 429 são transitórios; o resto é resposta inválida.
fn classify_status(status: StatusCode, body: &str) -> AppError {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        AppError::GatewayUnavailable(format!("HTTP {}", status))
    } else {
        AppError::GatewayResponse(format!("HTTP {}: {}", status, body))
    }
}

fn classify_transport(e: reqwest::Error) -> AppError {
    if e.is_timeout() {
        AppError::GatewayUnavailable("tempo limite excedido".to_string())
    } else {
        AppError::GatewayUnavailable(e.to_string())
    }
}

#[async_trait]
impl PaymentGateway for MercadoPagoClient {
    #[instrument(skip(self, access_token, request), fields(amount = %request.amount))]
    async fn create_payment(
        &self,
        access_token: &str,
        request: &CreatePaymentRequest,
    ) -> Result<CreatedPayment, AppError> {
        let body = MpCreatePayment {
            transaction_amount: request.amount,
            description: &request.description,
            payment_method_id: "pix",
            payer: MpPayer { email: &request.payer_email },
        };

        let response = self
            .client
            .post(format!("{}/v1/payments", self.base_url))
            .bearer_auth(access_token)
            .header("X-Idempotency-Key", request.idempotency_key.to_string())
            .json(&body)
            .send()
            .await
            .map_err(classify_transport)?;

        let payment = Self::read_payment(response).await?;
        let pix = payment
            .point_of_interaction
            .ok_or_else(|| AppError::GatewayResponse("pagamento sem dados do PIX".to_string()))?
            .transaction_data;

        Ok(CreatedPayment {
            id: payment.id.into_string(),
            status: payment.status,
            pix_qr_code: pix.qr_code,
            pix_qr_code_base64: pix.qr_code_base64,
        })
    }

    #[instrument(skip(self, access_token))]
    async fn get_payment(&self, access_token: &str, payment_id: &str) -> Result<GatewayPayment, AppError> {
        let response = self
            .client
            .get(format!("{}/v1/payments/{}", self.base_url, payment_id))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(classify_transport)?;

        let payment = Self::read_payment(response).await?;
        Ok(GatewayPayment {
            id: payment.id.into_string(),
            status: payment.status,
            transaction_amount: payment.transaction_amount,
        })
    }
}

// ---
// Gateway roteirizado para os testes dos workflows
// ---
#[cfg(test)]
pub mod fake {
    use std::{
        collections::HashMap,
        sync::{
            atomic::{AtomicBool, AtomicUsize, Ordering},
            Mutex,
        },
    };

    use super::*;

    #[derive(Default)]
    pub struct FakeGateway {
        payments: Mutex<HashMap<String, GatewayPayment>>,
        created: Mutex<Vec<CreatePaymentRequest>>,
        get_calls: AtomicUsize,
        unavailable: AtomicBool,
    }

    impl FakeGateway {
        pub fn new() -> Self {
            Self::default()
        }

        /// Define a resposta autoritativa para um pagamento.
        pub fn set_payment(&self, id: &str, status: &str, amount: Decimal) {
            self.payments.lock().unwrap().insert(
                id.to_string(),
                GatewayPayment {
                    id: id.to_string(),
                    status: status.to_string(),
                    transaction_amount: amount,
                },
            );
        }

        pub fn set_unavailable(&self, unavailable: bool) {
            self.unavailable.store(unavailable, Ordering::SeqCst);
        }

        pub fn get_calls(&self) -> usize {
            self.get_calls.load(Ordering::SeqCst)
        }

        pub fn created_requests(&self) -> Vec<CreatePaymentRequest> {
            self.created.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PaymentGateway for FakeGateway {
        async fn create_payment(
            &self,
            _access_token: &str,
            request: &CreatePaymentRequest,
        ) -> Result<CreatedPayment, AppError> {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(AppError::GatewayUnavailable("fake offline".into()));
            }
            let mut created = self.created.lock().unwrap();
            created.push(request.clone());
            let id = format!("PIX-{}", created.len());
            self.set_payment(&id, "pending", request.amount);
            Ok(CreatedPayment {
                id,
                status: "pending".into(),
                pix_qr_code: "00020126580014br.gov.bcb.pix".into(),
                pix_qr_code_base64: "iVBORw0KGgo=".into(),
            })
        }

        async fn get_payment(&self, _access_token: &str, payment_id: &str) -> Result<GatewayPayment, AppError> {
            self.get_calls.fetch_add(1, Ordering::SeqCst);
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(AppError::GatewayUnavailable("fake offline".into()));
            }
            self.payments
                .lock()
                .unwrap()
                .get(payment_id)
                .cloned()
                .ok_or_else(|| AppError::GatewayResponse(format!("HTTP 404: {}", payment_id)))
        }
    }
}
