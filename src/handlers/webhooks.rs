// src/handlers/webhooks.rs

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    models::payment::{WebhookAck, WebhookNotification, WebhookOutcome},
    services::payment_webhook::verify_signature,
};

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers.get(name).and_then(|v| v.to_str().ok()).unwrap_or_default()
}

fn ack(outcome: &WebhookOutcome) -> Json<WebhookAck> {
    Json(WebhookAck { status: outcome.status_tag().to_string() })
}

// POST /api/webhooks/payments (público; chamado pelo gateway)
#[utoipa::path(
    post,
    path = "/api/webhooks/payments",
    tag = "Webhooks",
    request_body(content = String, description = "Notificação do gateway: { \"type\": \"payment\", \"data\": { \"id\": ... } }"),
    responses(
        (status = 200, description = "Notificação tratada (inclusive ignorada ou repetida)", body = WebhookAck),
        (status = 400, description = "Valor pago diverge do total da venda"),
        (status = 401, description = "Assinatura inválida"),
        (status = 503, description = "Gateway indisponível; a notificação será reenviada")
    )
)]
pub async fn payment_notification(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    // 1. Corpo desconhecido não gera retry
    let notification: WebhookNotification = match serde_json::from_slice(&body) {
        Ok(n) => n,
        Err(e) => {
            tracing::debug!("Webhook com corpo não reconhecido: {}", e);
            return Ok((StatusCode::OK, ack(&WebhookOutcome::Ignored)));
        }
    };

    let Some(payment_id) = notification.payment_id() else {
        return Ok((StatusCode::OK, ack(&WebhookOutcome::Ignored)));
    };

    // 2. Autenticidade (só quando o segredo está configurado)
    if let Some(secret) = app_state.config.payment_webhook_secret.as_deref() {
        let signature = header_str(&headers, "x-signature");
        let request_id = header_str(&headers, "x-request-id");
        if !verify_signature(secret, signature, request_id, &payment_id) {
            tracing::warn!("⛔ Webhook com assinatura inválida para o pagamento {}", payment_id);
            return Err(AppError::InvalidSignature.into());
        }
    }

    // 3. Uma transação por entrega; erro = rollback e o gateway reenvia
    let mut uow = app_state.store.begin().await?;
    let outcome = app_state
        .webhook_service
        .handle_notification(uow.as_mut(), &notification)
        .await?;
    uow.commit().await?;

    if let WebhookOutcome::NotApproved(status) = &outcome {
        tracing::debug!("Pagamento {} segue '{}'; aguardando nova notificação", payment_id, status);
    }

    Ok((StatusCode::OK, ack(&outcome)))
}
