use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use crates::{
    domain::{
        repositories::commerce_store::CommerceStore, value_objects::payments::CaptureRedirectQuery,
    },
    payments::callback_signature::SIGNATURE_HEADER,
};
use tracing::info;

use crate::{
    axum_http::error_responses::AppError,
    usecases::payment_reconciler::{PaymentGateway, PaymentReconciler},
};

/// Gateway-facing endpoints. They are reached by the payer's browser or by the gateway
/// itself, so they do not carry a user identity.
pub fn routes<S, G>(reconciler: Arc<PaymentReconciler<S, G>>) -> Router
where
    S: CommerceStore + 'static,
    G: PaymentGateway + 'static,
{
    Router::new()
        .route("/capture", get(capture))
        .route("/webhook", post(webhook))
        .with_state(reconciler)
}

pub async fn capture<S, G>(
    State(reconciler): State<Arc<PaymentReconciler<S, G>>>,
    Query(query): Query<CaptureRedirectQuery>,
) -> Result<impl IntoResponse, AppError>
where
    S: CommerceStore + 'static,
    G: PaymentGateway + 'static,
{
    if query.token.trim().is_empty() {
        return Err(AppError::BadRequest("token is required".to_string()));
    }

    info!(
        provider_ref = %query.token,
        payer_id = query.payer_id.as_deref().unwrap_or("-"),
        "payments: capture redirect received"
    );

    let status = reconciler.capture_by_token(&query.token).await?;
    Ok((StatusCode::OK, Json(status)))
}

pub async fn webhook<S, G>(
    State(reconciler): State<Arc<PaymentReconciler<S, G>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError>
where
    S: CommerceStore + 'static,
    G: PaymentGateway + 'static,
{
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::BadRequest(format!("missing {SIGNATURE_HEADER} header")))?;

    let status = reconciler.handle_webhook(&body, signature, Utc::now().timestamp())?;
    Ok((StatusCode::OK, Json(status)))
}
