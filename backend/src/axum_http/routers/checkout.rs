use std::sync::Arc;

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::post};
use crates::domain::{
    repositories::commerce_store::CommerceStore, value_objects::checkout::CheckoutModel,
};

use crate::{
    auth::AuthUser,
    axum_http::error_responses::AppError,
    usecases::{checkout::CheckoutUseCase, payment_reconciler::PaymentGateway},
};

pub fn routes<S, G>(checkout_usecase: Arc<CheckoutUseCase<S, G>>) -> Router
where
    S: CommerceStore + 'static,
    G: PaymentGateway + 'static,
{
    Router::new()
        .route("/", post(checkout))
        .with_state(checkout_usecase)
}

pub async fn checkout<S, G>(
    State(checkout_usecase): State<Arc<CheckoutUseCase<S, G>>>,
    auth: AuthUser,
    Json(checkout_model): Json<CheckoutModel>,
) -> Result<impl IntoResponse, AppError>
where
    S: CommerceStore + 'static,
    G: PaymentGateway + 'static,
{
    let placed = checkout_usecase
        .checkout(auth.user_id, checkout_model)
        .await?;
    Ok((StatusCode::CREATED, Json(placed)))
}
