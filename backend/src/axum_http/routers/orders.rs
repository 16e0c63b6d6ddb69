use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use crates::domain::repositories::{commerce_store::CommerceStore, orders::OrderQueryRepository};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    axum_http::error_responses::AppError,
    usecases::{
        orders::OrderUseCase,
        payment_reconciler::{PaymentGateway, PaymentReconciler},
    },
};

pub fn routes<S, Q, G>(
    order_usecase: Arc<OrderUseCase<S, Q>>,
    reconciler: Arc<PaymentReconciler<S, G>>,
) -> Router
where
    S: CommerceStore + 'static,
    Q: OrderQueryRepository + Send + Sync + 'static,
    G: PaymentGateway + 'static,
{
    let payment_intents = Router::new()
        .route("/:order_id/payment-intent", post(create_payment_intent))
        .with_state(reconciler);

    Router::new()
        .route("/", get(list_orders))
        .route("/:order_id", get(get_order))
        .route("/:order_id/cancel", put(cancel_order))
        .with_state(order_usecase)
        .merge(payment_intents)
}

pub async fn list_orders<S, Q>(
    State(order_usecase): State<Arc<OrderUseCase<S, Q>>>,
    auth: AuthUser,
) -> Result<impl IntoResponse, AppError>
where
    S: CommerceStore + 'static,
    Q: OrderQueryRepository + Send + Sync + 'static,
{
    let orders = order_usecase.list_orders(auth.user_id).await?;
    Ok((StatusCode::OK, Json(orders)))
}

pub async fn get_order<S, Q>(
    State(order_usecase): State<Arc<OrderUseCase<S, Q>>>,
    auth: AuthUser,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError>
where
    S: CommerceStore + 'static,
    Q: OrderQueryRepository + Send + Sync + 'static,
{
    let order = order_usecase.get_order(auth.user_id, order_id).await?;
    Ok((StatusCode::OK, Json(order)))
}

pub async fn cancel_order<S, Q>(
    State(order_usecase): State<Arc<OrderUseCase<S, Q>>>,
    auth: AuthUser,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError>
where
    S: CommerceStore + 'static,
    Q: OrderQueryRepository + Send + Sync + 'static,
{
    let order = order_usecase.cancel_order(auth.user_id, order_id).await?;
    Ok((StatusCode::OK, Json(order)))
}

pub async fn create_payment_intent<S, G>(
    State(reconciler): State<Arc<PaymentReconciler<S, G>>>,
    auth: AuthUser,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError>
where
    S: CommerceStore + 'static,
    G: PaymentGateway + 'static,
{
    let intent = reconciler.retry_intent(auth.user_id, order_id).await?;
    Ok((StatusCode::OK, Json(intent)))
}
