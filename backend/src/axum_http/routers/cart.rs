use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, patch, post},
};
use crates::{
    domain::{
        repositories::{catalog::CatalogRepository, commerce_store::CommerceStore},
        value_objects::carts::{AddCartItemModel, UpdateCartItemModel},
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{catalog::CatalogPostgres, commerce_store::CommercePostgres},
    },
};
use uuid::Uuid;

use crate::{auth::AuthUser, axum_http::error_responses::AppError, usecases::cart::CartUseCase};

pub fn routes(db_pool: Arc<PgPoolSquad>, store: Arc<CommercePostgres>) -> Router {
    let catalog_repository = CatalogPostgres::new(Arc::clone(&db_pool));
    let cart_usecase = CartUseCase::new(store, Arc::new(catalog_repository));

    Router::new()
        .route("/", get(view_cart))
        .route("/", delete(clear_cart))
        .route("/items", post(add_item))
        .route("/items/:product_id", patch(update_quantity))
        .route("/items/:product_id", delete(remove_item))
        .with_state(Arc::new(cart_usecase))
}

pub async fn view_cart<S, C>(
    State(cart_usecase): State<Arc<CartUseCase<S, C>>>,
    auth: AuthUser,
) -> Result<impl IntoResponse, AppError>
where
    S: CommerceStore + 'static,
    C: CatalogRepository + Send + Sync + 'static,
{
    let cart = cart_usecase.view_cart(auth.user_id)?;
    Ok((StatusCode::OK, Json(cart)))
}

pub async fn add_item<S, C>(
    State(cart_usecase): State<Arc<CartUseCase<S, C>>>,
    auth: AuthUser,
    Json(add_cart_item_model): Json<AddCartItemModel>,
) -> Result<impl IntoResponse, AppError>
where
    S: CommerceStore + 'static,
    C: CatalogRepository + Send + Sync + 'static,
{
    let cart = cart_usecase
        .add_item(auth.user_id, add_cart_item_model)
        .await?;
    Ok((StatusCode::CREATED, Json(cart)))
}

pub async fn update_quantity<S, C>(
    State(cart_usecase): State<Arc<CartUseCase<S, C>>>,
    auth: AuthUser,
    Path(product_id): Path<Uuid>,
    Json(update_cart_item_model): Json<UpdateCartItemModel>,
) -> Result<impl IntoResponse, AppError>
where
    S: CommerceStore + 'static,
    C: CatalogRepository + Send + Sync + 'static,
{
    let cart = cart_usecase.update_quantity(auth.user_id, product_id, update_cart_item_model)?;
    Ok((StatusCode::OK, Json(cart)))
}

pub async fn remove_item<S, C>(
    State(cart_usecase): State<Arc<CartUseCase<S, C>>>,
    auth: AuthUser,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError>
where
    S: CommerceStore + 'static,
    C: CatalogRepository + Send + Sync + 'static,
{
    let cart = cart_usecase.remove_item(auth.user_id, product_id)?;
    Ok((StatusCode::OK, Json(cart)))
}

pub async fn clear_cart<S, C>(
    State(cart_usecase): State<Arc<CartUseCase<S, C>>>,
    auth: AuthUser,
) -> Result<impl IntoResponse, AppError>
where
    S: CommerceStore + 'static,
    C: CatalogRepository + Send + Sync + 'static,
{
    let cart = cart_usecase.clear_cart(auth.user_id)?;
    Ok((StatusCode::OK, Json(cart)))
}
