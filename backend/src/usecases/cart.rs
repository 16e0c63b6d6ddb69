use std::sync::Arc;

use crates::domain::{
    errors::{CommerceError, CommerceResult},
    repositories::{
        catalog::CatalogRepository,
        commerce_store::{CommerceStore, CommerceTx},
    },
    value_objects::{
        carts::{AddCartItemModel, CartDto, UpdateCartItemModel},
        enums::cart_statuses::CartLineItemStatus,
    },
};
use tracing::{error, info};
use uuid::Uuid;

use super::cart_store;

pub struct CartUseCase<S, C>
where
    S: CommerceStore + 'static,
    C: CatalogRepository + Send + Sync + 'static,
{
    store: Arc<S>,
    catalog: Arc<C>,
}

impl<S, C> CartUseCase<S, C>
where
    S: CommerceStore + 'static,
    C: CatalogRepository + Send + Sync + 'static,
{
    pub fn new(store: Arc<S>, catalog: Arc<C>) -> Self {
        Self { store, catalog }
    }

    pub fn view_cart(&self, user_id: Uuid) -> CommerceResult<CartDto> {
        self.store.transaction(|tx| load_view(tx, user_id))
    }

    pub async fn add_item(&self, user_id: Uuid, model: AddCartItemModel) -> CommerceResult<CartDto> {
        let product = self
            .catalog
            .get_product(model.product_id)
            .await
            .map_err(|err| {
                error!(
                    product_id = %model.product_id,
                    db_error = ?err,
                    "cart: catalog lookup failed"
                );
                CommerceError::Internal(err)
            })?
            .ok_or(CommerceError::NotFound("product"))?;

        let view = self.store.transaction(|tx| {
            cart_store::add_item(tx, user_id, &product, model.quantity)?;
            load_view(tx, user_id)
        })?;

        info!(
            %user_id,
            product_id = %product.id,
            quantity = model.quantity,
            "cart: item added"
        );
        Ok(view)
    }

    pub fn update_quantity(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        model: UpdateCartItemModel,
    ) -> CommerceResult<CartDto> {
        self.store.transaction(|tx| {
            cart_store::update_quantity(tx, user_id, product_id, model.quantity)?;
            load_view(tx, user_id)
        })
    }

    pub fn remove_item(&self, user_id: Uuid, product_id: Uuid) -> CommerceResult<CartDto> {
        self.store.transaction(|tx| {
            cart_store::remove_item(tx, user_id, product_id)?;
            load_view(tx, user_id)
        })
    }

    pub fn clear_cart(&self, user_id: Uuid) -> CommerceResult<CartDto> {
        let cleared = self
            .store
            .transaction(|tx| cart_store::clear_cart(tx, user_id))?;

        info!(%user_id, cleared, "cart: cleared");
        Ok(CartDto::empty())
    }
}

fn load_view(tx: &mut dyn CommerceTx, user_id: Uuid) -> CommerceResult<CartDto> {
    match cart_store::get_active_cart(tx, user_id)? {
        Some(cart) => {
            let items = tx.find_cart_line_items(cart.id, CartLineItemStatus::Active)?;
            Ok(CartDto::from_parts(&cart, &items))
        }
        None => Ok(CartDto::empty()),
    }
}
