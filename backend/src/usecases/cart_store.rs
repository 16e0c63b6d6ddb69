//! Cart and cart line-item mutations. Every function runs inside a transaction opened by
//! the caller and never commits on its own.

use crates::domain::{
    entities::{
        cart_line_items::{CartLineItemEntity, InsertCartLineItemEntity},
        carts::{CartEntity, InsertCartEntity},
        products::ProductEntity,
    },
    errors::{CommerceError, CommerceResult},
    repositories::commerce_store::CommerceTx,
    value_objects::{
        enums::cart_statuses::{CartLineItemStatus, CartStatus},
        money,
    },
};
use tracing::{debug, info};
use uuid::Uuid;

pub fn get_active_cart(tx: &mut dyn CommerceTx, user_id: Uuid) -> CommerceResult<Option<CartEntity>> {
    tx.find_active_cart(user_id)
}

/// An empty list is a normal result, also when the user has no cart at all.
pub fn get_active_line_items(
    tx: &mut dyn CommerceTx,
    user_id: Uuid,
) -> CommerceResult<Vec<CartLineItemEntity>> {
    match tx.find_active_cart(user_id)? {
        Some(cart) => tx.find_cart_line_items(cart.id, CartLineItemStatus::Active),
        None => Ok(Vec::new()),
    }
}

pub fn ensure_active_cart(tx: &mut dyn CommerceTx, user_id: Uuid) -> CommerceResult<CartEntity> {
    if let Some(cart) = tx.find_active_cart(user_id)? {
        return Ok(cart);
    }

    let cart = tx.insert_cart(InsertCartEntity::active_for(user_id))?;
    info!(%user_id, cart_id = %cart.id, "cart_store: active cart created");
    Ok(cart)
}

/// Moves the cart and exactly `expected_items` line items from `from` to `to`.
///
/// Both updates are conditional on the current status. Any difference between the rows
/// touched and the rows expected means someone else changed the cart, and the caller
/// must roll back.
pub fn mark_cart_and_items(
    tx: &mut dyn CommerceTx,
    cart_id: Uuid,
    expected_items: usize,
    from: CartStatus,
    to: CartStatus,
) -> CommerceResult<usize> {
    let to = from.transition(to)?;
    let item_from = CartLineItemStatus::from(from);
    let item_to = item_from.transition(CartLineItemStatus::from(to))?;

    let carts = tx.update_cart_status(cart_id, from, to)?;
    if carts != 1 {
        debug!(%cart_id, carts, "cart_store: cart status guard failed");
        return Err(CommerceError::Conflict("cart"));
    }

    let items = tx.update_cart_line_items_status(cart_id, item_from, item_to)?;
    if items != expected_items {
        debug!(
            %cart_id,
            items,
            expected_items,
            "cart_store: line item count changed underneath"
        );
        return Err(CommerceError::Conflict("cart line items"));
    }

    Ok(carts + items)
}

fn ensure_quantity(quantity: i32) -> CommerceResult<()> {
    if quantity < 1 {
        return Err(CommerceError::InvalidInput(format!(
            "quantity must be at least 1, got {quantity}"
        )));
    }
    Ok(())
}

/// Adds `quantity` of `product`. An existing line keeps the price captured when it was
/// first added; a new line captures the current catalog price.
pub fn add_item(
    tx: &mut dyn CommerceTx,
    user_id: Uuid,
    product: &ProductEntity,
    quantity: i32,
) -> CommerceResult<CartLineItemEntity> {
    ensure_quantity(quantity)?;
    if !product.available {
        return Err(CommerceError::InvalidInput(format!(
            "product {} is not available",
            product.id
        )));
    }

    let cart = ensure_active_cart(tx, user_id)?;

    match tx.find_cart_line_item(cart.id, product.id, CartLineItemStatus::Active)? {
        Some(existing) => {
            let merged = existing
                .quantity
                .checked_add(quantity)
                .ok_or_else(|| CommerceError::InvalidInput("quantity too large".to_string()))?;
            money::line_total(merged, existing.unit_price_minor)?;

            let affected = tx.update_cart_line_item_quantity(
                existing.id,
                CartLineItemStatus::Active,
                merged,
            )?;
            if affected != 1 {
                return Err(CommerceError::Conflict("cart line item"));
            }

            Ok(CartLineItemEntity {
                quantity: merged,
                ..existing
            })
        }
        None => {
            money::line_total(quantity, product.price_minor)?;
            tx.insert_cart_line_item(InsertCartLineItemEntity {
                id: Uuid::new_v4(),
                cart_id: cart.id,
                product_id: product.id,
                quantity,
                unit_price_minor: product.price_minor,
                status: CartLineItemStatus::Active.to_string(),
            })
        }
    }
}

fn find_active_item(
    tx: &mut dyn CommerceTx,
    user_id: Uuid,
    product_id: Uuid,
) -> CommerceResult<CartLineItemEntity> {
    let cart = tx
        .find_active_cart(user_id)?
        .ok_or(CommerceError::NotFound("cart"))?;

    tx.find_cart_line_item(cart.id, product_id, CartLineItemStatus::Active)?
        .ok_or(CommerceError::NotFound("cart item"))
}

pub fn update_quantity(
    tx: &mut dyn CommerceTx,
    user_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> CommerceResult<CartLineItemEntity> {
    ensure_quantity(quantity)?;
    let item = find_active_item(tx, user_id, product_id)?;
    money::line_total(quantity, item.unit_price_minor)?;

    let affected =
        tx.update_cart_line_item_quantity(item.id, CartLineItemStatus::Active, quantity)?;
    if affected != 1 {
        return Err(CommerceError::Conflict("cart line item"));
    }

    Ok(CartLineItemEntity { quantity, ..item })
}

pub fn remove_item(tx: &mut dyn CommerceTx, user_id: Uuid, product_id: Uuid) -> CommerceResult<()> {
    let item = find_active_item(tx, user_id, product_id)?;
    let from = item.current_status()?;
    let to = from.transition(CartLineItemStatus::Removed)?;

    if tx.update_cart_line_item_status(item.id, from, to)? != 1 {
        return Err(CommerceError::Conflict("cart line item"));
    }
    Ok(())
}

/// Retires the active cart and its items. Returns the number of items removed; a user
/// without a cart has nothing to clear.
pub fn clear_cart(tx: &mut dyn CommerceTx, user_id: Uuid) -> CommerceResult<usize> {
    let Some(cart) = tx.find_active_cart(user_id)? else {
        return Ok(0);
    };

    let items = tx.find_cart_line_items(cart.id, CartLineItemStatus::Active)?;
    mark_cart_and_items(tx, cart.id, items.len(), CartStatus::Active, CartStatus::Removed)?;

    Ok(items.len())
}

/// Brings the ORDERED items of `source_cart_id` back into the user's active cart. The
/// source cart itself stays ORDERED. When the active cart already holds the product, the
/// quantities are merged and the restored line is retired.
pub fn restore_items(
    tx: &mut dyn CommerceTx,
    user_id: Uuid,
    source_cart_id: Uuid,
) -> CommerceResult<usize> {
    let items = tx.find_cart_line_items(source_cart_id, CartLineItemStatus::Ordered)?;
    if items.is_empty() {
        return Ok(0);
    }

    let cart = ensure_active_cart(tx, user_id)?;

    for item in &items {
        let from = item.current_status()?;

        match tx.find_cart_line_item(cart.id, item.product_id, CartLineItemStatus::Active)? {
            Some(existing) => {
                let merged = existing.quantity.checked_add(item.quantity).ok_or_else(|| {
                    CommerceError::Internal(anyhow::anyhow!(
                        "restored quantity overflows for cart line item {}",
                        existing.id
                    ))
                })?;
                if tx.update_cart_line_item_quantity(
                    existing.id,
                    CartLineItemStatus::Active,
                    merged,
                )? != 1
                {
                    return Err(CommerceError::Conflict("cart line item"));
                }

                let to = from.transition(CartLineItemStatus::Removed)?;
                if tx.update_cart_line_item_status(item.id, from, to)? != 1 {
                    return Err(CommerceError::Conflict("cart line item"));
                }
            }
            None => {
                let to = from.transition(CartLineItemStatus::Active)?;
                if tx.move_cart_line_item(item.id, cart.id, from, to)? != 1 {
                    return Err(CommerceError::Conflict("cart line item"));
                }
            }
        }
    }

    info!(
        %user_id,
        %source_cart_id,
        cart_id = %cart.id,
        restored = items.len(),
        "cart_store: ordered items restored to active cart"
    );
    Ok(items.len())
}
