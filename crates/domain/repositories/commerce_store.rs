use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::{
        cart_line_items::{CartLineItemEntity, InsertCartLineItemEntity},
        carts::{CartEntity, InsertCartEntity},
        order_line_items::{InsertOrderLineItemEntity, OrderLineItemEntity},
        orders::{InsertOrderEntity, OrderEntity},
    },
    errors::CommerceResult,
    value_objects::enums::{
        cart_statuses::{CartLineItemStatus, CartStatus},
        order_statuses::OrderStatus,
    },
};

/// Opens storage transactions. Everything the closure does through the handle commits
/// together or not at all; an `Err` from the closure rolls the whole unit back.
pub trait CommerceStore: Send + Sync {
    fn transaction<T, F>(&self, work: F) -> CommerceResult<T>
    where
        F: FnOnce(&mut dyn CommerceTx) -> CommerceResult<T>;
}

/// Row-level operations available inside one transaction. Every status update is
/// conditional on the current status and returns the number of rows it touched, so the
/// caller can detect a lost race.
#[automock]
pub trait CommerceTx {
    /// Locks the cart row, so cart edits and checkout on the same cart serialize.
    fn find_active_cart(&mut self, user_id: Uuid) -> CommerceResult<Option<CartEntity>>;

    fn insert_cart(&mut self, cart: InsertCartEntity) -> CommerceResult<CartEntity>;

    fn update_cart_status(
        &mut self,
        cart_id: Uuid,
        from: CartStatus,
        to: CartStatus,
    ) -> CommerceResult<usize>;

    fn find_cart_line_items(
        &mut self,
        cart_id: Uuid,
        status: CartLineItemStatus,
    ) -> CommerceResult<Vec<CartLineItemEntity>>;

    fn find_cart_line_item(
        &mut self,
        cart_id: Uuid,
        product_id: Uuid,
        status: CartLineItemStatus,
    ) -> CommerceResult<Option<CartLineItemEntity>>;

    fn insert_cart_line_item(
        &mut self,
        item: InsertCartLineItemEntity,
    ) -> CommerceResult<CartLineItemEntity>;

    fn update_cart_line_item_quantity(
        &mut self,
        item_id: Uuid,
        status: CartLineItemStatus,
        quantity: i32,
    ) -> CommerceResult<usize>;

    fn update_cart_line_item_status(
        &mut self,
        item_id: Uuid,
        from: CartLineItemStatus,
        to: CartLineItemStatus,
    ) -> CommerceResult<usize>;

    fn update_cart_line_items_status(
        &mut self,
        cart_id: Uuid,
        from: CartLineItemStatus,
        to: CartLineItemStatus,
    ) -> CommerceResult<usize>;

    fn move_cart_line_item(
        &mut self,
        item_id: Uuid,
        to_cart_id: Uuid,
        from: CartLineItemStatus,
        to: CartLineItemStatus,
    ) -> CommerceResult<usize>;

    fn insert_order(&mut self, order: InsertOrderEntity) -> CommerceResult<OrderEntity>;

    fn insert_order_line_items(
        &mut self,
        items: Vec<InsertOrderLineItemEntity>,
    ) -> CommerceResult<Vec<OrderLineItemEntity>>;

    /// Locks the order row for the rest of the transaction.
    fn find_order(&mut self, order_id: Uuid) -> CommerceResult<Option<OrderEntity>>;

    /// Locks the order row for the rest of the transaction.
    fn find_order_by_provider_ref(
        &mut self,
        provider_ref: &str,
    ) -> CommerceResult<Option<OrderEntity>>;

    fn update_order_status(
        &mut self,
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> CommerceResult<usize>;

    /// Sets the reference only while it is still empty.
    fn set_order_provider_ref(&mut self, order_id: Uuid, provider_ref: &str)
    -> CommerceResult<usize>;
}
