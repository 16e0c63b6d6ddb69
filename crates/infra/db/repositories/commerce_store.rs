use chrono::Utc;
use diesel::{
    OptionalExtension, PgConnection, RunQueryDsl,
    prelude::*,
    result::{DatabaseErrorKind, Error as DieselError},
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{cart_line_items, carts, order_line_items, orders},
    },
};
use domain::{
    entities::{
        cart_line_items::{CartLineItemEntity, InsertCartLineItemEntity},
        carts::{CartEntity, InsertCartEntity},
        order_line_items::{InsertOrderLineItemEntity, OrderLineItemEntity},
        orders::{InsertOrderEntity, OrderEntity},
    },
    errors::{CommerceError, CommerceResult},
    repositories::commerce_store::{CommerceStore, CommerceTx},
    value_objects::enums::{
        cart_statuses::{CartLineItemStatus, CartStatus},
        order_statuses::OrderStatus,
    },
};

impl From<DieselError> for CommerceError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                CommerceError::Conflict("unique row")
            }
            DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, _) => {
                CommerceError::Conflict("transaction")
            }
            other => CommerceError::Internal(other.into()),
        }
    }
}

pub struct CommercePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl CommercePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

impl CommerceStore for CommercePostgres {
    fn transaction<T, F>(&self, work: F) -> CommerceResult<T>
    where
        F: FnOnce(&mut dyn CommerceTx) -> CommerceResult<T>,
    {
        let mut conn = Arc::clone(&self.db_pool)
            .get()
            .map_err(|err| CommerceError::Internal(err.into()))?;

        conn.transaction::<T, CommerceError, _>(|conn| {
            let mut tx = PgCommerceTx { conn: &mut **conn };
            work(&mut tx)
        })
    }
}

struct PgCommerceTx<'a> {
    conn: &'a mut PgConnection,
}

impl CommerceTx for PgCommerceTx<'_> {
    fn find_active_cart(&mut self, user_id: Uuid) -> CommerceResult<Option<CartEntity>> {
        let cart = carts::table
            .filter(carts::user_id.eq(user_id))
            .filter(carts::status.eq(CartStatus::Active.as_str()))
            .select(CartEntity::as_select())
            .for_update()
            .first::<CartEntity>(&mut *self.conn)
            .optional()?;

        Ok(cart)
    }

    fn insert_cart(&mut self, cart: InsertCartEntity) -> CommerceResult<CartEntity> {
        let cart = diesel::insert_into(carts::table)
            .values(&cart)
            .returning(CartEntity::as_returning())
            .get_result::<CartEntity>(&mut *self.conn)?;

        Ok(cart)
    }

    fn update_cart_status(
        &mut self,
        cart_id: Uuid,
        from: CartStatus,
        to: CartStatus,
    ) -> CommerceResult<usize> {
        let affected = diesel::update(
            carts::table
                .filter(carts::id.eq(cart_id))
                .filter(carts::status.eq(from.as_str())),
        )
        .set((
            carts::status.eq(to.as_str()),
            carts::updated_at.eq(Utc::now()),
        ))
        .execute(&mut *self.conn)?;

        Ok(affected)
    }

    fn find_cart_line_items(
        &mut self,
        cart_id: Uuid,
        status: CartLineItemStatus,
    ) -> CommerceResult<Vec<CartLineItemEntity>> {
        let items = cart_line_items::table
            .filter(cart_line_items::cart_id.eq(cart_id))
            .filter(cart_line_items::status.eq(status.as_str()))
            .order(cart_line_items::created_at.asc())
            .select(CartLineItemEntity::as_select())
            .load::<CartLineItemEntity>(&mut *self.conn)?;

        Ok(items)
    }

    fn find_cart_line_item(
        &mut self,
        cart_id: Uuid,
        product_id: Uuid,
        status: CartLineItemStatus,
    ) -> CommerceResult<Option<CartLineItemEntity>> {
        let item = cart_line_items::table
            .filter(cart_line_items::cart_id.eq(cart_id))
            .filter(cart_line_items::product_id.eq(product_id))
            .filter(cart_line_items::status.eq(status.as_str()))
            .select(CartLineItemEntity::as_select())
            .first::<CartLineItemEntity>(&mut *self.conn)
            .optional()?;

        Ok(item)
    }

    fn insert_cart_line_item(
        &mut self,
        item: InsertCartLineItemEntity,
    ) -> CommerceResult<CartLineItemEntity> {
        let item = diesel::insert_into(cart_line_items::table)
            .values(&item)
            .returning(CartLineItemEntity::as_returning())
            .get_result::<CartLineItemEntity>(&mut *self.conn)?;

        Ok(item)
    }

    fn update_cart_line_item_quantity(
        &mut self,
        item_id: Uuid,
        status: CartLineItemStatus,
        quantity: i32,
    ) -> CommerceResult<usize> {
        let affected = diesel::update(
            cart_line_items::table
                .filter(cart_line_items::id.eq(item_id))
                .filter(cart_line_items::status.eq(status.as_str())),
        )
        .set((
            cart_line_items::quantity.eq(quantity),
            cart_line_items::updated_at.eq(Utc::now()),
        ))
        .execute(&mut *self.conn)?;

        Ok(affected)
    }

    fn update_cart_line_item_status(
        &mut self,
        item_id: Uuid,
        from: CartLineItemStatus,
        to: CartLineItemStatus,
    ) -> CommerceResult<usize> {
        let affected = diesel::update(
            cart_line_items::table
                .filter(cart_line_items::id.eq(item_id))
                .filter(cart_line_items::status.eq(from.as_str())),
        )
        .set((
            cart_line_items::status.eq(to.as_str()),
            cart_line_items::updated_at.eq(Utc::now()),
        ))
        .execute(&mut *self.conn)?;

        Ok(affected)
    }

    fn update_cart_line_items_status(
        &mut self,
        cart_id: Uuid,
        from: CartLineItemStatus,
        to: CartLineItemStatus,
    ) -> CommerceResult<usize> {
        let affected = diesel::update(
            cart_line_items::table
                .filter(cart_line_items::cart_id.eq(cart_id))
                .filter(cart_line_items::status.eq(from.as_str())),
        )
        .set((
            cart_line_items::status.eq(to.as_str()),
            cart_line_items::updated_at.eq(Utc::now()),
        ))
        .execute(&mut *self.conn)?;

        Ok(affected)
    }

    fn move_cart_line_item(
        &mut self,
        item_id: Uuid,
        to_cart_id: Uuid,
        from: CartLineItemStatus,
        to: CartLineItemStatus,
    ) -> CommerceResult<usize> {
        let affected = diesel::update(
            cart_line_items::table
                .filter(cart_line_items::id.eq(item_id))
                .filter(cart_line_items::status.eq(from.as_str())),
        )
        .set((
            cart_line_items::cart_id.eq(to_cart_id),
            cart_line_items::status.eq(to.as_str()),
            cart_line_items::updated_at.eq(Utc::now()),
        ))
        .execute(&mut *self.conn)?;

        Ok(affected)
    }

    fn insert_order(&mut self, order: InsertOrderEntity) -> CommerceResult<OrderEntity> {
        let order = diesel::insert_into(orders::table)
            .values(&order)
            .returning(OrderEntity::as_returning())
            .get_result::<OrderEntity>(&mut *self.conn)?;

        Ok(order)
    }

    fn insert_order_line_items(
        &mut self,
        items: Vec<InsertOrderLineItemEntity>,
    ) -> CommerceResult<Vec<OrderLineItemEntity>> {
        let items = diesel::insert_into(order_line_items::table)
            .values(&items)
            .returning(OrderLineItemEntity::as_returning())
            .get_results::<OrderLineItemEntity>(&mut *self.conn)?;

        Ok(items)
    }

    fn find_order(&mut self, order_id: Uuid) -> CommerceResult<Option<OrderEntity>> {
        let order = orders::table
            .filter(orders::id.eq(order_id))
            .select(OrderEntity::as_select())
            .for_update()
            .first::<OrderEntity>(&mut *self.conn)
            .optional()?;

        Ok(order)
    }

    fn find_order_by_provider_ref(
        &mut self,
        provider_ref: &str,
    ) -> CommerceResult<Option<OrderEntity>> {
        let order = orders::table
            .filter(orders::provider_ref.eq(provider_ref))
            .select(OrderEntity::as_select())
            .for_update()
            .first::<OrderEntity>(&mut *self.conn)
            .optional()?;

        Ok(order)
    }

    fn update_order_status(
        &mut self,
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> CommerceResult<usize> {
        let affected = diesel::update(
            orders::table
                .filter(orders::id.eq(order_id))
                .filter(orders::status.eq(from.as_str())),
        )
        .set((
            orders::status.eq(to.as_str()),
            orders::updated_at.eq(Utc::now()),
        ))
        .execute(&mut *self.conn)?;

        Ok(affected)
    }

    fn set_order_provider_ref(
        &mut self,
        order_id: Uuid,
        provider_ref: &str,
    ) -> CommerceResult<usize> {
        let affected = diesel::update(
            orders::table
                .filter(orders::id.eq(order_id))
                .filter(orders::provider_ref.is_null()),
        )
        .set((
            orders::provider_ref.eq(Some(provider_ref)),
            orders::updated_at.eq(Utc::now()),
        ))
        .execute(&mut *self.conn)?;

        Ok(affected)
    }
}
