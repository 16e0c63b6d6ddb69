use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{OptionalExtension, RunQueryDsl, prelude::*};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{order_line_items, orders},
    },
};
use domain::{
    entities::{order_line_items::OrderLineItemEntity, orders::OrderEntity},
    repositories::orders::OrderQueryRepository,
    value_objects::enums::order_statuses::OrderStatus,
};

pub struct OrderQueryPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl OrderQueryPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl OrderQueryRepository for OrderQueryPostgres {
    async fn find_order(&self, order_id: Uuid) -> Result<Option<OrderEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let order = orders::table
            .filter(orders::id.eq(order_id))
            .select(OrderEntity::as_select())
            .first::<OrderEntity>(&mut conn)
            .optional()?;

        Ok(order)
    }

    async fn find_line_items(&self, order_id: Uuid) -> Result<Vec<OrderLineItemEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let items = order_line_items::table
            .filter(order_line_items::order_id.eq(order_id))
            .order(order_line_items::created_at.asc())
            .select(OrderLineItemEntity::as_select())
            .load::<OrderLineItemEntity>(&mut conn)?;

        Ok(items)
    }

    async fn list_orders_for_user(&self, user_id: Uuid) -> Result<Vec<OrderEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = orders::table
            .filter(orders::user_id.eq(user_id))
            .order(orders::created_at.desc())
            .select(OrderEntity::as_select())
            .load::<OrderEntity>(&mut conn)?;

        Ok(results)
    }

    async fn list_line_items_for_orders(
        &self,
        order_ids: Vec<Uuid>,
    ) -> Result<Vec<OrderLineItemEntity>> {
        if order_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = Arc::clone(&self.db_pool).get()?;

        let items = order_line_items::table
            .filter(order_line_items::order_id.eq_any(order_ids))
            .order(order_line_items::created_at.asc())
            .select(OrderLineItemEntity::as_select())
            .load::<OrderLineItemEntity>(&mut conn)?;

        Ok(items)
    }

    async fn list_stale_pending_orders(
        &self,
        payment_method: String,
        created_before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<OrderEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = orders::table
            .filter(orders::status.eq(OrderStatus::Pending.as_str()))
            .filter(orders::payment_method.eq(payment_method))
            .filter(orders::created_at.lt(created_before))
            .order((
                orders::last_reconciled_at.asc().nulls_first(),
                orders::created_at.asc(),
            ))
            .limit(limit)
            .select(OrderEntity::as_select())
            .load::<OrderEntity>(&mut conn)?;

        Ok(results)
    }

    async fn mark_reconciled(&self, order_ids: Vec<Uuid>, at: DateTime<Utc>) -> Result<usize> {
        if order_ids.is_empty() {
            return Ok(0);
        }

        let mut conn = Arc::clone(&self.db_pool).get()?;

        let updated = diesel::update(orders::table)
            .filter(orders::id.eq_any(order_ids))
            .set(orders::last_reconciled_at.eq(Some(at)))
            .execute(&mut conn)?;

        Ok(updated)
    }
}
