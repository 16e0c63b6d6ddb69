use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::{order_line_items::OrderLineItemEntity, orders::OrderEntity};

#[automock]
#[async_trait]
pub trait OrderQueryRepository {
    async fn find_order(&self, order_id: Uuid) -> Result<Option<OrderEntity>>;

    async fn find_line_items(&self, order_id: Uuid) -> Result<Vec<OrderLineItemEntity>>;

    async fn list_orders_for_user(&self, user_id: Uuid) -> Result<Vec<OrderEntity>>;

    async fn list_line_items_for_orders(
        &self,
        order_ids: Vec<Uuid>,
    ) -> Result<Vec<OrderLineItemEntity>>;

    /// PENDING orders paid through `payment_method` that were created before `created_before`,
    /// never-swept orders first, then the least recently swept.
    async fn list_stale_pending_orders(
        &self,
        payment_method: String,
        created_before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<OrderEntity>>;

    /// Stamps visited orders so the next sweep starts with the ones it has not seen yet.
    async fn mark_reconciled(&self, order_ids: Vec<Uuid>, at: DateTime<Utc>) -> Result<usize>;
}
