use std::{collections::HashMap, sync::Arc};

use crates::domain::{
    entities::order_line_items::OrderLineItemEntity,
    errors::{CommerceError, CommerceResult},
    repositories::{commerce_store::CommerceStore, orders::OrderQueryRepository},
    value_objects::orders::OrderDto,
};
use tracing::{error, info};
use uuid::Uuid;

use super::order_ledger;

pub struct OrderUseCase<S, Q>
where
    S: CommerceStore + 'static,
    Q: OrderQueryRepository + Send + Sync + 'static,
{
    store: Arc<S>,
    query: Arc<Q>,
}

impl<S, Q> OrderUseCase<S, Q>
where
    S: CommerceStore + 'static,
    Q: OrderQueryRepository + Send + Sync + 'static,
{
    pub fn new(store: Arc<S>, query: Arc<Q>) -> Self {
        Self { store, query }
    }

    pub async fn get_order(&self, user_id: Uuid, order_id: Uuid) -> CommerceResult<OrderDto> {
        let order = self
            .query
            .find_order(order_id)
            .await
            .map_err(|err| storage_error("find order", err))?
            .ok_or(CommerceError::NotFound("order"))?;

        if order.user_id != user_id {
            return Err(CommerceError::Forbidden);
        }

        let items = self
            .query
            .find_line_items(order.id)
            .await
            .map_err(|err| storage_error("find order line items", err))?;

        Ok(OrderDto::from_parts(order, &items))
    }

    /// Newest first.
    pub async fn list_orders(&self, user_id: Uuid) -> CommerceResult<Vec<OrderDto>> {
        let orders = self
            .query
            .list_orders_for_user(user_id)
            .await
            .map_err(|err| storage_error("list orders", err))?;

        let order_ids = orders.iter().map(|order| order.id).collect();
        let mut items_by_order: HashMap<Uuid, Vec<OrderLineItemEntity>> = HashMap::new();
        for item in self
            .query
            .list_line_items_for_orders(order_ids)
            .await
            .map_err(|err| storage_error("list order line items", err))?
        {
            items_by_order.entry(item.order_id).or_default().push(item);
        }

        Ok(orders
            .into_iter()
            .map(|order| {
                let items = items_by_order.remove(&order.id).unwrap_or_default();
                OrderDto::from_parts(order, &items)
            })
            .collect())
    }

    /// Owner-initiated cancel of a PENDING order. The cart is not handed back.
    pub async fn cancel_order(&self, user_id: Uuid, order_id: Uuid) -> CommerceResult<OrderDto> {
        let order = self
            .store
            .transaction(|tx| order_ledger::cancel_order(tx, order_id, user_id))?;

        info!(%order_id, %user_id, "orders: canceled by owner");

        let items = self
            .query
            .find_line_items(order.id)
            .await
            .map_err(|err| storage_error("find order line items", err))?;
        Ok(OrderDto::from_parts(order, &items))
    }
}

fn storage_error(operation: &'static str, err: anyhow::Error) -> CommerceError {
    error!(operation, db_error = ?err, "orders: storage failure");
    CommerceError::Internal(err)
}
