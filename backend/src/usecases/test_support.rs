//! In-memory storage used by the use-case tests. A transaction works on a copy of the
//! state and only publishes it when the closure returns `Ok`, so rollbacks behave like the
//! database. Transactions are serialized by one mutex.

use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crates::domain::{
    entities::{
        cart_line_items::{CartLineItemEntity, InsertCartLineItemEntity},
        carts::{CartEntity, InsertCartEntity},
        order_line_items::{InsertOrderLineItemEntity, OrderLineItemEntity},
        orders::{InsertOrderEntity, OrderEntity},
        products::ProductEntity,
    },
    errors::{CommerceError, CommerceResult},
    repositories::{
        catalog::CatalogRepository,
        commerce_store::{CommerceStore, CommerceTx},
        orders::OrderQueryRepository,
    },
    value_objects::enums::{
        cart_statuses::{CartLineItemStatus, CartStatus},
        order_statuses::OrderStatus,
    },
};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct State {
    pub carts: Vec<CartEntity>,
    pub cart_items: Vec<CartLineItemEntity>,
    pub orders: Vec<OrderEntity>,
    pub order_items: Vec<OrderLineItemEntity>,
    pub products: Vec<ProductEntity>,
}

type RaceHook = Box<dyn FnMut(&mut State) + Send>;

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
    race_before_cart_update: Mutex<Option<RaceHook>>,
}

pub fn sample_product(price_minor: i64) -> ProductEntity {
    let now = Utc::now();
    ProductEntity {
        id: Uuid::new_v4(),
        name: format!("Product {price_minor}"),
        price_minor,
        available: true,
        created_at: now,
        updated_at: now,
    }
}

impl InMemoryStore {
    pub fn snapshot(&self) -> State {
        self.state.lock().unwrap().clone()
    }

    pub fn add_product(&self, product: ProductEntity) {
        self.state.lock().unwrap().products.push(product);
    }

    /// Creates an active cart holding `(product_id, quantity, unit_price_minor)` lines.
    pub fn seed_cart(&self, user_id: Uuid, lines: &[(Uuid, i32, i64)]) -> Uuid {
        let mut state = self.state.lock().unwrap();
        let now = Utc::now();
        let cart_id = Uuid::new_v4();
        state.carts.push(CartEntity {
            id: cart_id,
            user_id,
            status: CartStatus::Active.to_string(),
            created_at: now,
            updated_at: now,
        });
        for (product_id, quantity, unit_price_minor) in lines {
            state.cart_items.push(CartLineItemEntity {
                id: Uuid::new_v4(),
                cart_id,
                product_id: *product_id,
                quantity: *quantity,
                unit_price_minor: *unit_price_minor,
                status: CartLineItemStatus::Active.to_string(),
                created_at: now,
                updated_at: now,
            });
        }
        cart_id
    }

    /// Runs `hook` against the transaction's view right before the next cart status update,
    /// as if another transaction had committed in between.
    pub fn race_before_cart_update(&self, hook: impl FnMut(&mut State) + Send + 'static) {
        *self.race_before_cart_update.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn carts_for(&self, user_id: Uuid) -> Vec<CartEntity> {
        self.snapshot()
            .carts
            .into_iter()
            .filter(|cart| cart.user_id == user_id)
            .collect()
    }

    pub fn cart(&self, cart_id: Uuid) -> Option<CartEntity> {
        self.snapshot().carts.into_iter().find(|cart| cart.id == cart_id)
    }

    pub fn items_of_cart(&self, cart_id: Uuid) -> Vec<CartLineItemEntity> {
        self.snapshot()
            .cart_items
            .into_iter()
            .filter(|item| item.cart_id == cart_id)
            .collect()
    }

    pub fn active_items_for(&self, user_id: Uuid) -> Vec<CartLineItemEntity> {
        let state = self.snapshot();
        let Some(cart) = state
            .carts
            .iter()
            .find(|cart| cart.user_id == user_id && cart.status == CartStatus::Active.as_str())
        else {
            return Vec::new();
        };
        state
            .cart_items
            .iter()
            .filter(|item| item.cart_id == cart.id && item.status == "active")
            .cloned()
            .collect()
    }

    pub fn orders(&self) -> Vec<OrderEntity> {
        self.snapshot().orders
    }

    pub fn order(&self, order_id: Uuid) -> Option<OrderEntity> {
        self.snapshot().orders.into_iter().find(|o| o.id == order_id)
    }

    pub fn order_items(&self, order_id: Uuid) -> Vec<OrderLineItemEntity> {
        self.snapshot()
            .order_items
            .into_iter()
            .filter(|item| item.order_id == order_id)
            .collect()
    }

    /// Backdates an order so age-based sweeps pick it up.
    pub fn age_order(&self, order_id: Uuid, created_at: DateTime<Utc>) {
        let mut state = self.state.lock().unwrap();
        if let Some(order) = state.orders.iter_mut().find(|o| o.id == order_id) {
            order.created_at = created_at;
        }
    }
}

impl CommerceStore for InMemoryStore {
    fn transaction<T, F>(&self, work: F) -> CommerceResult<T>
    where
        F: FnOnce(&mut dyn CommerceTx) -> CommerceResult<T>,
    {
        let mut committed = self.state.lock().unwrap();
        let mut tx = InMemoryTx {
            state: committed.clone(),
            race: &self.race_before_cart_update,
        };

        let result = work(&mut tx)?;
        *committed = tx.state;
        Ok(result)
    }
}

struct InMemoryTx<'a> {
    state: State,
    race: &'a Mutex<Option<RaceHook>>,
}

impl InMemoryTx<'_> {
    fn now() -> DateTime<Utc> {
        Utc::now()
    }
}

impl CommerceTx for InMemoryTx<'_> {
    fn find_active_cart(&mut self, user_id: Uuid) -> CommerceResult<Option<CartEntity>> {
        Ok(self
            .state
            .carts
            .iter()
            .find(|cart| cart.user_id == user_id && cart.status == CartStatus::Active.as_str())
            .cloned())
    }

    fn insert_cart(&mut self, cart: InsertCartEntity) -> CommerceResult<CartEntity> {
        if cart.status == CartStatus::Active.as_str()
            && self.find_active_cart(cart.user_id)?.is_some()
        {
            return Err(CommerceError::Conflict("unique row"));
        }
        let now = Self::now();
        let row = CartEntity {
            id: cart.id,
            user_id: cart.user_id,
            status: cart.status,
            created_at: now,
            updated_at: now,
        };
        self.state.carts.push(row.clone());
        Ok(row)
    }

    fn update_cart_status(
        &mut self,
        cart_id: Uuid,
        from: CartStatus,
        to: CartStatus,
    ) -> CommerceResult<usize> {
        if let Some(mut hook) = self.race.lock().unwrap().take() {
            hook(&mut self.state);
        }

        let mut affected = 0;
        for cart in self
            .state
            .carts
            .iter_mut()
            .filter(|cart| cart.id == cart_id && cart.status == from.as_str())
        {
            cart.status = to.to_string();
            cart.updated_at = Self::now();
            affected += 1;
        }
        Ok(affected)
    }

    fn find_cart_line_items(
        &mut self,
        cart_id: Uuid,
        status: CartLineItemStatus,
    ) -> CommerceResult<Vec<CartLineItemEntity>> {
        Ok(self
            .state
            .cart_items
            .iter()
            .filter(|item| item.cart_id == cart_id && item.status == status.as_str())
            .cloned()
            .collect())
    }

    fn find_cart_line_item(
        &mut self,
        cart_id: Uuid,
        product_id: Uuid,
        status: CartLineItemStatus,
    ) -> CommerceResult<Option<CartLineItemEntity>> {
        Ok(self
            .state
            .cart_items
            .iter()
            .find(|item| {
                item.cart_id == cart_id
                    && item.product_id == product_id
                    && item.status == status.as_str()
            })
            .cloned())
    }

    fn insert_cart_line_item(
        &mut self,
        item: InsertCartLineItemEntity,
    ) -> CommerceResult<CartLineItemEntity> {
        if item.status == CartLineItemStatus::Active.as_str()
            && self
                .find_cart_line_item(item.cart_id, item.product_id, CartLineItemStatus::Active)?
                .is_some()
        {
            return Err(CommerceError::Conflict("unique row"));
        }
        let now = Self::now();
        let row = CartLineItemEntity {
            id: item.id,
            cart_id: item.cart_id,
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price_minor: item.unit_price_minor,
            status: item.status,
            created_at: now,
            updated_at: now,
        };
        self.state.cart_items.push(row.clone());
        Ok(row)
    }

    fn update_cart_line_item_quantity(
        &mut self,
        item_id: Uuid,
        status: CartLineItemStatus,
        quantity: i32,
    ) -> CommerceResult<usize> {
        let mut affected = 0;
        for item in self
            .state
            .cart_items
            .iter_mut()
            .filter(|item| item.id == item_id && item.status == status.as_str())
        {
            item.quantity = quantity;
            item.updated_at = Self::now();
            affected += 1;
        }
        Ok(affected)
    }

    fn update_cart_line_item_status(
        &mut self,
        item_id: Uuid,
        from: CartLineItemStatus,
        to: CartLineItemStatus,
    ) -> CommerceResult<usize> {
        let mut affected = 0;
        for item in self
            .state
            .cart_items
            .iter_mut()
            .filter(|item| item.id == item_id && item.status == from.as_str())
        {
            item.status = to.to_string();
            item.updated_at = Self::now();
            affected += 1;
        }
        Ok(affected)
    }

    fn update_cart_line_items_status(
        &mut self,
        cart_id: Uuid,
        from: CartLineItemStatus,
        to: CartLineItemStatus,
    ) -> CommerceResult<usize> {
        let mut affected = 0;
        for item in self
            .state
            .cart_items
            .iter_mut()
            .filter(|item| item.cart_id == cart_id && item.status == from.as_str())
        {
            item.status = to.to_string();
            item.updated_at = Self::now();
            affected += 1;
        }
        Ok(affected)
    }

    fn move_cart_line_item(
        &mut self,
        item_id: Uuid,
        to_cart_id: Uuid,
        from: CartLineItemStatus,
        to: CartLineItemStatus,
    ) -> CommerceResult<usize> {
        let mut affected = 0;
        for item in self
            .state
            .cart_items
            .iter_mut()
            .filter(|item| item.id == item_id && item.status == from.as_str())
        {
            item.cart_id = to_cart_id;
            item.status = to.to_string();
            item.updated_at = Self::now();
            affected += 1;
        }
        Ok(affected)
    }

    fn insert_order(&mut self, order: InsertOrderEntity) -> CommerceResult<OrderEntity> {
        let now = Self::now();
        let row = OrderEntity {
            id: order.id,
            user_id: order.user_id,
            cart_id: order.cart_id,
            total_price_minor: order.total_price_minor,
            currency: order.currency,
            payment_method: order.payment_method,
            shipping_method: order.shipping_method,
            recipient_name: order.recipient_name,
            phone: order.phone,
            address_line: order.address_line,
            city: order.city,
            postal_code: order.postal_code,
            country: order.country,
            status: order.status,
            provider_ref: None,
            created_at: now,
            updated_at: now,
            last_reconciled_at: None,
        };
        self.state.orders.push(row.clone());
        Ok(row)
    }

    fn insert_order_line_items(
        &mut self,
        items: Vec<InsertOrderLineItemEntity>,
    ) -> CommerceResult<Vec<OrderLineItemEntity>> {
        let now = Self::now();
        let rows: Vec<OrderLineItemEntity> = items
            .into_iter()
            .map(|item| OrderLineItemEntity {
                id: item.id,
                order_id: item.order_id,
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price_minor: item.unit_price_minor,
                line_total_minor: item.line_total_minor,
                created_at: now,
            })
            .collect();
        self.state.order_items.extend(rows.iter().cloned());
        Ok(rows)
    }

    fn find_order(&mut self, order_id: Uuid) -> CommerceResult<Option<OrderEntity>> {
        Ok(self.state.orders.iter().find(|o| o.id == order_id).cloned())
    }

    fn find_order_by_provider_ref(
        &mut self,
        provider_ref: &str,
    ) -> CommerceResult<Option<OrderEntity>> {
        Ok(self
            .state
            .orders
            .iter()
            .find(|o| o.provider_ref.as_deref() == Some(provider_ref))
            .cloned())
    }

    fn update_order_status(
        &mut self,
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> CommerceResult<usize> {
        let mut affected = 0;
        for order in self
            .state
            .orders
            .iter_mut()
            .filter(|o| o.id == order_id && o.status == from.as_str())
        {
            order.status = to.to_string();
            order.updated_at = Self::now();
            affected += 1;
        }
        Ok(affected)
    }

    fn set_order_provider_ref(
        &mut self,
        order_id: Uuid,
        provider_ref: &str,
    ) -> CommerceResult<usize> {
        if self
            .state
            .orders
            .iter()
            .any(|o| o.provider_ref.as_deref() == Some(provider_ref))
        {
            return Err(CommerceError::Conflict("unique row"));
        }

        let mut affected = 0;
        for order in self
            .state
            .orders
            .iter_mut()
            .filter(|o| o.id == order_id && o.provider_ref.is_none())
        {
            order.provider_ref = Some(provider_ref.to_string());
            order.updated_at = Self::now();
            affected += 1;
        }
        Ok(affected)
    }
}

#[async_trait]
impl CatalogRepository for InMemoryStore {
    async fn get_product(&self, product_id: Uuid) -> Result<Option<ProductEntity>> {
        Ok(self
            .snapshot()
            .products
            .into_iter()
            .find(|product| product.id == product_id))
    }
}

#[async_trait]
impl OrderQueryRepository for InMemoryStore {
    async fn find_order(&self, order_id: Uuid) -> Result<Option<OrderEntity>> {
        Ok(self.order(order_id))
    }

    async fn find_line_items(&self, order_id: Uuid) -> Result<Vec<OrderLineItemEntity>> {
        Ok(self.order_items(order_id))
    }

    async fn list_orders_for_user(&self, user_id: Uuid) -> Result<Vec<OrderEntity>> {
        let mut orders: Vec<OrderEntity> = self
            .orders()
            .into_iter()
            .filter(|o| o.user_id == user_id)
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn list_line_items_for_orders(
        &self,
        order_ids: Vec<Uuid>,
    ) -> Result<Vec<OrderLineItemEntity>> {
        Ok(self
            .snapshot()
            .order_items
            .into_iter()
            .filter(|item| order_ids.contains(&item.order_id))
            .collect())
    }

    async fn list_stale_pending_orders(
        &self,
        payment_method: String,
        created_before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<OrderEntity>> {
        let mut orders: Vec<OrderEntity> = self
            .orders()
            .into_iter()
            .filter(|o| {
                o.status == OrderStatus::Pending.as_str()
                    && o.payment_method == payment_method
                    && o.created_at < created_before
            })
            .collect();
        // None sorts before Some, like NULLS FIRST.
        orders.sort_by_key(|o| (o.last_reconciled_at, o.created_at));
        orders.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(orders)
    }

    async fn mark_reconciled(&self, order_ids: Vec<Uuid>, at: DateTime<Utc>) -> Result<usize> {
        let mut state = self.state.lock().unwrap();
        let mut updated = 0;
        for order in state.orders.iter_mut().filter(|o| order_ids.contains(&o.id)) {
            order.last_reconciled_at = Some(at);
            updated += 1;
        }
        Ok(updated)
    }
}
