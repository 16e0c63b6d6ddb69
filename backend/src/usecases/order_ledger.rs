//! Orders and their priced line items. Like the cart store, these functions only run
//! inside a caller-owned transaction.

use crates::domain::{
    entities::{
        order_line_items::{InsertOrderLineItemEntity, OrderLineItemEntity},
        orders::{InsertOrderEntity, OrderEntity},
    },
    errors::{CommerceError, CommerceResult},
    repositories::commerce_store::CommerceTx,
    value_objects::{
        checkout::{LineItemSnapshot, ShippingInfo},
        enums::{order_statuses::OrderStatus, payment_methods::PaymentMethod},
        money,
    },
};
use tracing::{info, warn};
use uuid::Uuid;

use super::cart_store;

#[derive(Debug, Clone)]
pub struct NewOrder<'a> {
    pub user_id: Uuid,
    pub cart_id: Uuid,
    pub snapshots: &'a [LineItemSnapshot],
    pub shipping: &'a ShippingInfo,
    pub payment_method: PaymentMethod,
    pub currency: &'a str,
    /// Amount quoted from outside (client or gateway). Only checked, never stored.
    pub expected_amount_minor: Option<i64>,
    pub tolerance_minor: i64,
}

pub fn compute_total(snapshots: &[LineItemSnapshot]) -> CommerceResult<i64> {
    snapshots.iter().try_fold(0_i64, |total, snapshot| {
        let line = money::line_total(snapshot.quantity, snapshot.unit_price_minor)?;
        total
            .checked_add(line)
            .ok_or_else(|| CommerceError::InvalidInput("order total overflows".to_string()))
    })
}

pub fn create_order(
    tx: &mut dyn CommerceTx,
    new_order: NewOrder<'_>,
) -> CommerceResult<(OrderEntity, Vec<OrderLineItemEntity>)> {
    if new_order.snapshots.is_empty() {
        return Err(CommerceError::EmptyCart);
    }

    let total_price_minor = compute_total(new_order.snapshots)?;
    if let Some(expected) = new_order.expected_amount_minor {
        money::ensure_within_tolerance(total_price_minor, expected, new_order.tolerance_minor)
            .inspect_err(|_| {
                warn!(
                    user_id = %new_order.user_id,
                    cart_id = %new_order.cart_id,
                    total_price_minor,
                    expected_amount_minor = expected,
                    "order_ledger: quoted amount does not match cart total"
                );
            })?;
    }

    let shipping = new_order.shipping;
    let order = tx.insert_order(InsertOrderEntity {
        id: Uuid::new_v4(),
        user_id: new_order.user_id,
        cart_id: new_order.cart_id,
        total_price_minor,
        currency: new_order.currency.to_string(),
        payment_method: new_order.payment_method.to_string(),
        shipping_method: shipping.shipping_method.to_string(),
        recipient_name: shipping.recipient_name.clone(),
        phone: shipping.phone.clone(),
        address_line: shipping.address_line.clone(),
        city: shipping.city.clone(),
        postal_code: shipping.postal_code.clone(),
        country: shipping.country.clone(),
        status: OrderStatus::Pending.to_string(),
    })?;

    let mut rows = Vec::with_capacity(new_order.snapshots.len());
    for snapshot in new_order.snapshots {
        rows.push(InsertOrderLineItemEntity {
            id: Uuid::new_v4(),
            order_id: order.id,
            product_id: snapshot.product_id,
            quantity: snapshot.quantity,
            unit_price_minor: snapshot.unit_price_minor,
            line_total_minor: money::line_total(snapshot.quantity, snapshot.unit_price_minor)?,
        });
    }
    let line_items = tx.insert_order_line_items(rows)?;

    info!(
        order_id = %order.id,
        user_id = %order.user_id,
        total_price_minor,
        line_items = line_items.len(),
        "order_ledger: order created"
    );
    Ok((order, line_items))
}

fn load_order(tx: &mut dyn CommerceTx, order_id: Uuid) -> CommerceResult<OrderEntity> {
    tx.find_order(order_id)?.ok_or(CommerceError::NotFound("order"))
}

/// Guarded status change. Zero rows touched means another transaction moved the order
/// first.
fn transition(
    tx: &mut dyn CommerceTx,
    order: &OrderEntity,
    next: OrderStatus,
) -> CommerceResult<OrderEntity> {
    let from = order.current_status()?;
    let next = from.transition(next)?;

    if tx.update_order_status(order.id, from, next)? != 1 {
        return Err(CommerceError::Conflict("order"));
    }
    load_order(tx, order.id)
}

/// PENDING -> CONFIRMED. A reference passed here must match the one already attached, or is
/// attached now when the order has none.
pub fn finalize_order(
    tx: &mut dyn CommerceTx,
    order_id: Uuid,
    external_payment_ref: Option<&str>,
) -> CommerceResult<OrderEntity> {
    let mut order = load_order(tx, order_id)?;
    order.current_status()?.transition(OrderStatus::Confirmed)?;

    if let Some(reference) = external_payment_ref {
        order = attach_provider_ref(tx, order_id, reference)?;
    }

    let order = transition(tx, &order, OrderStatus::Confirmed)?;
    info!(order_id = %order.id, "order_ledger: order confirmed");
    Ok(order)
}

/// PENDING -> CANCELED, only for the order's owner.
pub fn cancel_order(
    tx: &mut dyn CommerceTx,
    order_id: Uuid,
    user_id: Uuid,
) -> CommerceResult<OrderEntity> {
    let order = load_order(tx, order_id)?;
    if order.user_id != user_id {
        return Err(CommerceError::Forbidden);
    }

    let order = transition(tx, &order, OrderStatus::Canceled)?;
    info!(order_id = %order.id, %user_id, "order_ledger: order canceled");
    Ok(order)
}

/// Records the gateway reference once. Re-attaching the same value is a no-op.
pub fn attach_provider_ref(
    tx: &mut dyn CommerceTx,
    order_id: Uuid,
    provider_ref: &str,
) -> CommerceResult<OrderEntity> {
    let order = load_order(tx, order_id)?;

    match order.provider_ref.as_deref() {
        Some(existing) if existing == provider_ref => return Ok(order),
        Some(existing) => {
            return Err(CommerceError::invalid_transition(
                "order payment reference",
                existing,
                provider_ref,
            ));
        }
        None => {}
    }

    let status = order.current_status()?;
    if status.is_terminal() {
        return Err(CommerceError::invalid_transition(
            "order payment reference",
            status,
            provider_ref,
        ));
    }

    if tx.set_order_provider_ref(order_id, provider_ref)? != 1 {
        return Err(CommerceError::Conflict("order"));
    }
    load_order(tx, order_id)
}

/// Declined payment path: hands the order's cart items back to the user.
pub fn restore_cart_items(tx: &mut dyn CommerceTx, order: &OrderEntity) -> CommerceResult<usize> {
    cart_store::restore_items(tx, order.user_id, order.cart_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::test_support::InMemoryStore;
    use crates::domain::{
        repositories::commerce_store::CommerceStore,
        value_objects::enums::shipping_methods::ShippingMethod,
    };

    fn shipping() -> ShippingInfo {
        ShippingInfo {
            recipient_name: "Ada Lovelace".to_string(),
            phone: "+44 20 0000 0000".to_string(),
            address_line: "12 Analytical Row".to_string(),
            city: "London".to_string(),
            postal_code: Some("N1".to_string()),
            country: "GB".to_string(),
            shipping_method: ShippingMethod::Standard,
        }
    }

    fn snapshots() -> Vec<LineItemSnapshot> {
        vec![
            LineItemSnapshot {
                product_id: Uuid::new_v4(),
                quantity: 2,
                unit_price_minor: 100,
            },
            LineItemSnapshot {
                product_id: Uuid::new_v4(),
                quantity: 1,
                unit_price_minor: 50,
            },
        ]
    }

    fn new_order<'a>(
        snapshots: &'a [LineItemSnapshot],
        shipping: &'a ShippingInfo,
        expected: Option<i64>,
    ) -> NewOrder<'a> {
        NewOrder {
            user_id: Uuid::new_v4(),
            cart_id: Uuid::new_v4(),
            snapshots,
            shipping,
            payment_method: PaymentMethod::Paypal,
            currency: "USD",
            expected_amount_minor: expected,
            tolerance_minor: 1,
        }
    }

    #[test]
    fn total_is_sum_of_line_totals() {
        let store = InMemoryStore::default();
        let (snapshots, shipping) = (snapshots(), shipping());

        let (order, items) = store
            .transaction(|tx| create_order(tx, new_order(&snapshots, &shipping, None)))
            .unwrap();

        assert_eq!(order.total_price_minor, 250);
        assert_eq!(order.status, "pending");
        let line_sum: i64 = items.iter().map(|i| i.line_total_minor).sum();
        assert_eq!(line_sum, order.total_price_minor);
    }

    #[test]
    fn empty_snapshot_list_is_rejected() {
        let store = InMemoryStore::default();
        let shipping = shipping();

        let result = store.transaction(|tx| create_order(tx, new_order(&[], &shipping, None)));
        assert!(matches!(result, Err(CommerceError::EmptyCart)));
        assert!(store.orders().is_empty());
    }

    #[test]
    fn quoted_amount_is_checked_but_not_stored() {
        let store = InMemoryStore::default();
        let (snapshots, shipping) = (snapshots(), shipping());

        let (order, _) = store
            .transaction(|tx| create_order(tx, new_order(&snapshots, &shipping, Some(251))))
            .unwrap();
        assert_eq!(order.total_price_minor, 250);

        let mismatch =
            store.transaction(|tx| create_order(tx, new_order(&snapshots, &shipping, Some(300))));
        assert!(matches!(
            mismatch,
            Err(CommerceError::AmountMismatch {
                expected_minor: 250,
                reported_minor: 300
            })
        ));
        assert_eq!(store.orders().len(), 1);
    }

    #[test]
    fn terminal_orders_do_not_move() {
        let store = InMemoryStore::default();
        let (snapshots, shipping) = (snapshots(), shipping());
        let (order, _) = store
            .transaction(|tx| create_order(tx, new_order(&snapshots, &shipping, None)))
            .unwrap();

        store
            .transaction(|tx| finalize_order(tx, order.id, None))
            .unwrap();

        let cancel = store.transaction(|tx| cancel_order(tx, order.id, order.user_id));
        assert!(matches!(cancel, Err(CommerceError::InvalidState { .. })));
        let again = store.transaction(|tx| finalize_order(tx, order.id, None));
        assert!(matches!(again, Err(CommerceError::InvalidState { .. })));
        assert_eq!(store.order(order.id).unwrap().status, "confirmed");
    }

    #[test]
    fn cancel_checks_ownership() {
        let store = InMemoryStore::default();
        let (snapshots, shipping) = (snapshots(), shipping());
        let (order, _) = store
            .transaction(|tx| create_order(tx, new_order(&snapshots, &shipping, None)))
            .unwrap();

        let stranger = store.transaction(|tx| cancel_order(tx, order.id, Uuid::new_v4()));
        assert!(matches!(stranger, Err(CommerceError::Forbidden)));

        let canceled = store
            .transaction(|tx| cancel_order(tx, order.id, order.user_id))
            .unwrap();
        assert_eq!(canceled.status, "canceled");
    }

    #[test]
    fn unknown_order_is_not_found() {
        let store = InMemoryStore::default();
        let result = store.transaction(|tx| finalize_order(tx, Uuid::new_v4(), None));
        assert!(matches!(result, Err(CommerceError::NotFound("order"))));
    }

    #[test]
    fn provider_ref_is_set_once() {
        let store = InMemoryStore::default();
        let (snapshots, shipping) = (snapshots(), shipping());
        let (order, _) = store
            .transaction(|tx| create_order(tx, new_order(&snapshots, &shipping, None)))
            .unwrap();

        let attached = store
            .transaction(|tx| attach_provider_ref(tx, order.id, "PP-1"))
            .unwrap();
        assert_eq!(attached.provider_ref.as_deref(), Some("PP-1"));

        store
            .transaction(|tx| attach_provider_ref(tx, order.id, "PP-1"))
            .unwrap();
        let other = store.transaction(|tx| attach_provider_ref(tx, order.id, "PP-2"));
        assert!(matches!(other, Err(CommerceError::InvalidState { .. })));

        let mismatched = store.transaction(|tx| finalize_order(tx, order.id, Some("PP-2")));
        assert!(mismatched.is_err());
        assert_eq!(store.order(order.id).unwrap().status, "pending");
    }
}
