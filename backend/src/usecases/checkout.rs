use std::sync::Arc;

use crates::domain::{
    entities::{order_line_items::OrderLineItemEntity, orders::OrderEntity},
    errors::{CommerceError, CommerceResult},
    repositories::commerce_store::CommerceStore,
    value_objects::{
        checkout::{CheckoutDto, CheckoutModel, LineItemSnapshot, ShippingInfo},
        enums::cart_statuses::{CartLineItemStatus, CartStatus},
        orders::OrderDto,
    },
};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    cart_store,
    order_ledger::{self, NewOrder},
    payment_reconciler::{PaymentGateway, PaymentReconciler},
};

#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub currency: String,
    pub tolerance_minor: i64,
}

pub struct CheckoutUseCase<S, G>
where
    S: CommerceStore + 'static,
    G: PaymentGateway + 'static,
{
    store: Arc<S>,
    reconciler: Arc<PaymentReconciler<S, G>>,
    settings: CheckoutSettings,
}

impl<S, G> CheckoutUseCase<S, G>
where
    S: CommerceStore + 'static,
    G: PaymentGateway + 'static,
{
    pub fn new(
        store: Arc<S>,
        reconciler: Arc<PaymentReconciler<S, G>>,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            store,
            reconciler,
            settings,
        }
    }

    /// Turns the user's active cart into an order.
    ///
    /// The order, its line items and the cart transition commit together. Cash on delivery
    /// is confirmed in that same transaction; gateway orders stay PENDING and get their
    /// payment intent after the commit, so a slow gateway never holds the cart lock.
    pub async fn checkout(&self, user_id: Uuid, model: CheckoutModel) -> CommerceResult<CheckoutDto> {
        validate_shipping(&model.shipping_info)?;

        let (mut order, line_items) = self.place_order(user_id, &model)?;

        let mut approval_url = None;
        if model.payment_method.requires_gateway() {
            match self.reconciler.create_intent(&order).await {
                Ok(intent) => {
                    order.provider_ref = Some(intent.provider_ref);
                    approval_url = intent.approval_url;
                }
                Err(err) => {
                    // The sweep retries intent creation for orders left without a reference.
                    warn!(
                        order_id = %order.id,
                        %user_id,
                        error = %err,
                        "checkout: order placed without payment intent"
                    );
                }
            }
        }

        Ok(CheckoutDto {
            order: OrderDto::from_parts(order, &line_items),
            approval_url,
        })
    }

    fn place_order(
        &self,
        user_id: Uuid,
        model: &CheckoutModel,
    ) -> CommerceResult<(OrderEntity, Vec<OrderLineItemEntity>)> {
        let result = self.store.transaction(|tx| {
            let cart = cart_store::get_active_cart(tx, user_id)?.ok_or(CommerceError::EmptyCart)?;
            let items = tx.find_cart_line_items(cart.id, CartLineItemStatus::Active)?;
            if items.is_empty() {
                return Err(CommerceError::EmptyCart);
            }

            let snapshots: Vec<LineItemSnapshot> =
                items.iter().map(LineItemSnapshot::from).collect();

            let (order, line_items) = order_ledger::create_order(
                tx,
                NewOrder {
                    user_id,
                    cart_id: cart.id,
                    snapshots: &snapshots,
                    shipping: &model.shipping_info,
                    payment_method: model.payment_method,
                    currency: &self.settings.currency,
                    expected_amount_minor: model.expected_amount_minor,
                    tolerance_minor: self.settings.tolerance_minor,
                },
            )?;

            cart_store::mark_cart_and_items(
                tx,
                cart.id,
                items.len(),
                CartStatus::Active,
                CartStatus::Ordered,
            )
            .map_err(|err| match err {
                CommerceError::Conflict(_) => CommerceError::ConcurrentCheckout,
                other => other,
            })?;

            let order = if model.payment_method.requires_gateway() {
                order
            } else {
                order_ledger::finalize_order(tx, order.id, None)?
            };

            Ok((order, line_items))
        });

        match &result {
            Ok((order, line_items)) => info!(
                order_id = %order.id,
                %user_id,
                cart_id = %order.cart_id,
                line_items = line_items.len(),
                total_price_minor = order.total_price_minor,
                payment_method = %order.payment_method,
                status = %order.status,
                "checkout: order placed"
            ),
            Err(CommerceError::ConcurrentCheckout) => warn!(
                %user_id,
                "checkout: cart changed concurrently, nothing written"
            ),
            Err(CommerceError::Internal(err)) => error!(
                %user_id,
                error = ?err,
                "checkout: storage failure, nothing written"
            ),
            Err(err) => info!(%user_id, error = %err, "checkout: rejected"),
        }

        result
    }
}

fn validate_shipping(shipping: &ShippingInfo) -> CommerceResult<()> {
    let required = [
        ("recipient_name", &shipping.recipient_name),
        ("phone", &shipping.phone),
        ("address_line", &shipping.address_line),
        ("city", &shipping.city),
        ("country", &shipping.country),
    ];

    match required.iter().find(|(_, value)| value.trim().is_empty()) {
        Some((field, _)) => Err(CommerceError::InvalidInput(format!(
            "shipping_info.{field} is required"
        ))),
        None => Ok(()),
    }
}
