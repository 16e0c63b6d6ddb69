use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::cart_line_items::CartLineItemEntity,
    value_objects::{
        enums::{payment_methods::PaymentMethod, shipping_methods::ShippingMethod},
        orders::OrderDto,
    },
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShippingInfo {
    pub recipient_name: String,
    pub phone: String,
    pub address_line: String,
    pub city: String,
    pub postal_code: Option<String>,
    pub country: String,
    #[serde(default)]
    pub shipping_method: ShippingMethod,
}

/// Price-and-quantity pair frozen from the cart; never re-read from the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineItemSnapshot {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price_minor: i64,
}

impl From<&CartLineItemEntity> for LineItemSnapshot {
    fn from(item: &CartLineItemEntity) -> Self {
        Self {
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price_minor: item.unit_price_minor,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutModel {
    pub shipping_info: ShippingInfo,
    pub payment_method: PaymentMethod,
    /// Amount the client was shown, in minor units. Checked against the cart total.
    pub expected_amount_minor: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutDto {
    pub order: OrderDto,
    /// Where to send the shopper to approve a gateway payment. Absent for methods settled
    /// at checkout, or when the gateway could not be reached yet.
    pub approval_url: Option<String>,
}
