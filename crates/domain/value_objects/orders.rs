use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::entities::{order_line_items::OrderLineItemEntity, orders::OrderEntity};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OrderLineItemDto {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price_minor: i64,
    pub line_total_minor: i64,
}

impl From<&OrderLineItemEntity> for OrderLineItemDto {
    fn from(item: &OrderLineItemEntity) -> Self {
        Self {
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price_minor: item.unit_price_minor,
            line_total_minor: item.line_total_minor,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ShippingAddressDto {
    pub recipient_name: String,
    pub phone: String,
    pub address_line: String,
    pub city: String,
    pub postal_code: Option<String>,
    pub country: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OrderDto {
    pub id: Uuid,
    pub status: String,
    pub total_price_minor: i64,
    pub currency: String,
    pub payment_method: String,
    pub shipping_method: String,
    pub shipping_address: ShippingAddressDto,
    pub provider_ref: Option<String>,
    pub line_items: Vec<OrderLineItemDto>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderDto {
    pub fn from_parts(order: OrderEntity, line_items: &[OrderLineItemEntity]) -> Self {
        Self {
            id: order.id,
            status: order.status,
            total_price_minor: order.total_price_minor,
            currency: order.currency,
            payment_method: order.payment_method,
            shipping_method: order.shipping_method,
            shipping_address: ShippingAddressDto {
                recipient_name: order.recipient_name,
                phone: order.phone,
                address_line: order.address_line,
                city: order.city,
                postal_code: order.postal_code,
                country: order.country,
            },
            provider_ref: order.provider_ref,
            line_items: line_items.iter().map(OrderLineItemDto::from).collect(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OrderStatusDto {
    pub order_id: Uuid,
    pub status: String,
}
