use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::{cart_line_items::CartLineItemEntity, carts::CartEntity};

#[derive(Debug, Clone, Deserialize)]
pub struct AddCartItemModel {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCartItemModel {
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CartLineItemDto {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price_minor: i64,
    pub line_total_minor: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CartDto {
    pub cart_id: Option<Uuid>,
    pub items: Vec<CartLineItemDto>,
    pub subtotal_minor: i64,
}

impl CartDto {
    pub fn empty() -> Self {
        Self {
            cart_id: None,
            items: Vec::new(),
            subtotal_minor: 0,
        }
    }

    pub fn from_parts(cart: &CartEntity, items: &[CartLineItemEntity]) -> Self {
        let items: Vec<CartLineItemDto> = items
            .iter()
            .map(|item| CartLineItemDto {
                id: item.id,
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price_minor: item.unit_price_minor,
                line_total_minor: item.unit_price_minor.saturating_mul(i64::from(item.quantity)),
            })
            .collect();
        let subtotal_minor = items
            .iter()
            .fold(0_i64, |acc, item| acc.saturating_add(item.line_total_minor));

        Self {
            cart_id: Some(cart.id),
            items,
            subtotal_minor,
        }
    }
}
