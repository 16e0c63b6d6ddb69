use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::{
    errors::{CommerceError, CommerceResult},
    value_objects::enums::cart_statuses::CartLineItemStatus,
};
use crate::infra::db::postgres::schema::cart_line_items;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable, PartialEq)]
#[diesel(table_name = cart_line_items)]
pub struct CartLineItemEntity {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    /// Catalog price captured when the product was added to the cart.
    pub unit_price_minor: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartLineItemEntity {
    pub fn current_status(&self) -> CommerceResult<CartLineItemStatus> {
        CartLineItemStatus::from_str(&self.status).ok_or_else(|| {
            CommerceError::Internal(anyhow::anyhow!(
                "cart line item {} has unknown status {}",
                self.id,
                self.status
            ))
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = cart_line_items)]
pub struct InsertCartLineItemEntity {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price_minor: i64,
    pub status: String,
}
