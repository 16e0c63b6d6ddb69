use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::{
    errors::{CommerceError, CommerceResult},
    value_objects::enums::{order_statuses::OrderStatus, payment_methods::PaymentMethod},
};
use crate::infra::db::postgres::schema::orders;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable, PartialEq)]
#[diesel(table_name = orders)]
pub struct OrderEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub cart_id: Uuid,
    pub total_price_minor: i64,
    pub currency: String,
    pub payment_method: String,
    pub shipping_method: String,
    pub recipient_name: String,
    pub phone: String,
    pub address_line: String,
    pub city: String,
    pub postal_code: Option<String>,
    pub country: String,
    pub status: String,
    pub provider_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Last time the reconciliation sweep looked at this order.
    pub last_reconciled_at: Option<DateTime<Utc>>,
}

impl OrderEntity {
    pub fn current_status(&self) -> CommerceResult<OrderStatus> {
        OrderStatus::from_str(&self.status).ok_or_else(|| {
            CommerceError::Internal(anyhow::anyhow!(
                "order {} has unknown status {}",
                self.id,
                self.status
            ))
        })
    }

    pub fn payment_method(&self) -> CommerceResult<PaymentMethod> {
        PaymentMethod::from_str(&self.payment_method).ok_or_else(|| {
            CommerceError::Internal(anyhow::anyhow!(
                "order {} has unknown payment method {}",
                self.id,
                self.payment_method
            ))
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = orders)]
pub struct InsertOrderEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub cart_id: Uuid,
    pub total_price_minor: i64,
    pub currency: String,
    pub payment_method: String,
    pub shipping_method: String,
    pub recipient_name: String,
    pub phone: String,
    pub address_line: String,
    pub city: String,
    pub postal_code: Option<String>,
    pub country: String,
    pub status: String,
}
