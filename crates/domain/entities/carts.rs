use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::{
    errors::{CommerceError, CommerceResult},
    value_objects::enums::cart_statuses::CartStatus,
};
use crate::infra::db::postgres::schema::carts;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable, PartialEq)]
#[diesel(table_name = carts)]
pub struct CartEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartEntity {
    pub fn current_status(&self) -> CommerceResult<CartStatus> {
        CartStatus::from_str(&self.status).ok_or_else(|| {
            CommerceError::Internal(anyhow::anyhow!(
                "cart {} has unknown status {}",
                self.id,
                self.status
            ))
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = carts)]
pub struct InsertCartEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String,
}

impl InsertCartEntity {
    pub fn active_for(user_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            status: CartStatus::Active.to_string(),
        }
    }
}
