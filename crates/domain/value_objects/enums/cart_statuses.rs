use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::domain::errors::{CommerceError, CommerceResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CartStatus {
    Active,
    Ordered,
    Removed,
}

impl CartStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CartStatus::Active => "active",
            CartStatus::Ordered => "ordered",
            CartStatus::Removed => "removed",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "active" => Some(CartStatus::Active),
            "ordered" => Some(CartStatus::Ordered),
            "removed" => Some(CartStatus::Removed),
            _ => None,
        }
    }

    /// ORDERED and REMOVED carts are never reused; a fresh ACTIVE cart is created instead.
    pub fn transition(self, next: CartStatus) -> CommerceResult<CartStatus> {
        match (self, next) {
            (CartStatus::Active, CartStatus::Ordered) | (CartStatus::Active, CartStatus::Removed) => {
                Ok(next)
            }
            _ => Err(CommerceError::invalid_transition("cart", self, next)),
        }
    }
}

impl Display for CartStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CartLineItemStatus {
    Active,
    Ordered,
    Removed,
}

impl CartLineItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CartLineItemStatus::Active => "active",
            CartLineItemStatus::Ordered => "ordered",
            CartLineItemStatus::Removed => "removed",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "active" => Some(CartLineItemStatus::Active),
            "ordered" => Some(CartLineItemStatus::Ordered),
            "removed" => Some(CartLineItemStatus::Removed),
            _ => None,
        }
    }

    /// ORDERED items may go back to ACTIVE (or be folded away as REMOVED) only when the
    /// payment for their order is declined.
    pub fn transition(self, next: CartLineItemStatus) -> CommerceResult<CartLineItemStatus> {
        use CartLineItemStatus::*;
        match (self, next) {
            (Active, Ordered) | (Active, Removed) | (Ordered, Active) | (Ordered, Removed) => {
                Ok(next)
            }
            _ => Err(CommerceError::invalid_transition("cart line item", self, next)),
        }
    }
}

impl From<CartStatus> for CartLineItemStatus {
    fn from(status: CartStatus) -> Self {
        match status {
            CartStatus::Active => CartLineItemStatus::Active,
            CartStatus::Ordered => CartLineItemStatus::Ordered,
            CartStatus::Removed => CartLineItemStatus::Removed,
        }
    }
}

impl Display for CartLineItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
