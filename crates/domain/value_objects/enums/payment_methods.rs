use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Settled at the door; the order is confirmed as soon as it is placed.
    CashOnDelivery,
    /// External wallet; confirmed only after the gateway reports a capture.
    Paypal,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CashOnDelivery => "cash_on_delivery",
            PaymentMethod::Paypal => "paypal",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "cash_on_delivery" => Some(PaymentMethod::CashOnDelivery),
            "paypal" => Some(PaymentMethod::Paypal),
            _ => None,
        }
    }

    pub fn requires_gateway(&self) -> bool {
        matches!(self, PaymentMethod::Paypal)
    }
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
