use std::time::Duration;

use crates::payments::paypal_client::PaypalSettings;
use crate::usecases::{
    checkout::CheckoutSettings, payment_reconciler::ReconcilerSettings, retry::RetryPolicy,
};

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub backend_server: BackendServer,
    pub database: Database,
    pub paypal: Paypal,
    pub payments: Payments,
}

#[derive(Debug, Clone)]
pub struct BackendServer {
    pub port: u16,
    /// Megabytes.
    pub body_limit: u64,
    /// Seconds.
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct Paypal {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub return_url: String,
    pub cancel_url: String,
    pub brand_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Payments {
    /// ISO 4217 code used for every order.
    pub currency: String,
    pub amount_tolerance_minor: i64,
    pub gateway_timeout_secs: u64,
    pub webhook_secret: String,
    pub webhook_tolerance_secs: i64,
    pub retry_max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
}

impl Payments {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_max_attempts,
            Duration::from_millis(self.retry_base_delay_ms),
            Duration::from_millis(self.retry_max_delay_ms),
        )
    }

    pub fn reconciler_settings(&self) -> ReconcilerSettings {
        ReconcilerSettings {
            tolerance_minor: self.amount_tolerance_minor,
            retry: self.retry_policy(),
            webhook_secret: self.webhook_secret.clone(),
            webhook_tolerance_secs: self.webhook_tolerance_secs,
        }
    }

    pub fn checkout_settings(&self) -> CheckoutSettings {
        CheckoutSettings {
            currency: self.currency.clone(),
            tolerance_minor: self.amount_tolerance_minor,
        }
    }
}

impl Paypal {
    pub fn client_settings(&self, timeout_secs: u64) -> PaypalSettings {
        PaypalSettings {
            base_url: self.base_url.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            return_url: self.return_url.clone(),
            cancel_url: self.cancel_url.clone(),
            brand_name: self.brand_name.clone(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}
