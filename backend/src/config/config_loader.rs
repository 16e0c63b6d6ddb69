use std::{env, str::FromStr};

use anyhow::{Context, Result};

use super::config_model::{BackendServer, Database, DotEnvyConfig, Payments, Paypal};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let backend_server = BackendServer {
        port: required_parse("SERVER_PORT_BACKEND")?,
        body_limit: optional_parse("SERVER_BODY_LIMIT", 10)?,
        timeout: optional_parse("SERVER_TIMEOUT", 30)?,
    };

    Ok(DotEnvyConfig {
        backend_server,
        database: load_database()?,
        paypal: load_paypal()?,
        payments: load_payments()?,
    })
}

pub fn load_database() -> Result<Database> {
    dotenvy::dotenv().ok();

    Ok(Database {
        url: required("DATABASE_URL")?,
        max_connections: optional_parse("DATABASE_MAX_CONNECTIONS", 10)?,
    })
}

pub fn load_paypal() -> Result<Paypal> {
    dotenvy::dotenv().ok();

    Ok(Paypal {
        base_url: optional("PAYPAL_BASE_URL")
            .unwrap_or_else(|| "https://api-m.sandbox.paypal.com".to_string()),
        client_id: required("PAYPAL_CLIENT_ID")?,
        client_secret: required("PAYPAL_CLIENT_SECRET")?,
        return_url: required("PAYPAL_RETURN_URL")?,
        cancel_url: required("PAYPAL_CANCEL_URL")?,
        brand_name: optional("PAYPAL_BRAND_NAME"),
    })
}

pub fn load_payments() -> Result<Payments> {
    dotenvy::dotenv().ok();

    let payments = Payments {
        currency: optional("PAYMENT_CURRENCY")
            .unwrap_or_else(|| "USD".to_string())
            .to_ascii_uppercase(),
        amount_tolerance_minor: optional_parse("PAYMENT_AMOUNT_TOLERANCE_MINOR", 0)?,
        gateway_timeout_secs: optional_parse("PAYMENT_GATEWAY_TIMEOUT_SECS", 10)?,
        webhook_secret: required("PAYMENT_WEBHOOK_SECRET")?,
        webhook_tolerance_secs: optional_parse("PAYMENT_WEBHOOK_TOLERANCE_SECS", 300)?,
        retry_max_attempts: optional_parse("PAYMENT_RETRY_MAX_ATTEMPTS", 3)?,
        retry_base_delay_ms: optional_parse("PAYMENT_RETRY_BASE_DELAY_MS", 200)?,
        retry_max_delay_ms: optional_parse("PAYMENT_RETRY_MAX_DELAY_MS", 2_000)?,
    };

    anyhow::ensure!(
        payments.amount_tolerance_minor >= 0,
        "PAYMENT_AMOUNT_TOLERANCE_MINOR must not be negative"
    );
    anyhow::ensure!(
        payments.retry_max_attempts >= 1,
        "PAYMENT_RETRY_MAX_ATTEMPTS must be at least 1"
    );

    Ok(payments)
}

pub fn required(key: &str) -> Result<String> {
    optional(key).with_context(|| format!("{key} is invalid"))
}

pub fn optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn required_parse<T>(key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    required(key)?
        .parse()
        .with_context(|| format!("{key} is invalid"))
}

pub fn optional_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional(key) {
        Some(raw) => raw.parse().with_context(|| format!("{key} is invalid")),
        None => Ok(default),
    }
}
