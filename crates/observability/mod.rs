//! Tracing setup shared by every binary, plus forwarding of operator alerts to Discord.
//!
//! Anything logged at or above `DISCORD_NOTIFY_LEVEL`, and any event that sets
//! `operator_alert = true`, is pushed to the configured webhook.

mod config;
mod discord;
mod layer;
mod notifier;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use config::ObservabilityConfig;
use discord::DiscordSink;
use layer::OperatorAlertLayer;
use notifier::AlertDispatcher;

pub use layer::OPERATOR_ALERT_FIELD;

/// Installs the global subscriber. Call once, from inside the tokio runtime.
pub fn init_observability(component: &str) -> Result<()> {
    let config = ObservabilityConfig::from_env(component);

    let alert_layer = config.alerts.as_ref().map(|alerts| {
        let dispatcher = AlertDispatcher::spawn(
            vec![Arc::new(DiscordSink::new(alerts.webhook_url.clone()))],
            Duration::from_secs(alerts.dedup_window_secs),
        );
        OperatorAlertLayer::new(dispatcher, config.service.clone(), alerts.min_level)
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Local time so `TZ` is honoured in log timestamps.
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339());

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(alert_layer)
        .with(env_filter)
        .try_init()?;

    for warning in &config.warnings {
        warn!(
            service = %config.service.service_name,
            component = %config.service.component,
            warning = %warning,
            "observability: config warning"
        );
    }

    info!(
        service = %config.service.service_name,
        environment = %config.service.environment,
        component = %config.service.component,
        operator_alerts = config.alerts.is_some(),
        "observability: tracing initialised"
    );

    Ok(())
}
