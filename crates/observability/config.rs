use std::env;

use tracing::Level;
use url::Url;

#[derive(Clone, Debug)]
pub(crate) struct ServiceContext {
    pub(crate) service_name: String,
    pub(crate) environment: String,
    pub(crate) component: String,
}

#[derive(Clone, Debug)]
pub(crate) struct AlertSinkConfig {
    pub(crate) webhook_url: Url,
    pub(crate) min_level: Level,
    /// Identical alerts inside this window are collapsed into one.
    pub(crate) dedup_window_secs: u64,
}

#[derive(Clone, Debug)]
pub(crate) struct ObservabilityConfig {
    pub(crate) service: ServiceContext,
    pub(crate) alerts: Option<AlertSinkConfig>,
    /// Collected while parsing; logged once the subscriber exists.
    pub(crate) warnings: Vec<String>,
}

impl ObservabilityConfig {
    pub(crate) fn from_env(component: &str) -> Self {
        Self::from_lookup(component, |key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(component: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let component = component.trim().to_string();

        let service = ServiceContext {
            service_name: lookup("SERVICE_NAME").unwrap_or_else(|| format!("commerce-{component}")),
            environment: lookup("STAGE").unwrap_or_else(|| "unknown".to_string()),
            component,
        };

        let mut warnings = Vec::new();
        let alerts = alert_sink_from(&lookup, &mut warnings);

        Self {
            service,
            alerts,
            warnings,
        }
    }
}

fn alert_sink_from<F>(lookup: &F, warnings: &mut Vec<String>) -> Option<AlertSinkConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let enabled = match lookup("DISCORD_NOTIFY_ENABLED") {
        Some(raw) => parse_bool(&raw).unwrap_or_else(|| {
            warnings.push(format!(
                "DISCORD_NOTIFY_ENABLED is not a boolean (value: {raw}); treating as enabled"
            ));
            true
        }),
        None => true,
    };
    if !enabled {
        return None;
    }

    let raw_url = lookup("DISCORD_WEBHOOK_URL")?;
    let webhook_url = match Url::parse(&raw_url) {
        Ok(url) => url,
        Err(err) => {
            // The URL embeds a token, so only the parse error is reported.
            warnings.push(format!(
                "DISCORD_WEBHOOK_URL is invalid; operator alerts disabled (parse error: {err})"
            ));
            return None;
        }
    };

    let min_level = match lookup("DISCORD_NOTIFY_LEVEL") {
        Some(raw) => parse_level(&raw).unwrap_or_else(|| {
            warnings.push(format!(
                "DISCORD_NOTIFY_LEVEL is invalid (value: {raw}); defaulting to ERROR"
            ));
            Level::ERROR
        }),
        None => Level::ERROR,
    };

    let dedup_window_secs = match lookup("DISCORD_DEDUP_WINDOW_SECS") {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warnings.push(format!(
                "DISCORD_DEDUP_WINDOW_SECS is not a number (value: {raw}); defaulting to 60"
            ));
            60
        }),
        None => 60,
    };

    Some(AlertSinkConfig {
        webhook_url,
        min_level,
        dedup_window_secs,
    })
}

fn parse_level(input: &str) -> Option<Level> {
    match input.to_ascii_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}

fn parse_bool(input: &str) -> Option<bool> {
    match input.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
