use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::Client;
use serde_json::json;
use url::Url;

use super::notifier::{AlertSink, OperatorAlert};

const CONTENT_LIMIT: usize = 2000;

/// Fields pulled up into the headline because operators search on them.
const HEADLINE_FIELDS: [&str; 3] = ["order_id", "provider_ref", "user_id"];

pub(crate) struct DiscordSink {
    webhook_url: Url,
    client: Client,
}

impl DiscordSink {
    pub(crate) fn new(webhook_url: Url) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(3))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            webhook_url,
            client,
        }
    }
}

pub(crate) fn render(alert: &OperatorAlert, repeats: u32) -> String {
    let mut lines = Vec::new();

    lines.push(format!(
        ":rotating_light: **{}** `{}` `{}` `{}`",
        alert.service_name,
        alert.environment,
        alert.component,
        alert.level.as_str()
    ));

    let message = alert
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or("(no message)");
    lines.push(format!("> {message}"));

    let keys: Vec<String> = HEADLINE_FIELDS
        .iter()
        .filter_map(|key| {
            alert.fields.get(*key).cloned().or_else(|| {
                alert
                    .spans
                    .iter()
                    .rev()
                    .find_map(|span| span.fields.get(*key).cloned())
            })
            .map(|value| format!("{key}=`{value}`"))
        })
        .collect();
    if !keys.is_empty() {
        lines.push(keys.join("  "));
    }

    let mut origin = format!(
        "`{}` `{}`",
        alert.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
        alert.target
    );
    if let Some(location) = &alert.location {
        origin.push_str(&format!(" `{location}`"));
    }
    lines.push(origin);

    if repeats > 0 {
        lines.push(format!("repeated {repeats} more time(s) since the last alert"));
    }

    let extra: Vec<String> = alert
        .fields
        .iter()
        .filter(|(key, _)| !HEADLINE_FIELDS.contains(&key.as_str()) && key.as_str() != "operator_alert")
        .map(|(key, value)| format!("- `{key}` = `{value}`"))
        .collect();
    if !extra.is_empty() {
        lines.push("fields:".to_string());
        lines.extend(extra);
    }

    if !alert.spans.is_empty() {
        let chain = alert
            .spans
            .iter()
            .map(|span| span.name.as_str())
            .collect::<Vec<_>>()
            .join(" > ");
        lines.push(format!("spans: `{chain}`"));
    }

    truncate(lines.join("\n"))
}

fn truncate(content: String) -> String {
    const SUFFIX: &str = "\n… (truncated)";

    if content.chars().count() <= CONTENT_LIMIT {
        return content;
    }

    let allowed = CONTENT_LIMIT - SUFFIX.chars().count();
    let mut truncated: String = content.chars().take(allowed).collect();
    truncated.push_str(SUFFIX);
    truncated
}

#[async_trait]
impl AlertSink for DiscordSink {
    async fn deliver(&self, alert: &OperatorAlert, repeats: u32) -> Result<()> {
        let response = self
            .client
            .post(self.webhook_url.clone())
            .json(&json!({ "content": render(alert, repeats) }))
            .send()
            .await
            .map_err(|err| {
                // reqwest errors echo the URL, which carries the webhook token.
                if err.is_timeout() {
                    anyhow!("discord webhook request timed out")
                } else if err.is_connect() {
                    anyhow!("discord webhook connection failed")
                } else {
                    anyhow!("discord webhook request failed")
                }
            })?;

        if response.status().is_success() {
            return Ok(());
        }

        Err(anyhow!(
            "discord webhook returned non-success status: {}",
            response.status()
        ))
    }

    fn sink_name(&self) -> &'static str {
        "discord"
    }
}
