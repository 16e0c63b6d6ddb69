use std::collections::BTreeMap;

use chrono::Utc;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

use super::config::ServiceContext;
use super::notifier::{AlertDispatcher, OperatorAlert, SpanSummary};

/// Events carrying `operator_alert = true` are forwarded whatever their level.
pub const OPERATOR_ALERT_FIELD: &str = "operator_alert";

#[derive(Clone)]
pub(crate) struct OperatorAlertLayer {
    dispatcher: AlertDispatcher,
    service: ServiceContext,
    min_level: Level,
}

impl OperatorAlertLayer {
    pub(crate) fn new(dispatcher: AlertDispatcher, service: ServiceContext, min_level: Level) -> Self {
        Self {
            dispatcher,
            service,
            min_level,
        }
    }
}

/// Lower levels compare greater in `tracing`, so "at least as severe" is `<=`.
pub(crate) fn should_forward(level: Level, min_level: Level, flagged: bool) -> bool {
    flagged || level <= min_level
}

#[derive(Default)]
struct FieldCollector {
    values: BTreeMap<String, String>,
}

impl FieldCollector {
    fn put(&mut self, field: &Field, value: String) {
        let value = if is_sensitive(field.name()) {
            "[REDACTED]".to_string()
        } else {
            value
        };
        self.values.insert(field.name().to_string(), value);
    }
}

impl Visit for FieldCollector {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.put(field, format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, value.to_string());
    }
}

struct SpanFields(BTreeMap<String, String>);

impl<S> Layer<S> for OperatorAlertLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut collector = FieldCollector::default();
        attrs.record(&mut collector);

        if collector.values.is_empty() {
            return;
        }
        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(SpanFields(collector.values));
        }
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };

        let mut collector = FieldCollector::default();
        values.record(&mut collector);
        if collector.values.is_empty() {
            return;
        }

        let mut extensions = span.extensions_mut();
        if let Some(existing) = extensions.get_mut::<SpanFields>() {
            existing.0.extend(collector.values);
        } else {
            extensions.insert(SpanFields(collector.values));
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();

        let mut collector = FieldCollector::default();
        event.record(&mut collector);

        let flagged = collector
            .values
            .get(OPERATOR_ALERT_FIELD)
            .is_some_and(|value| value == "true");
        if !should_forward(*metadata.level(), self.min_level, flagged) {
            return;
        }

        let message = collector
            .values
            .remove("message")
            .map(|raw| raw.trim().trim_matches('"').to_string());

        let spans = ctx
            .event_span(event)
            .map(|span| {
                span.scope()
                    .from_root()
                    .map(|s| SpanSummary {
                        name: s.metadata().name().to_string(),
                        fields: s
                            .extensions()
                            .get::<SpanFields>()
                            .map(|fields| fields.0.clone())
                            .unwrap_or_default(),
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        let location = match (metadata.file(), metadata.line()) {
            (Some(file), Some(line)) => Some(format!("{file}:{line}")),
            (Some(file), None) => Some(file.to_string()),
            _ => None,
        };

        self.dispatcher.dispatch(OperatorAlert {
            level: *metadata.level(),
            timestamp: Utc::now(),
            service_name: self.service.service_name.clone(),
            environment: self.service.environment.clone(),
            component: self.service.component.clone(),
            target: metadata.target().to_string(),
            location,
            message,
            fields: collector.values,
            spans,
        });
    }
}

fn is_sensitive(field_name: &str) -> bool {
    let field = field_name.to_ascii_lowercase();
    ["webhook", "secret", "password", "token", "authorization", "signature"]
        .iter()
        .any(|needle| field.contains(needle))
}
