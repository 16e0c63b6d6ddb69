use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{Level, warn};

#[derive(Clone, Debug)]
pub(crate) struct SpanSummary {
    pub(crate) name: String,
    pub(crate) fields: BTreeMap<String, String>,
}

/// One event that an operator has to look at.
#[derive(Clone, Debug)]
pub(crate) struct OperatorAlert {
    pub(crate) level: Level,
    pub(crate) timestamp: DateTime<Utc>,
    pub(crate) service_name: String,
    pub(crate) environment: String,
    pub(crate) component: String,
    pub(crate) target: String,
    pub(crate) location: Option<String>,
    pub(crate) message: Option<String>,
    pub(crate) fields: BTreeMap<String, String>,
    pub(crate) spans: Vec<SpanSummary>,
}

impl OperatorAlert {
    /// Alerts with the same origin and message are treated as repeats.
    pub(crate) fn fingerprint(&self) -> String {
        format!(
            "{}|{}|{}",
            self.target,
            self.location.as_deref().unwrap_or_default(),
            self.message.as_deref().unwrap_or_default()
        )
    }
}

#[async_trait]
pub(crate) trait AlertSink: Send + Sync {
    async fn deliver(&self, alert: &OperatorAlert, repeats: u32) -> Result<()>;
    fn sink_name(&self) -> &'static str;
}

/// Counts repeats of the same fingerprint inside a sliding window.
pub(crate) struct Deduplicator {
    window: Duration,
    seen: HashMap<String, (Instant, u32)>,
}

impl Deduplicator {
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            window,
            seen: HashMap::new(),
        }
    }

    /// `Some(repeats)` when the alert should go out, carrying how many copies were swallowed
    /// since the previous delivery. `None` while still inside the window.
    pub(crate) fn admit(&mut self, fingerprint: String, now: Instant) -> Option<u32> {
        let window = self.window;
        self.seen
            .retain(|_, (sent_at, suppressed)| *suppressed > 0 || now.duration_since(*sent_at) < window);

        match self.seen.get_mut(&fingerprint) {
            Some((sent_at, suppressed)) if now.duration_since(*sent_at) < window => {
                *suppressed += 1;
                None
            }
            Some((sent_at, suppressed)) => {
                let repeats = *suppressed;
                *sent_at = now;
                *suppressed = 0;
                Some(repeats)
            }
            None => {
                self.seen.insert(fingerprint, (now, 0));
                Some(0)
            }
        }
    }
}

#[derive(Clone)]
pub(crate) struct AlertDispatcher {
    tx: mpsc::Sender<OperatorAlert>,
}

impl AlertDispatcher {
    /// Spawns the delivery task; must be called inside a tokio runtime.
    pub(crate) fn spawn(sinks: Vec<Arc<dyn AlertSink>>, dedup_window: Duration) -> Self {
        let (tx, mut rx) = mpsc::channel::<OperatorAlert>(256);

        tokio::spawn(async move {
            let mut dedup = Deduplicator::new(dedup_window);

            while let Some(alert) = rx.recv().await {
                let Some(repeats) = dedup.admit(alert.fingerprint(), Instant::now()) else {
                    continue;
                };

                for sink in &sinks {
                    if let Err(error) = sink.deliver(&alert, repeats).await {
                        warn!(
                            sink = sink.sink_name(),
                            error = %error,
                            "observability: alert delivery failed"
                        );
                    }
                }
            }
        });

        Self { tx }
    }

    pub(crate) fn dispatch(&self, alert: OperatorAlert) {
        match self.tx.try_send(alert) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("observability: alert queue full; dropping alert");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("observability: alert queue closed; dropping alert");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeats_inside_window_are_suppressed() {
        let mut dedup = Deduplicator::new(Duration::from_secs(60));
        let start = Instant::now();

        assert_eq!(dedup.admit("a".to_string(), start), Some(0));
        assert_eq!(dedup.admit("a".to_string(), start + Duration::from_secs(10)), None);
        assert_eq!(dedup.admit("a".to_string(), start + Duration::from_secs(20)), None);
        assert_eq!(dedup.admit("b".to_string(), start + Duration::from_secs(20)), Some(0));
    }

    #[test]
    fn window_expiry_lets_the_alert_through_again() {
        let mut dedup = Deduplicator::new(Duration::from_secs(60));
        let start = Instant::now();

        assert_eq!(dedup.admit("a".to_string(), start), Some(0));
        assert_eq!(dedup.admit("a".to_string(), start + Duration::from_secs(5)), None);
        assert_eq!(dedup.admit("a".to_string(), start + Duration::from_secs(61)), Some(1));
        assert_eq!(dedup.admit("a".to_string(), start + Duration::from_secs(122)), Some(0));
    }
}
