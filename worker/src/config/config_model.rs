use std::time::Duration;

use backend::config::config_model::{Database, Payments, Paypal};

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub worker_server: WorkerServer,
    pub database: Database,
    pub paypal: Paypal,
    pub payments: Payments,
    pub reconcile: Reconcile,
}

#[derive(Debug, Clone)]
pub struct WorkerServer {
    pub port: u16,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Reconcile {
    pub interval_secs: u64,
    /// How old a PENDING order must be before the sweep touches it.
    pub grace_period_secs: i64,
    pub batch_size: i64,
}

impl Reconcile {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn grace_period(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.grace_period_secs)
    }
}
