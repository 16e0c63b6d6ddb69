use anyhow::{Result, ensure};
use backend::config::config_loader::{
    load_database, load_payments, load_paypal, optional_parse, required_parse,
};

use super::config_model::{DotEnvyConfig, Reconcile, WorkerServer};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let worker_server = WorkerServer {
        port: required_parse("SERVER_PORT_WORKER")?,
        timeout: optional_parse("SERVER_TIMEOUT", 30)?,
    };

    let reconcile = Reconcile {
        interval_secs: optional_parse("RECONCILE_INTERVAL_SECS", 60)?,
        grace_period_secs: optional_parse("RECONCILE_GRACE_PERIOD_SECS", 900)?,
        batch_size: optional_parse("RECONCILE_BATCH_SIZE", 50)?,
    };
    ensure!(
        reconcile.interval_secs >= 1,
        "RECONCILE_INTERVAL_SECS must be at least 1"
    );
    ensure!(
        reconcile.grace_period_secs >= 0,
        "RECONCILE_GRACE_PERIOD_SECS must not be negative"
    );
    ensure!(
        reconcile.batch_size >= 1,
        "RECONCILE_BATCH_SIZE must be at least 1"
    );

    Ok(DotEnvyConfig {
        worker_server,
        database: load_database()?,
        paypal: load_paypal()?,
        payments: load_payments()?,
        reconcile,
    })
}
