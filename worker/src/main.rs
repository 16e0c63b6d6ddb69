use anyhow::Result;
use backend::usecases::payment_reconciler::PaymentReconciler;
use crates::{
    infra::db::{
        postgres::postgres_connection,
        repositories::{commerce_store::CommercePostgres, orders::OrderQueryPostgres},
    },
    payments::paypal_client::PaypalClient,
};
use std::sync::Arc;
use tracing::{error, info};
use worker::{
    axum_http, config,
    services::reconciliation_loop::{ReconciliationSweep, SweepSettings},
};

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(error) = run().await {
        error!("Worker exited with error: {}", error);
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    crates::observability::init_observability("worker")?;

    let dotenvy_env = Arc::new(config::config_loader::load()?);
    info!("ENV has been loaded");

    let postgres_pool = postgres_connection::establish_connection(
        &dotenvy_env.database.url,
        dotenvy_env.database.max_connections,
    )?;
    info!("Postgres connection has been established");

    let db_pool_arc = Arc::new(postgres_pool);

    let paypal_client = PaypalClient::new(
        dotenvy_env
            .paypal
            .client_settings(dotenvy_env.payments.gateway_timeout_secs),
    )?;

    let store = Arc::new(CommercePostgres::new(Arc::clone(&db_pool_arc)));
    let reconciler = Arc::new(PaymentReconciler::new(
        store,
        Arc::new(paypal_client),
        dotenvy_env.payments.reconciler_settings(),
    ));
    let sweep = ReconciliationSweep::new(
        Arc::new(OrderQueryPostgres::new(Arc::clone(&db_pool_arc))),
        reconciler,
        SweepSettings {
            interval: dotenvy_env.reconcile.interval(),
            grace_period: dotenvy_env.reconcile.grace_period(),
            batch_size: dotenvy_env.reconcile.batch_size,
        },
    );

    let sweep_loop = tokio::spawn(async move { sweep.run().await });
    let health_server = tokio::spawn(axum_http::http_serve::start(Arc::clone(&dotenvy_env)));

    tokio::select! {
        result = sweep_loop => result??,
        result = health_server => result??,
    };

    Ok(())
}
