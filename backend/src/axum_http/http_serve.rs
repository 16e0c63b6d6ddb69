use crate::{
    auth::USER_ID_HEADER,
    axum_http::{default_routers, routers},
    config::config_model::DotEnvyConfig,
    usecases::{
        checkout::CheckoutUseCase, orders::OrderUseCase, payment_reconciler::PaymentReconciler,
    },
};
use anyhow::Result;
use axum::{
    Router,
    http::{
        HeaderName, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::get,
};
use crates::{
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{commerce_store::CommercePostgres, orders::OrderQueryPostgres},
    },
    payments::{callback_signature::SIGNATURE_HEADER, paypal_client::PaypalClient},
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};

pub async fn start(
    config: Arc<DotEnvyConfig>,
    db_pool: Arc<PgPoolSquad>,
    gateway: Arc<PaypalClient>,
) -> Result<()> {
    let store = Arc::new(CommercePostgres::new(Arc::clone(&db_pool)));
    let reconciler = Arc::new(PaymentReconciler::new(
        Arc::clone(&store),
        gateway,
        config.payments.reconciler_settings(),
    ));
    let checkout_usecase = Arc::new(CheckoutUseCase::new(
        Arc::clone(&store),
        Arc::clone(&reconciler),
        config.payments.checkout_settings(),
    ));
    let order_usecase = Arc::new(OrderUseCase::new(
        Arc::clone(&store),
        Arc::new(OrderQueryPostgres::new(Arc::clone(&db_pool))),
    ));

    let app = Router::new()
        .fallback(default_routers::not_found)
        .nest(
            "/api/v1/cart",
            routers::cart::routes(Arc::clone(&db_pool), Arc::clone(&store)),
        )
        .nest("/api/v1/checkout", routers::checkout::routes(checkout_usecase))
        .nest(
            "/api/v1/orders",
            routers::orders::routes(order_usecase, Arc::clone(&reconciler)),
        )
        .nest("/api/v1/payment", routers::payments::routes(reconciler))
        .route("/api/v1/health-check", get(default_routers::health_check))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.backend_server.timeout,
        )))
        .layer(RequestBodyLimitLayer::new(
            (config.backend_server.body_limit * 1024 * 1024).try_into()?,
        ))
        .layer(
            CorsLayer::new()
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PATCH,
                    Method::PUT,
                    Method::DELETE,
                ])
                .allow_headers([
                    AUTHORIZATION,
                    CONTENT_TYPE,
                    HeaderName::from_static(USER_ID_HEADER),
                    HeaderName::from_static(SIGNATURE_HEADER),
                ])
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.backend_server.port));
    let listener = TcpListener::bind(addr).await?;

    info!("Server is running on port {}", config.backend_server.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received ctrl+C signal"),
        Err(err) => error!(error = %err, "Failed to listen for ctrl+C, shutting down"),
    }
}
