use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod context;
mod db;
mod domain;
mod grpc;
mod messaging;
mod metrics;
mod models;
mod utils;

use config::Config;
use db::PgOrderStore;
use domain::order::{OrderService, OrderServiceConfig};
use grpc::OrderGrpcHandler;
use messaging::{KafkaPublisher, KafkaPublisherConfig};
use utils::{retry_with_backoff, RetryConfig};

const PUBLISH_GRACE: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO, overridable with RUST_LOG
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,order_service=debug")),
        )
        .init();

    let config = Config::from_env().context("failed to load configuration")?;
    tracing::info!(?config, "🚀 Starting Order Service");

    // === 1. Database pool + schema ===
    let connect_options = config.database.connect_options()?;
    let store = retry_with_backoff("database connect", &RetryConfig::default(), |_| {
        PgOrderStore::connect(connect_options.clone(), config.db_max_connections)
    })
    .await
    .context("failed to connect to database")?;

    retry_with_backoff("database migrate", &RetryConfig::default(), |_| store.migrate())
        .await
        .context("failed to apply migrations")?;

    // === 2. Metrics registry + HTTP exposition on its own thread ===
    let metrics = Arc::new(metrics::Metrics::new().context("failed to register metrics")?);
    let registry = metrics.registry().clone();
    let metrics_port = config.metrics_port;
    let health_store = store.clone();
    let pool_probe: metrics::PoolProbe = Arc::new(move || health_store.pool_status());
    std::thread::spawn(move || {
        let result = actix_web::rt::System::new()
            .block_on(metrics::start_metrics_server(registry, pool_probe, metrics_port));
        if let Err(e) = result {
            tracing::error!(error = %e, "Metrics server error");
        }
    });

    // === 3. Kafka publisher ===
    let publisher = Arc::new(
        KafkaPublisher::new(&KafkaPublisherConfig {
            brokers: config.kafka_brokers.clone(),
            client_id: "order-service".to_string(),
            ack_timeout: config.kafka_publish_timeout,
        })
        .context("failed to create Kafka producer")?,
    );

    // === 4. Workflow service + gRPC adapter ===
    let service = Arc::new(OrderService::new(
        Arc::new(store.clone()),
        publisher.clone(),
        metrics.clone(),
        OrderServiceConfig {
            order_created_topic: config.kafka_topic_order_created.clone(),
            // Outlasts the producer's own ack wait so the producer reports first.
            publish_timeout: config.kafka_publish_timeout.saturating_add(PUBLISH_GRACE),
        },
    ));
    let handler = OrderGrpcHandler::new(service, metrics, config.grpc_request_timeout);

    // === 5. Serve until Ctrl-C / SIGTERM ===
    let addr = SocketAddr::from(([0, 0, 0, 0], config.grpc_port));
    grpc::serve(addr, handler, shutdown_signal())
        .await
        .context("gRPC server failed")?;

    // === 6. Drain ===
    publisher.flush(config.kafka_publish_timeout);
    store.close().await;

    tracing::info!("👋 Order Service stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
