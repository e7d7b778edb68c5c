use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use prometheus::{Encoder, Registry, TextEncoder};
use std::sync::Arc;

use crate::db::PoolStatus;

/// Reads the database pool state for `/health`.
pub type PoolProbe = Arc<dyn Fn() -> PoolStatus + Send + Sync>;

/// Serve `/metrics` and `/health`. Runs on its own actix system, so call it
/// from a dedicated thread.
pub async fn start_metrics_server(registry: Registry, pool: PoolProbe, port: u16) -> std::io::Result<()> {
    tracing::info!("📊 Starting metrics server on http://0.0.0.0:{}/metrics", port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(registry.clone()))
            .app_data(web::Data::new(pool.clone()))
            .configure(routes)
    })
    .workers(1)
    .bind(("0.0.0.0", port))?
    .run()
    .await
}

fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/metrics", web::get().to(metrics_handler))
        .route("/health", web::get().to(health_handler));
}

async fn metrics_handler(registry: web::Data<Registry>) -> impl Responder {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    match encoder.encode(&registry.gather(), &mut buffer) {
        Ok(()) => HttpResponse::Ok()
            .content_type(encoder.format_type())
            .body(buffer),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// 503 once the pool is closed (shutdown in progress).
async fn health_handler(pool: web::Data<PoolProbe>) -> impl Responder {
    let status = (pool.get_ref())();
    let body = serde_json::json!({
        "status": if status.closed { "unavailable" } else { "healthy" },
        "service": "order-service",
        "database": status,
    });

    if status.closed {
        HttpResponse::ServiceUnavailable().json(body)
    } else {
        HttpResponse::Ok().json(body)
    }
}
