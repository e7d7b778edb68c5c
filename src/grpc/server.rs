use std::future::Future;
use std::net::SocketAddr;

use super::handler::OrderGrpcHandler;
use super::proto::order_grpc_service_server::OrderGrpcServiceServer;

/// Serve the order service plus the standard gRPC health service until
/// `shutdown` resolves.
pub async fn serve(
    addr: SocketAddr,
    handler: OrderGrpcHandler,
    shutdown: impl Future<Output = ()>,
) -> Result<(), tonic::transport::Error> {
    let (health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<OrderGrpcServiceServer<OrderGrpcHandler>>()
        .await;

    tracing::info!(%addr, "🚀 gRPC server listening");

    tonic::transport::Server::builder()
        .add_service(health_service)
        .add_service(OrderGrpcServiceServer::new(handler))
        .serve_with_shutdown(addr, shutdown)
        .await?;

    tracing::info!("gRPC server stopped");
    Ok(())
}
