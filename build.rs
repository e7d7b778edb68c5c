// Generates the OrderGrpcService server/client stubs. Message types are
// hand-written prost structs in src/grpc/proto.rs, so no protoc is needed.
fn main() {
    let method = |name: &str, route: &str, input: &str, output: &str| {
        tonic_build::manual::Method::builder()
            .name(name)
            .route_name(route)
            .input_type(format!("crate::grpc::proto::{input}"))
            .output_type(format!("crate::grpc::proto::{output}"))
            .codec_path("tonic_prost::ProstCodec")
            .build()
    };

    let service = tonic_build::manual::Service::builder()
        .name("OrderGrpcService")
        .package("order")
        .method(method(
            "create_order",
            "CreateOrder",
            "CreateOrderRequest",
            "CreateOrderResponse",
        ))
        .method(method(
            "get_order",
            "GetOrder",
            "GetOrderRequest",
            "GetOrderResponse",
        ))
        .method(method(
            "get_orders_by_user",
            "GetOrdersByUser",
            "GetOrdersByUserRequest",
            "GetOrdersByUserResponse",
        ))
        .method(method(
            "update_order_status",
            "UpdateOrderStatus",
            "UpdateOrderStatusRequest",
            "UpdateOrderStatusResponse",
        ))
        .build();

    tonic_build::manual::Builder::new().compile(&[service]);
}
