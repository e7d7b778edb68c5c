//! Wire messages for `order.OrderGrpcService`.
//!
//! Hand-written prost structs (standard protobuf encoding, no `.proto`
//! compilation step). The service stubs are generated by `build.rs` and
//! included at the bottom of this module.

// ---------------------------------------------------------------------------
// Shared shapes
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, prost::Message)]
pub struct OrderItemInput {
    #[prost(int32, tag = "1")]
    pub product_id: i32,
    #[prost(int32, tag = "2")]
    pub quantity: i32,
    #[prost(double, tag = "3")]
    pub price: f64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct OrderItem {
    #[prost(int32, tag = "1")]
    pub id: i32,
    #[prost(int32, tag = "2")]
    pub product_id: i32,
    #[prost(int32, tag = "3")]
    pub quantity: i32,
    #[prost(double, tag = "4")]
    pub price: f64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Order {
    #[prost(int32, tag = "1")]
    pub id: i32,
    #[prost(int32, tag = "2")]
    pub user_id: i32,
    #[prost(string, tag = "3")]
    pub status: String,
    #[prost(double, tag = "4")]
    pub total_amount: f64,
    #[prost(message, repeated, tag = "5")]
    pub items: Vec<OrderItem>,
    /// RFC3339, empty when unset.
    #[prost(string, tag = "6")]
    pub created_at: String,
    /// RFC3339, empty when unset.
    #[prost(string, tag = "7")]
    pub updated_at: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Pagination {
    #[prost(int64, tag = "1")]
    pub total: i64,
    #[prost(int64, tag = "2")]
    pub total_pages: i64,
    #[prost(int64, tag = "3")]
    pub limit: i64,
    #[prost(int64, tag = "4")]
    pub page: i64,
}

// ---------------------------------------------------------------------------
// CreateOrder
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, prost::Message)]
pub struct CreateOrderRequest {
    #[prost(int32, tag = "1")]
    pub user_id: i32,
    #[prost(double, tag = "2")]
    pub total_amount: f64,
    #[prost(message, repeated, tag = "3")]
    pub items: Vec<OrderItemInput>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CreateOrderResponse {
    #[prost(bool, tag = "1")]
    pub success: bool,
    #[prost(string, tag = "2")]
    pub message: String,
    #[prost(string, tag = "3")]
    pub code: String,
    #[prost(message, optional, tag = "4")]
    pub order: Option<Order>,
}

// ---------------------------------------------------------------------------
// GetOrder
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetOrderRequest {
    #[prost(int32, tag = "1")]
    pub id: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetOrderResponse {
    #[prost(bool, tag = "1")]
    pub success: bool,
    #[prost(string, tag = "2")]
    pub message: String,
    #[prost(string, tag = "3")]
    pub code: String,
    #[prost(message, optional, tag = "4")]
    pub order: Option<Order>,
}

// ---------------------------------------------------------------------------
// GetOrdersByUser
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetOrdersByUserRequest {
    #[prost(int32, tag = "1")]
    pub user_id: i32,
    #[prost(int32, tag = "2")]
    pub limit: i32,
    #[prost(int32, tag = "3")]
    pub page: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct OrdersPage {
    #[prost(message, repeated, tag = "1")]
    pub orders: Vec<Order>,
    #[prost(message, optional, tag = "2")]
    pub pagination: Option<Pagination>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetOrdersByUserResponse {
    #[prost(bool, tag = "1")]
    pub success: bool,
    #[prost(string, tag = "2")]
    pub message: String,
    #[prost(string, tag = "3")]
    pub code: String,
    #[prost(message, optional, tag = "4")]
    pub data: Option<OrdersPage>,
}

// ---------------------------------------------------------------------------
// UpdateOrderStatus
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, prost::Message)]
pub struct UpdateOrderStatusRequest {
    #[prost(int32, tag = "1")]
    pub id: i32,
    #[prost(string, tag = "2")]
    pub status: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct UpdateOrderStatusResponse {
    #[prost(bool, tag = "1")]
    pub success: bool,
    #[prost(string, tag = "2")]
    pub message: String,
    #[prost(string, tag = "3")]
    pub code: String,
    #[prost(message, optional, tag = "4")]
    pub order: Option<Order>,
}

// ---------------------------------------------------------------------------
// Generated service trait + server/client
// ---------------------------------------------------------------------------

include!(concat!(env!("OUT_DIR"), "/order.OrderGrpcService.rs"));
