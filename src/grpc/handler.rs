use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tonic::metadata::MetadataMap;
use tonic::{Request, Response, Status};

use super::proto::{
    self, order_grpc_service_server::OrderGrpcService, CreateOrderRequest, CreateOrderResponse,
    GetOrderRequest, GetOrderResponse, GetOrdersByUserRequest, GetOrdersByUserResponse,
    OrdersPage, Pagination, UpdateOrderStatusRequest, UpdateOrderStatusResponse,
};
use crate::context::RequestContext;
use crate::domain::order::{CreateOrder, NewLineItem, OrderError, OrderService, CODE_SUCCESS};
use crate::metrics::Metrics;
use crate::models::{Order, OrderLineItem};

// ============================================================================
// gRPC Request Adapter
// ============================================================================
//
// Every business outcome, success or failure, is answered with a normal
// response envelope {success, message, code}. `Status` errors are reserved
// for transport problems, which tonic produces on its own.
//
// ============================================================================

pub struct OrderGrpcHandler {
    service: Arc<OrderService>,
    metrics: Arc<Metrics>,
    max_request_timeout: Duration,
}

impl OrderGrpcHandler {
    pub fn new(service: Arc<OrderService>, metrics: Arc<Metrics>, max_request_timeout: Duration) -> Self {
        Self {
            service,
            metrics,
            max_request_timeout,
        }
    }

    /// Deadline from the client's `grpc-timeout`, capped by the server limit.
    fn request_context(&self, metadata: &MetadataMap) -> RequestContext {
        let client_timeout = metadata
            .get("grpc-timeout")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_grpc_timeout);

        let timeout = match client_timeout {
            Some(t) => client_budget(t).min(self.max_request_timeout),
            None => self.max_request_timeout,
        };
        RequestContext::with_timeout(timeout)
    }

    fn finish(&self, method: &str, code: &str, started: Instant) {
        self.metrics
            .record_request(method, code, started.elapsed().as_secs_f64());
    }
}

/// Largest slice of a client deadline kept back for answering.
const MAX_DEADLINE_MARGIN: Duration = Duration::from_millis(100);

/// Time the workflow may spend out of a client's `grpc-timeout`.
///
/// tonic's own timeout on the same header started when the request arrived,
/// before this handler ran. Ending the workflow a margin early (a tenth of the
/// budget, at most 100ms) leaves room to roll back and send the
/// `ORD_CANCELLED` envelope before tonic drops the call.
pub fn client_budget(client_timeout: Duration) -> Duration {
    let margin = (client_timeout / 10).min(MAX_DEADLINE_MARGIN);
    client_timeout.saturating_sub(margin)
}

/// Parse a `grpc-timeout` header value: up to 8 digits and a unit
/// (`H`, `M`, `S`, `m`, `u`, `n`).
pub fn parse_grpc_timeout(value: &str) -> Option<Duration> {
    if value.len() < 2 {
        return None;
    }
    let (digits, unit) = value.split_at(value.len() - 1);
    if digits.len() > 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let amount: u64 = digits.parse().ok()?;

    let timeout = match unit {
        "H" => Duration::from_secs(amount * 3600),
        "M" => Duration::from_secs(amount * 60),
        "S" => Duration::from_secs(amount),
        "m" => Duration::from_millis(amount),
        "u" => Duration::from_micros(amount),
        "n" => Duration::from_nanos(amount),
        _ => return None,
    };
    Some(timeout)
}

/// Log a failed call and turn it into `(message, code)` for the envelope.
fn failure(method: &str, err: &OrderError) -> (String, String) {
    match err {
        OrderError::InvalidInput(_)
        | OrderError::InvalidStatus(_)
        | OrderError::OrderNotFound(_) => {
            tracing::info!(method, code = err.code(), error = %err, "Request rejected");
        }
        OrderError::Cancelled => {
            tracing::warn!(method, code = err.code(), "Request cancelled by deadline");
        }
        _ => {
            tracing::error!(method, code = err.code(), error = ?err, "❌ Request failed");
        }
    }
    (err.public_message(), err.code().to_string())
}

fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

fn order_to_proto(order: &Order, items: &[OrderLineItem]) -> proto::Order {
    proto::Order {
        id: order.id,
        user_id: order.user_id,
        status: order.status.to_string(),
        total_amount: order.total_amount,
        items: items
            .iter()
            .map(|item| proto::OrderItem {
                id: item.id,
                product_id: item.product_id,
                quantity: item.quantity,
                price: item.price,
            })
            .collect(),
        created_at: format_timestamp(order.created_at),
        updated_at: format_timestamp(order.updated_at),
    }
}

#[tonic::async_trait]
impl OrderGrpcService for OrderGrpcHandler {
    async fn create_order(
        &self,
        request: Request<CreateOrderRequest>,
    ) -> Result<Response<CreateOrderResponse>, Status> {
        let started = Instant::now();
        let ctx = self.request_context(request.metadata());
        let req = request.into_inner();

        tracing::info!(
            user_id = req.user_id,
            items = req.items.len(),
            "📥 Received CreateOrder request"
        );

        let command = CreateOrder {
            user_id: req.user_id,
            total_amount: req.total_amount,
            items: req
                .items
                .into_iter()
                .map(|item| NewLineItem {
                    product_id: item.product_id,
                    quantity: item.quantity,
                    price: item.price,
                })
                .collect(),
        };

        let response = match self.service.create_order(&ctx, command).await {
            Ok(created) => CreateOrderResponse {
                success: true,
                message: "Order created successfully".to_string(),
                code: CODE_SUCCESS.to_string(),
                order: Some(order_to_proto(&created.order, &created.items)),
            },
            Err(err) => {
                let (message, code) = failure("CreateOrder", &err);
                CreateOrderResponse {
                    success: false,
                    message,
                    code,
                    order: None,
                }
            }
        };

        self.finish("CreateOrder", &response.code, started);
        Ok(Response::new(response))
    }

    async fn get_order(
        &self,
        request: Request<GetOrderRequest>,
    ) -> Result<Response<GetOrderResponse>, Status> {
        let started = Instant::now();
        let ctx = self.request_context(request.metadata());
        let req = request.into_inner();

        tracing::info!(order_id = req.id, "📥 Received GetOrder request");

        let response = match self.service.get_order(&ctx, req.id).await {
            Ok(found) => GetOrderResponse {
                success: true,
                message: "Order found".to_string(),
                code: CODE_SUCCESS.to_string(),
                order: Some(order_to_proto(&found.order, &found.items)),
            },
            Err(err) => {
                let (message, code) = failure("GetOrder", &err);
                GetOrderResponse {
                    success: false,
                    message,
                    code,
                    order: None,
                }
            }
        };

        self.finish("GetOrder", &response.code, started);
        Ok(Response::new(response))
    }

    async fn get_orders_by_user(
        &self,
        request: Request<GetOrdersByUserRequest>,
    ) -> Result<Response<GetOrdersByUserResponse>, Status> {
        let started = Instant::now();
        let ctx = self.request_context(request.metadata());
        let req = request.into_inner();

        tracing::info!(
            user_id = req.user_id,
            limit = req.limit,
            page = req.page,
            "📥 Received GetOrdersByUser request"
        );

        let response = match self
            .service
            .list_orders_by_user(&ctx, req.user_id, req.limit, req.page)
            .await
        {
            Ok(page) => GetOrdersByUserResponse {
                success: true,
                message: "Orders found".to_string(),
                code: CODE_SUCCESS.to_string(),
                data: Some(OrdersPage {
                    orders: page
                        .orders
                        .iter()
                        .map(|order| order_to_proto(order, &[]))
                        .collect(),
                    pagination: Some(Pagination {
                        total: page.total,
                        total_pages: page.total_pages,
                        limit: page.limit,
                        page: page.page,
                    }),
                }),
            },
            Err(err) => {
                let (message, code) = failure("GetOrdersByUser", &err);
                GetOrdersByUserResponse {
                    success: false,
                    message,
                    code,
                    data: None,
                }
            }
        };

        self.finish("GetOrdersByUser", &response.code, started);
        Ok(Response::new(response))
    }

    async fn update_order_status(
        &self,
        request: Request<UpdateOrderStatusRequest>,
    ) -> Result<Response<UpdateOrderStatusResponse>, Status> {
        let started = Instant::now();
        let ctx = self.request_context(request.metadata());
        let req = request.into_inner();

        tracing::info!(
            order_id = req.id,
            status = %req.status,
            "📥 Received UpdateOrderStatus request"
        );

        let response = match self
            .service
            .update_order_status(&ctx, req.id, &req.status)
            .await
        {
            Ok(order) => UpdateOrderStatusResponse {
                success: true,
                message: "Order status updated successfully".to_string(),
                code: CODE_SUCCESS.to_string(),
                order: Some(order_to_proto(&order, &[])),
            },
            Err(err) => {
                let (message, code) = failure("UpdateOrderStatus", &err);
                UpdateOrderStatusResponse {
                    success: false,
                    message,
                    code,
                    order: None,
                }
            }
        };

        self.finish("UpdateOrderStatus", &response.code, started);
        Ok(Response::new(response))
    }
}
