use std::sync::Arc;
use std::time::Duration;

use super::commands::{require_positive_id, CreateOrder};
use super::errors::OrderError;
use super::events::OrderCreatedEvent;
use super::value_objects::OrderStatus;
use crate::context::RequestContext;
use crate::db::{OrderStore, OrderTransaction, StoreError};
use crate::messaging::{EventPublisher, MessagingError};
use crate::metrics::Metrics;
use crate::models::{Order, OrderLineItem, OrderPage, OrderWithItems};

// ============================================================================
// Order Workflow Service
// ============================================================================
//
// Validation → transaction (order + items) → commit → best-effort publish.
//
// The publish step sits outside the consistency boundary: it is spawned after
// the commit with its own timeout and the response does not wait for it. Its
// failure is logged and counted but never reported to the caller. Consumers may therefore miss
// an order.created event; they never see one for an uncommitted order.
//
// ============================================================================

pub const DEFAULT_PAGE_LIMIT: i64 = 10;
pub const DEFAULT_PAGE: i64 = 1;

#[derive(Debug, Clone)]
pub struct OrderServiceConfig {
    pub order_created_topic: String,
    pub publish_timeout: Duration,
}

impl Default for OrderServiceConfig {
    fn default() -> Self {
        Self {
            order_created_topic: "order.created".to_string(),
            publish_timeout: Duration::from_secs(15),
        }
    }
}

pub struct OrderService {
    store: Arc<dyn OrderStore>,
    publisher: Arc<dyn EventPublisher>,
    metrics: Arc<Metrics>,
    config: OrderServiceConfig,
}

impl OrderService {
    pub fn new(
        store: Arc<dyn OrderStore>,
        publisher: Arc<dyn EventPublisher>,
        metrics: Arc<Metrics>,
        config: OrderServiceConfig,
    ) -> Self {
        Self {
            store,
            publisher,
            metrics,
            config,
        }
    }

    pub async fn create_order(
        &self,
        ctx: &RequestContext,
        command: CreateOrder,
    ) -> Result<OrderWithItems, OrderError> {
        command.validate()?;

        let mut tx = self
            .store
            .begin(ctx)
            .await
            .map_err(|e| OrderError::from_store(e, OrderError::Database))?;

        let (order, items) = match write_order(tx.as_mut(), ctx, &command).await {
            Ok(written) => written,
            Err(err) => {
                rollback(tx).await;
                return Err(err);
            }
        };

        if ctx.is_expired() {
            rollback(tx).await;
            return Err(OrderError::Cancelled);
        }

        tx.commit()
            .await
            .map_err(|e| OrderError::from_store(e, OrderError::Database))?;

        self.metrics.orders_created_total.inc();
        tracing::info!(
            order_id = order.id,
            user_id = order.user_id,
            items = items.len(),
            "✅ Order created"
        );

        self.emit_order_created(OrderCreatedEvent::new(&order, &items));

        Ok(OrderWithItems { order, items })
    }

    pub async fn get_order(
        &self,
        ctx: &RequestContext,
        order_id: i32,
    ) -> Result<OrderWithItems, OrderError> {
        require_positive_id("orderId", order_id)?;

        let order = self
            .store
            .get_order_by_id(ctx, order_id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => OrderError::OrderNotFound(order_id),
                other => OrderError::from_store(other, OrderError::Database),
            })?;

        let items = self
            .store
            .get_line_items_by_order_id(ctx, order_id)
            .await
            .map_err(|e| OrderError::from_store(e, OrderError::Database))?;

        Ok(OrderWithItems { order, items })
    }

    /// Non-positive `limit`/`page` fall back to 10 and 1. Pages are newest
    /// first.
    pub async fn list_orders_by_user(
        &self,
        ctx: &RequestContext,
        user_id: i32,
        limit: i32,
        page: i32,
    ) -> Result<OrderPage, OrderError> {
        require_positive_id("userId", user_id)?;

        let limit = if limit > 0 { i64::from(limit) } else { DEFAULT_PAGE_LIMIT };
        let page = if page > 0 { i64::from(page) } else { DEFAULT_PAGE };
        let offset = (page - 1).saturating_mul(limit);

        let orders = self
            .store
            .get_orders_by_user_id(ctx, user_id, limit, offset)
            .await
            .map_err(|e| OrderError::from_store(e, OrderError::Database))?;

        let total = self
            .store
            .count_orders_by_user_id(ctx, user_id)
            .await
            .map_err(|e| OrderError::from_store(e, OrderError::Database))?;

        Ok(OrderPage {
            orders,
            total,
            total_pages: total_pages(total, limit),
            limit,
            page,
        })
    }

    pub async fn update_order_status(
        &self,
        ctx: &RequestContext,
        order_id: i32,
        status: &str,
    ) -> Result<Order, OrderError> {
        require_positive_id("orderId", order_id)?;

        let status: OrderStatus = status
            .parse()
            .map_err(|_| OrderError::InvalidStatus(status.to_string()))?;

        let order = self
            .store
            .update_order_status(ctx, order_id, status)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => OrderError::OrderNotFound(order_id),
                other => OrderError::from_store(other, OrderError::OrderUpdateFailed),
            })?;

        tracing::info!(order_id, status = %order.status, "Order status updated");
        Ok(order)
    }

    /// Publish on a detached task and return at once. The task owns its
    /// timeout, logging and metrics; the response never waits on the broker.
    fn emit_order_created(&self, event: OrderCreatedEvent) {
        let publisher = Arc::clone(&self.publisher);
        let metrics = Arc::clone(&self.metrics);
        let topic = self.config.order_created_topic.clone();
        let timeout = self.config.publish_timeout;

        tokio::spawn(async move {
            let order_id = event.order_id;
            let outcome = tokio::time::timeout(timeout, publisher.publish(&topic, &event))
                .await
                .unwrap_or(Err(MessagingError::Timeout(timeout)));

            metrics.record_publish(outcome.is_ok());
            match outcome {
                Ok(()) => tracing::debug!(order_id, topic = %topic, "📨 Emitted order.created event"),
                Err(e) => {
                    let err = OrderError::from(e);
                    tracing::warn!(
                        order_id,
                        code = err.code(),
                        error = %err,
                        "⚠️ Failed to emit order.created event; order stays committed"
                    );
                }
            }
        });
    }
}

async fn write_order(
    tx: &mut dyn OrderTransaction,
    ctx: &RequestContext,
    command: &CreateOrder,
) -> Result<(Order, Vec<OrderLineItem>), OrderError> {
    let order = tx
        .create_order(ctx, command.user_id, OrderStatus::Pending, command.total_amount)
        .await
        .map_err(|e| OrderError::from_store(e, OrderError::OrderCreateFailed))?;

    let mut items = Vec::with_capacity(command.items.len());
    for (index, item) in command.items.iter().enumerate() {
        let created = tx
            .create_line_item(ctx, order.id, item)
            .await
            .map_err(|e| {
                tracing::warn!(order_id = order.id, index, error = %e, "Line item insert failed");
                OrderError::from_store(e, OrderError::OrderCreateFailed)
            })?;
        items.push(created);
    }

    Ok((order, items))
}

async fn rollback(tx: Box<dyn OrderTransaction>) {
    if let Err(e) = tx.rollback().await {
        tracing::warn!(error = %e, "Rollback failed; connection will discard the transaction");
    }
}

fn total_pages(total: i64, limit: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    (total + limit - 1) / limit
}
