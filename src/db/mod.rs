// ============================================================================
// Persistence Gateway
// ============================================================================
//
// Typed order/line-item queries and transaction scoping. No business rules
// live here; the workflow service is the only writer.
//
// - `OrderStore`: pooled reads, status updates, transaction begin
// - `OrderTransaction`: inserts scoped to one transaction; rolled back
//   unless `commit` completes
//
// ============================================================================

mod postgres;
#[cfg(test)]
pub mod memory;

use async_trait::async_trait;

use crate::context::RequestContext;
use crate::domain::order::{NewLineItem, OrderStatus};
use crate::models::{Order, OrderLineItem};

pub use postgres::PgOrderStore;

/// Connection pool snapshot for the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct PoolStatus {
    pub connections: u32,
    pub idle: usize,
    pub closed: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("row not found")]
    NotFound,

    #[error("store call cancelled by request deadline")]
    Cancelled,

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            other => StoreError::Database(other),
        }
    }
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn begin(&self, ctx: &RequestContext) -> Result<Box<dyn OrderTransaction>, StoreError>;

    async fn get_order_by_id(&self, ctx: &RequestContext, id: i32) -> Result<Order, StoreError>;

    /// Items in insertion order. An order without items yields an empty vec.
    async fn get_line_items_by_order_id(
        &self,
        ctx: &RequestContext,
        order_id: i32,
    ) -> Result<Vec<OrderLineItem>, StoreError>;

    /// Newest first: `created_at DESC, id DESC`.
    async fn get_orders_by_user_id(
        &self,
        ctx: &RequestContext,
        user_id: i32,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>, StoreError>;

    async fn count_orders_by_user_id(
        &self,
        ctx: &RequestContext,
        user_id: i32,
    ) -> Result<i64, StoreError>;

    /// Sets the status and bumps `updated_at`. `NotFound` if no row matches.
    async fn update_order_status(
        &self,
        ctx: &RequestContext,
        id: i32,
        status: OrderStatus,
    ) -> Result<Order, StoreError>;
}

#[async_trait]
pub trait OrderTransaction: Send {
    async fn create_order(
        &mut self,
        ctx: &RequestContext,
        user_id: i32,
        status: OrderStatus,
        total_amount: f64,
    ) -> Result<Order, StoreError>;

    async fn create_line_item(
        &mut self,
        ctx: &RequestContext,
        order_id: i32,
        item: &NewLineItem,
    ) -> Result<OrderLineItem, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
