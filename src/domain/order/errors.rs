use crate::db::StoreError;
use crate::messaging::MessagingError;

// ============================================================================
// Order Workflow Errors
// ============================================================================

pub const CODE_SUCCESS: &str = "SUCCESS";
pub const CODE_UNKNOWN: &str = "ORD_UNKNOWN";
pub const CODE_ORDER_NOT_FOUND: &str = "ORD_ORDER_NOT_FOUND";
pub const CODE_ORDER_CREATE_FAILED: &str = "ORD_CREATE_FAILED";
pub const CODE_ORDER_UPDATE_FAILED: &str = "ORD_UPDATE_FAILED";
pub const CODE_INVALID_INPUT: &str = "ORD_INVALID_INPUT";
pub const CODE_INVALID_STATUS: &str = "ORD_INVALID_STATUS";
pub const CODE_DATABASE_ERROR: &str = "ORD_DATABASE_ERROR";
pub const CODE_KAFKA_ERROR: &str = "ORD_KAFKA_ERROR";
pub const CODE_CANCELLED: &str = "ORD_CANCELLED";

pub const DEFAULT_ERROR_MESSAGE: &str = "an unexpected error occurred";

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid order status: {0:?}")]
    InvalidStatus(String),

    #[error("order not found: {0}")]
    OrderNotFound(i32),

    #[error("failed to create order: {0}")]
    OrderCreateFailed(#[source] StoreError),

    #[error("failed to update order: {0}")]
    OrderUpdateFailed(#[source] StoreError),

    #[error("database error: {0}")]
    Database(#[source] StoreError),

    #[error("messaging error: {0}")]
    Messaging(#[from] MessagingError),

    #[error("operation cancelled")]
    Cancelled,

    #[error("unexpected error: {0}")]
    Unknown(String),
}

impl OrderError {
    /// Machine-readable code carried in response envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            OrderError::InvalidInput(_) => CODE_INVALID_INPUT,
            OrderError::InvalidStatus(_) => CODE_INVALID_STATUS,
            OrderError::OrderNotFound(_) => CODE_ORDER_NOT_FOUND,
            OrderError::OrderCreateFailed(_) => CODE_ORDER_CREATE_FAILED,
            OrderError::OrderUpdateFailed(_) => CODE_ORDER_UPDATE_FAILED,
            OrderError::Database(_) => CODE_DATABASE_ERROR,
            OrderError::Messaging(_) => CODE_KAFKA_ERROR,
            OrderError::Cancelled => CODE_CANCELLED,
            OrderError::Unknown(_) => CODE_UNKNOWN,
        }
    }

    /// Message safe to return to callers. Store and broker details stay in
    /// the logs.
    pub fn public_message(&self) -> String {
        match self {
            OrderError::InvalidInput(reason) => format!("invalid input: {reason}"),
            OrderError::InvalidStatus(status) => format!("invalid order status: {status}"),
            OrderError::OrderNotFound(_) => "order not found".to_string(),
            OrderError::OrderCreateFailed(_) => "failed to create order".to_string(),
            OrderError::OrderUpdateFailed(_) => "failed to update order".to_string(),
            OrderError::Database(_) => "database error".to_string(),
            OrderError::Messaging(_) => "kafka error".to_string(),
            OrderError::Cancelled => "operation cancelled".to_string(),
            OrderError::Unknown(_) => DEFAULT_ERROR_MESSAGE.to_string(),
        }
    }

    /// Classify a store failure. `Cancelled` and `Corrupt` keep their own
    /// kinds; everything else gets the caller's kind.
    pub(crate) fn from_store(err: StoreError, kind: fn(StoreError) -> OrderError) -> Self {
        match err {
            StoreError::Cancelled => OrderError::Cancelled,
            StoreError::Corrupt(detail) => OrderError::Unknown(detail),
            other => kind(other),
        }
    }
}
