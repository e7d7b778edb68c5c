mod kafka;

use async_trait::async_trait;

use crate::domain::order::OrderCreatedEvent;

pub use kafka::{KafkaPublisher, KafkaPublisherConfig};

#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    #[error("failed to create producer: {0}")]
    Client(String),

    #[error("failed to serialize event: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("no acknowledgment within {0:?}")]
    Timeout(std::time::Duration),

    #[error("circuit breaker open, broker unavailable")]
    CircuitOpen,
}

/// Best-effort publication of order events. Failures are returned to the
/// caller to log; they never undo the write that produced the event.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &str, event: &OrderCreatedEvent) -> Result<(), MessagingError>;
}
