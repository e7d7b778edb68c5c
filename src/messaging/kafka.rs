use async_trait::async_trait;
use rdkafka::{
    config::ClientConfig,
    producer::{FutureProducer, FutureRecord, Producer},
    util::Timeout,
};
use std::time::Duration;

use super::{EventPublisher, MessagingError};
use crate::domain::order::OrderCreatedEvent;
use crate::utils::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError};

#[derive(Debug, Clone)]
pub struct KafkaPublisherConfig {
    pub brokers: String,
    pub client_id: String,
    /// Upper bound on waiting for the broker's acknowledgment.
    pub ack_timeout: Duration,
}

pub struct KafkaPublisher {
    producer: FutureProducer,
    ack_timeout: Duration,
    circuit_breaker: CircuitBreaker,
}

impl KafkaPublisher {
    pub fn new(config: &KafkaPublisherConfig) -> Result<Self, MessagingError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("client.id", &config.client_id)
            .set("acks", "all")
            .set("message.timeout.ms", config.ack_timeout.as_millis().to_string())
            .create()
            .map_err(|e| MessagingError::Client(e.to_string()))?;

        tracing::info!(brokers = %config.brokers, "✅ Kafka producer created");

        Ok(Self {
            producer,
            ack_timeout: config.ack_timeout,
            circuit_breaker: CircuitBreaker::new("kafka", CircuitBreakerConfig::default()),
        })
    }

    /// Wait for in-flight messages before shutdown.
    pub fn flush(&self, timeout: Duration) {
        match self.producer.flush(Timeout::After(timeout)) {
            Ok(()) => tracing::info!("Kafka producer flushed"),
            Err(e) => tracing::warn!(error = %e, "Kafka producer flush incomplete"),
        }
    }

    async fn send(&self, topic: &str, key: &str, payload: &[u8]) -> Result<(), MessagingError> {
        let record = FutureRecord::to(topic).key(key).payload(payload);

        let delivery = self.producer.send(record, Timeout::After(self.ack_timeout));
        match tokio::time::timeout(self.ack_timeout, delivery).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err((e, _))) => Err(MessagingError::Delivery(e.to_string())),
            Err(_) => Err(MessagingError::Timeout(self.ack_timeout)),
        }
    }
}

#[async_trait]
impl EventPublisher for KafkaPublisher {
    async fn publish(&self, topic: &str, event: &OrderCreatedEvent) -> Result<(), MessagingError> {
        let payload = serde_json::to_vec(event)?;
        let key = event.key();

        let result = self
            .circuit_breaker
            .call(self.send(topic, &key, &payload))
            .await;

        match result {
            Ok(()) => {
                tracing::info!(topic = %topic, key = %key, "📨 Published to Kafka");
                Ok(())
            }
            Err(CircuitBreakerError::Open) => {
                tracing::error!(topic = %topic, "Circuit breaker open - Kafka unavailable");
                Err(MessagingError::CircuitOpen)
            }
            Err(CircuitBreakerError::Inner(e)) => {
                tracing::error!(
                    error = %e,
                    topic = %topic,
                    breaker = ?self.circuit_breaker.state(),
                    "Failed to publish to Kafka"
                );
                Err(e)
            }
        }
    }
}
