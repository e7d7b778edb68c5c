use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::value_objects::OrderStatus;
use crate::models::{Order, OrderLineItem};

// ============================================================================
// Order Events
// ============================================================================

/// Published once per order after its creation transaction has committed.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreatedEvent {
    pub order_id: i32,
    pub user_id: i32,
    pub status: OrderStatus,
    pub items: Vec<OrderCreatedItem>,
    pub total_amount: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreatedItem {
    pub product_id: i32,
    pub quantity: i32,
    pub price: f64,
}

impl OrderCreatedEvent {
    pub fn new(order: &Order, items: &[OrderLineItem]) -> Self {
        Self {
            order_id: order.id,
            user_id: order.user_id,
            status: order.status,
            items: items
                .iter()
                .map(|item| OrderCreatedItem {
                    product_id: item.product_id,
                    quantity: item.quantity,
                    price: item.price,
                })
                .collect(),
            total_amount: order.total_amount,
            timestamp: order.created_at.unwrap_or_else(Utc::now),
        }
    }

    /// Partition key: all events of one order land on the same partition.
    pub fn key(&self) -> String {
        self.order_id.to_string()
    }
}
