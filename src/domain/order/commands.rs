use super::errors::OrderError;
use super::value_objects::NewLineItem;

// ============================================================================
// Order Commands
// ============================================================================

#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub user_id: i32,
    pub total_amount: f64,
    pub items: Vec<NewLineItem>,
}

impl CreateOrder {
    /// Reject anything the store would have to refuse, before a transaction
    /// is opened.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.user_id <= 0 {
            return Err(OrderError::InvalidInput(
                "userId must be a positive integer".to_string(),
            ));
        }
        if self.items.is_empty() {
            return Err(OrderError::InvalidInput(
                "order must contain at least one item".to_string(),
            ));
        }
        if !self.total_amount.is_finite() || self.total_amount < 0.0 {
            return Err(OrderError::InvalidInput(
                "totalAmount must be a non-negative number".to_string(),
            ));
        }

        for (index, item) in self.items.iter().enumerate() {
            let problem = if item.product_id <= 0 {
                "productId must be a positive integer"
            } else if item.quantity <= 0 {
                "quantity must be a positive integer"
            } else if !item.price.is_finite() || item.price < 0.0 {
                "price must be a non-negative number"
            } else {
                continue;
            };
            return Err(OrderError::InvalidInput(format!("item {index}: {problem}")));
        }

        Ok(())
    }
}

pub(crate) fn require_positive_id(name: &str, id: i32) -> Result<(), OrderError> {
    if id <= 0 {
        return Err(OrderError::InvalidInput(format!(
            "{name} must be a positive integer"
        )));
    }
    Ok(())
}
