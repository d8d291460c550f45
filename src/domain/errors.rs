use thiserror::Error;
use uuid::Uuid;

use super::order::OrderStatus;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Cart is empty")]
    EmptyCart,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Not enough stock for {product_name}. Only {available} left.")]
    OutOfStock {
        product_id: Uuid,
        product_name: String,
        available: i32,
    },
    #[error("Product {0} not found")]
    ProductNotFound(Uuid),
    #[error("Order not found")]
    NotFound,
    #[error("Not authorized")]
    NotAuthorized,
    #[error("Admin access required")]
    Forbidden,
    #[error("Cannot change order status from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl DomainError {
    /// True for failures raised by the inventory ledger while reserving stock.
    pub fn is_stock_error(&self) -> bool {
        matches!(
            self,
            DomainError::OutOfStock { .. } | DomainError::ProductNotFound(_)
        )
    }
}
