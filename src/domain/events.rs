use serde_json::{json, Value};
use uuid::Uuid;

use super::order::{Order, OrderStatus};

pub const AGGREGATE_TYPE: &str = "Order";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderEventType {
    OrderPlaced,
    OrderCancelled,
    OrderStatusChanged,
}

impl OrderEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderEventType::OrderPlaced => "OrderPlaced",
            OrderEventType::OrderCancelled => "OrderCancelled",
            OrderEventType::OrderStatusChanged => "OrderStatusChanged",
        }
    }
}

/// Lifecycle event recorded in the outbox in the same transaction as the
/// change it describes.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderEvent {
    pub order_id: Uuid,
    pub event_type: OrderEventType,
    pub payload: Value,
}

impl OrderEvent {
    pub fn placed(order: &Order) -> Self {
        let lines: Vec<Value> = order
            .items
            .iter()
            .map(|item| {
                json!({
                    "product_id": item.product_id,
                    "quantity": item.quantity,
                    "price": item.price.to_string()
                })
            })
            .collect();

        Self {
            order_id: order.id,
            event_type: OrderEventType::OrderPlaced,
            payload: json!({
                "order_id": order.id,
                "user_id": order.user_id,
                "status": order.status.as_str(),
                "total": order.total.to_string(),
                "email": order.shipping_info.email,
                "estimated_delivery_date": order.estimated_delivery_date.to_string(),
                "lines": lines
            }),
        }
    }

    pub fn cancelled(order: &Order, cancelled_by: Uuid) -> Self {
        Self {
            order_id: order.id,
            event_type: OrderEventType::OrderCancelled,
            payload: json!({
                "order_id": order.id,
                "user_id": order.user_id,
                "cancelled_by": cancelled_by,
                "status": OrderStatus::Cancelled.as_str()
            }),
        }
    }

    pub fn status_changed(order: &Order, from: OrderStatus) -> Self {
        Self {
            order_id: order.id,
            event_type: OrderEventType::OrderStatusChanged,
            payload: json!({
                "order_id": order.id,
                "user_id": order.user_id,
                "from": from.as_str(),
                "status": order.status.as_str()
            }),
        }
    }
}
