use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{Order, OrderItem, OrderSummary, ShippingInfo};
use crate::schema::{order_items, order_outbox, orders, products};

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub image_url: Option<String>,
    pub price: BigDecimal,
    pub stock: i32,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = products)]
pub struct NewProductRow {
    pub id: Uuid,
    pub name: String,
    pub image_url: Option<String>,
    pub price: BigDecimal,
    pub stock: i32,
    pub is_archived: bool,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub total: BigDecimal,
    pub estimated_delivery_date: NaiveDate,
    pub delivery_date: Option<DateTime<Utc>>,
    pub shipping_first_name: String,
    pub shipping_last_name: String,
    pub shipping_email: String,
    pub shipping_address: String,
    pub shipping_city: String,
    pub shipping_postal_code: String,
    pub shipping_country: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrderRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub total: BigDecimal,
    pub estimated_delivery_date: NaiveDate,
    pub delivery_date: Option<DateTime<Utc>>,
    pub shipping_first_name: String,
    pub shipping_last_name: String,
    pub shipping_email: String,
    pub shipping_address: String,
    pub shipping_city: String,
    pub shipping_postal_code: String,
    pub shipping_country: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = order_items)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub position: i32,
    pub product_id: Uuid,
    pub name: String,
    pub image_url: Option<String>,
    pub quantity: i32,
    pub price: BigDecimal,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_items)]
pub struct NewOrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub position: i32,
    pub product_id: Uuid,
    pub name: String,
    pub image_url: Option<String>,
    pub quantity: i32,
    pub price: BigDecimal,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = order_outbox)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OutboxEventRow {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_outbox)]
pub struct NewOutboxEventRow {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub payload: Value,
}

// ── Row <-> domain mapping ───────────────────────────────────────────────────

impl NewOrderRow {
    pub fn from_order(order: &Order) -> Self {
        let shipping = &order.shipping_info;
        Self {
            id: order.id,
            user_id: order.user_id,
            status: order.status.as_str().to_string(),
            total: order.total.clone(),
            estimated_delivery_date: order.estimated_delivery_date,
            delivery_date: order.delivery_date,
            shipping_first_name: shipping.first_name.clone(),
            shipping_last_name: shipping.last_name.clone(),
            shipping_email: shipping.email.clone(),
            shipping_address: shipping.address.clone(),
            shipping_city: shipping.city.clone(),
            shipping_postal_code: shipping.postal_code.clone(),
            shipping_country: shipping.country.clone(),
            created_at: order.date,
            updated_at: order.date,
        }
    }
}

impl NewOrderItemRow {
    pub fn from_item(order_id: Uuid, position: usize, item: &OrderItem) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            position: position as i32,
            product_id: item.product_id,
            name: item.name.clone(),
            image_url: item.image_url.clone(),
            quantity: item.quantity,
            price: item.price.clone(),
        }
    }
}

impl OrderRow {
    fn shipping_info(&self) -> ShippingInfo {
        ShippingInfo {
            first_name: self.shipping_first_name.clone(),
            last_name: self.shipping_last_name.clone(),
            email: self.shipping_email.clone(),
            address: self.shipping_address.clone(),
            city: self.shipping_city.clone(),
            postal_code: self.shipping_postal_code.clone(),
            country: self.shipping_country.clone(),
        }
    }

    /// `items` must already be sorted by position.
    pub fn into_order(self, items: Vec<OrderItemRow>) -> Result<Order, DomainError> {
        Ok(Order {
            id: self.id,
            user_id: self.user_id,
            date: self.created_at,
            estimated_delivery_date: self.estimated_delivery_date,
            delivery_date: self.delivery_date,
            total: self.total.clone(),
            status: self.status.parse()?,
            shipping_info: self.shipping_info(),
            items: items
                .into_iter()
                .map(|i| OrderItem {
                    product_id: i.product_id,
                    name: i.name,
                    image_url: i.image_url,
                    quantity: i.quantity,
                    price: i.price,
                })
                .collect(),
        })
    }

    pub fn into_summary(self) -> Result<OrderSummary, DomainError> {
        Ok(OrderSummary {
            id: self.id,
            user_id: self.user_id,
            date: self.created_at,
            estimated_delivery_date: self.estimated_delivery_date,
            status: self.status.parse()?,
            purchaser_name: self.shipping_info().purchaser_name(),
            total: self.total,
        })
    }
}
