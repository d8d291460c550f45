use std::fmt;
use std::str::FromStr;

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use super::errors::DomainError;
use super::product::ReservedStock;

// ── Status state machine ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    // Position along the fulfilment path; Cancelled sits outside it.
    fn progress(self) -> Option<u8> {
        match self {
            OrderStatus::Processing => Some(0),
            OrderStatus::Shipped => Some(1),
            OrderStatus::Delivered => Some(2),
            OrderStatus::Cancelled => None,
        }
    }

    /// Customers may only cancel an order that has not left the warehouse.
    pub fn cancel_by_customer(self) -> Result<OrderStatus, DomainError> {
        match self {
            OrderStatus::Processing => Ok(OrderStatus::Cancelled),
            from => Err(DomainError::InvalidTransition {
                from,
                to: OrderStatus::Cancelled,
            }),
        }
    }

    /// Administrative transition: forward along Processing → Shipped →
    /// Delivered, or straight to Cancelled from any non-terminal state.
    pub fn transition_by_admin(self, to: OrderStatus) -> Result<OrderStatus, DomainError> {
        let allowed = !self.is_terminal()
            && match (self.progress(), to.progress()) {
                (_, None) => true,
                (Some(from), Some(target)) => target > from,
                (None, Some(_)) => false,
            };

        if allowed {
            Ok(to)
        } else {
            Err(DomainError::InvalidTransition { from: self, to })
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" | "canceled" => Ok(OrderStatus::Cancelled),
            other => Err(DomainError::InvalidInput(format!(
                "unknown order status '{other}'"
            ))),
        }
    }
}

// ── Cart and shipping snapshot ───────────────────────────────────────────────

/// One line of the client-held cart, with the unit price captured when the
/// product was added.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

impl CartLine {
    pub fn subtotal(&self) -> BigDecimal {
        &self.unit_price * BigDecimal::from(self.quantity)
    }
}

/// Rejects carts before any stock is touched.
pub fn validate_cart(lines: &[CartLine]) -> Result<(), DomainError> {
    if lines.is_empty() {
        return Err(DomainError::EmptyCart);
    }
    for line in lines {
        if line.quantity <= 0 {
            return Err(DomainError::InvalidInput(format!(
                "quantity for product {} must be positive",
                line.product_id
            )));
        }
        check_amount("price", &line.unit_price)?;
        if line.unit_price < BigDecimal::zero() {
            return Err(DomainError::InvalidInput(format!(
                "price for product {} must not be negative",
                line.product_id
            )));
        }
    }
    Ok(())
}

/// Most decimal places a money amount may carry.
pub const MAX_AMOUNT_SCALE: i64 = 2;
/// Exclusive upper bound on any single money amount.
pub const MAX_AMOUNT: i64 = 1_000_000_000;

/// Rejects amounts with more than two decimal places or of absurd size.
///
/// The scale is checked before any arithmetic, so inputs like `1e-20000` or
/// `1e999999999` are refused without being expanded.
pub fn check_amount(field: &str, amount: &BigDecimal) -> Result<(), DomainError> {
    let (_, scale) = amount.as_bigint_and_exponent();
    if scale > MAX_AMOUNT_SCALE {
        return Err(DomainError::InvalidInput(format!(
            "{field} may have at most {MAX_AMOUNT_SCALE} decimal places"
        )));
    }
    // Negative scales come from exponent notation; 10^9 has scale -9 at most.
    if scale < -9 || amount.abs() >= BigDecimal::from(MAX_AMOUNT) {
        return Err(DomainError::InvalidInput(format!(
            "{field} must be below {MAX_AMOUNT}"
        )));
    }
    Ok(())
}

pub fn cart_total(lines: &[CartLine]) -> BigDecimal {
    lines
        .iter()
        .fold(BigDecimal::zero(), |acc, line| acc + line.subtotal())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

impl ShippingInfo {
    pub fn purchaser_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        // Column widths of the orders table.
        let limits = [
            ("firstName", &self.first_name, 100),
            ("lastName", &self.last_name, 100),
            ("email", &self.email, 255),
            ("city", &self.city, 100),
            ("postalCode", &self.postal_code, 20),
            ("country", &self.country, 100),
        ];
        let required = [
            ("firstName", &self.first_name),
            ("lastName", &self.last_name),
            ("email", &self.email),
            ("address", &self.address),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(DomainError::InvalidInput(format!(
                "shipping {field} is required"
            )));
        }
        if let Some((field, _, max)) = limits
            .iter()
            .find(|(_, v, max)| v.chars().count() > *max)
        {
            return Err(DomainError::InvalidInput(format!(
                "shipping {field} must be at most {max} characters"
            )));
        }
        if !self.email.contains('@') {
            return Err(DomainError::InvalidInput(
                "shipping email is not valid".to_string(),
            ));
        }
        Ok(())
    }
}

// ── Order aggregate ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub product_id: Uuid,
    pub name: String,
    pub image_url: Option<String>,
    pub quantity: i32,
    /// Unit price at the time of purchase.
    pub price: BigDecimal,
}

impl OrderItem {
    pub fn subtotal(&self) -> BigDecimal {
        &self.price * BigDecimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: DateTime<Utc>,
    pub estimated_delivery_date: NaiveDate,
    pub delivery_date: Option<DateTime<Utc>>,
    pub total: BigDecimal,
    pub status: OrderStatus,
    pub shipping_info: ShippingInfo,
    pub items: Vec<OrderItem>,
}

/// Read-side projection used by order listings.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: DateTime<Utc>,
    pub estimated_delivery_date: NaiveDate,
    pub total: BigDecimal,
    pub status: OrderStatus,
    pub purchaser_name: String,
}

impl From<&Order> for OrderSummary {
    fn from(order: &Order) -> Self {
        OrderSummary {
            id: order.id,
            user_id: order.user_id,
            date: order.date,
            estimated_delivery_date: order.estimated_delivery_date,
            total: order.total.clone(),
            status: order.status,
            purchaser_name: order.shipping_info.purchaser_name(),
        }
    }
}

/// Assembles an immutable [`Order`] from reserved cart lines.
///
/// Each item copies the product name and image from the reservation and the
/// unit price from the cart line, so later product edits never reach the
/// order. The total is fixed here and never recomputed.
#[derive(Debug)]
pub struct OrderBuilder {
    user_id: Uuid,
    placed_at: DateTime<Utc>,
    estimated_delivery_date: NaiveDate,
    shipping_info: ShippingInfo,
    items: Vec<OrderItem>,
}

impl OrderBuilder {
    pub fn new(
        user_id: Uuid,
        shipping_info: ShippingInfo,
        placed_at: DateTime<Utc>,
        estimated_delivery_date: NaiveDate,
    ) -> Self {
        Self {
            user_id,
            placed_at,
            estimated_delivery_date,
            shipping_info,
            items: Vec::new(),
        }
    }

    pub fn line(&mut self, line: &CartLine, stock: &ReservedStock) -> &mut Self {
        self.items.push(OrderItem {
            product_id: line.product_id,
            name: stock.name.clone(),
            image_url: stock.image_url.clone(),
            quantity: line.quantity,
            price: line.unit_price.clone(),
        });
        self
    }

    pub fn build(self) -> Result<Order, DomainError> {
        if self.items.is_empty() {
            return Err(DomainError::EmptyCart);
        }
        let total = self
            .items
            .iter()
            .fold(BigDecimal::zero(), |acc, item| acc + item.subtotal());

        Ok(Order {
            id: Uuid::new_v4(),
            user_id: self.user_id,
            date: self.placed_at,
            estimated_delivery_date: self.estimated_delivery_date,
            delivery_date: None,
            total,
            status: OrderStatus::Processing,
            shipping_info: self.shipping_info,
            items: self.items,
        })
    }
}
