use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;
use super::events::OrderEvent;
use super::order::{Order, OrderStatus, OrderSummary};
use super::product::ReservedStock;

/// Per-product stock counters. Both operations run inside the caller's
/// transaction and are the only ways stock changes.
pub trait InventoryLedger {
    /// Atomically checks `stock >= quantity` and decrements it, archiving the
    /// product when it runs out.
    fn reserve(&mut self, product_id: Uuid, quantity: i32) -> Result<ReservedStock, DomainError>;

    /// Returns `quantity` to stock and makes the product visible again.
    fn release(&mut self, product_id: Uuid, quantity: i32) -> Result<(), DomainError>;
}

/// Transactional writes to order records and their outbox.
pub trait OrderWriter {
    fn insert_order(&mut self, order: &Order) -> Result<(), DomainError>;

    /// Loads an order and holds it exclusively until the transaction ends.
    fn lock_order(&mut self, id: Uuid) -> Result<Option<Order>, DomainError>;

    fn set_status(
        &mut self,
        id: Uuid,
        status: OrderStatus,
        delivery_date: Option<DateTime<Utc>>,
    ) -> Result<(), DomainError>;

    fn append_event(&mut self, event: &OrderEvent) -> Result<(), DomainError>;
}

/// Everything reachable from inside one store transaction.
pub trait UnitOfWork: InventoryLedger + OrderWriter {}

impl<T: InventoryLedger + OrderWriter> UnitOfWork for T {}

pub trait OrderStore: Send + Sync + 'static {
    /// Runs `work` in a single transaction. Any error rolls back every write
    /// made through the unit of work, stock reservations included.
    fn transaction<T, F>(&self, work: F) -> Result<T, DomainError>
    where
        F: FnOnce(&mut dyn UnitOfWork) -> Result<T, DomainError>;

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError>;

    /// Orders owned by `user_id`, most recent first.
    fn list_for_user(&self, user_id: Uuid) -> Result<Vec<OrderSummary>, DomainError>;

    /// All orders, most recent first.
    fn list_all(&self) -> Result<Vec<OrderSummary>, DomainError>;
}
