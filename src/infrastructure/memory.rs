//! In-memory [`OrderStore`] for tests and local runs without Postgres.
//!
//! A transaction holds the store mutex for its whole duration and works on a
//! copy of the state that is swapped in only on success, which gives the same
//! serializable, all-or-nothing behaviour as the Postgres store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::events::OrderEvent;
use crate::domain::order::{Order, OrderStatus, OrderSummary};
use crate::domain::ports::{InventoryLedger, OrderStore, OrderWriter, UnitOfWork};
use crate::domain::product::{Product, ReservedStock};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    products: HashMap<Uuid, Product>,
    orders: Vec<Order>,
    events: Vec<OrderEvent>,
}

impl MemoryState {
    fn summaries(&self, keep: impl Fn(&Order) -> bool) -> Vec<OrderSummary> {
        // Newest insertion first, then a stable sort keeps that for equal dates.
        let mut summaries: Vec<OrderSummary> = self
            .orders
            .iter()
            .rev()
            .filter(|o| keep(*o))
            .map(OrderSummary::from)
            .collect();
        summaries.sort_by(|a, b| b.date.cmp(&a.date));
        summaries
    }
}

#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    state: Mutex<MemoryState>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let store = Self::new();
        for product in products {
            store.upsert_product(product);
        }
        store
    }

    /// Stands in for the catalog service writing a product.
    pub fn upsert_product(&self, product: Product) {
        if let Ok(mut state) = self.lock() {
            state.products.insert(product.id, product);
        }
    }

    pub fn product(&self, id: Uuid) -> Option<Product> {
        self.lock().ok()?.products.get(&id).cloned()
    }

    pub fn events(&self) -> Vec<OrderEvent> {
        self.lock()
            .map(|state| state.events.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, DomainError> {
        self.state
            .lock()
            .map_err(|_| DomainError::Persistence("in-memory store lock poisoned".to_string()))
    }
}

struct MemoryUnitOfWork<'a> {
    state: &'a mut MemoryState,
}

impl InventoryLedger for MemoryUnitOfWork<'_> {
    fn reserve(&mut self, product_id: Uuid, quantity: i32) -> Result<ReservedStock, DomainError> {
        let product = self
            .state
            .products
            .get_mut(&product_id)
            .ok_or(DomainError::ProductNotFound(product_id))?;

        if quantity > product.stock {
            return Err(DomainError::OutOfStock {
                product_id,
                product_name: product.name.clone(),
                available: product.stock,
            });
        }

        product.stock -= quantity;
        if product.stock <= 0 {
            product.is_archived = true;
        }

        Ok(ReservedStock {
            product_id,
            name: product.name.clone(),
            image_url: product.image_url.clone(),
            remaining: product.stock,
        })
    }

    fn release(&mut self, product_id: Uuid, quantity: i32) -> Result<(), DomainError> {
        match self.state.products.get_mut(&product_id) {
            Some(product) => {
                product.stock += quantity;
                product.is_archived = false;
            }
            None => log::warn!(
                "Product {} no longer exists, {} units not restocked",
                product_id,
                quantity
            ),
        }
        Ok(())
    }
}

impl OrderWriter for MemoryUnitOfWork<'_> {
    fn insert_order(&mut self, order: &Order) -> Result<(), DomainError> {
        self.state.orders.push(order.clone());
        Ok(())
    }

    fn lock_order(&mut self, id: Uuid) -> Result<Option<Order>, DomainError> {
        Ok(self.state.orders.iter().find(|o| o.id == id).cloned())
    }

    fn set_status(
        &mut self,
        id: Uuid,
        status: OrderStatus,
        delivery_date: Option<DateTime<Utc>>,
    ) -> Result<(), DomainError> {
        let order = self
            .state
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(DomainError::NotFound)?;
        order.status = status;
        order.delivery_date = delivery_date;
        Ok(())
    }

    fn append_event(&mut self, event: &OrderEvent) -> Result<(), DomainError> {
        self.state.events.push(event.clone());
        Ok(())
    }
}

impl OrderStore for InMemoryOrderStore {
    fn transaction<T, F>(&self, work: F) -> Result<T, DomainError>
    where
        F: FnOnce(&mut dyn UnitOfWork) -> Result<T, DomainError>,
    {
        let mut guard = self.lock()?;
        let mut working = guard.clone();
        let result = work(&mut MemoryUnitOfWork {
            state: &mut working,
        })?;
        *guard = working;
        Ok(result)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        Ok(self.lock()?.orders.iter().find(|o| o.id == id).cloned())
    }

    fn list_for_user(&self, user_id: Uuid) -> Result<Vec<OrderSummary>, DomainError> {
        Ok(self.lock()?.summaries(move |o| o.user_id == user_id))
    }

    fn list_all(&self) -> Result<Vec<OrderSummary>, DomainError> {
        Ok(self.lock()?.summaries(|_| true))
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;

    use super::*;

    fn widget(stock: i32) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: "Widget".to_string(),
            image_url: None,
            price: BigDecimal::from_str("2.50").unwrap(),
            stock,
            is_archived: false,
        }
    }

    #[test]
    fn failed_transaction_leaves_state_untouched() {
        let p = widget(4);
        let store = InMemoryOrderStore::with_products([p.clone()]);

        let result: Result<(), DomainError> = store.transaction(|uow| {
            uow.reserve(p.id, 3)?;
            uow.reserve(p.id, 3)?;
            Ok(())
        });

        assert!(matches!(
            result,
            Err(DomainError::OutOfStock { available: 1, .. })
        ));
        assert_eq!(store.product(p.id).unwrap().stock, 4);
    }

    #[test]
    fn reserving_everything_archives_and_release_restores() {
        let p = widget(2);
        let store = InMemoryOrderStore::with_products([p.clone()]);

        let reserved = store.transaction(|uow| uow.reserve(p.id, 2)).unwrap();
        assert_eq!(reserved.remaining, 0);
        assert!(store.product(p.id).unwrap().is_archived);

        store.transaction(|uow| uow.release(p.id, 1)).unwrap();
        let after = store.product(p.id).unwrap();
        assert_eq!(after.stock, 1);
        assert!(!after.is_archived);
    }

    #[test]
    fn releasing_a_deleted_product_is_not_an_error() {
        let store = InMemoryOrderStore::new();
        assert!(store
            .transaction(|uow| uow.release(Uuid::new_v4(), 3))
            .is_ok());
    }
}
