use chrono::{DateTime, SubsecRound, Utc};
use uuid::Uuid;

use crate::domain::delivery::DeliveryEstimator;
use crate::domain::errors::DomainError;
use crate::domain::events::OrderEvent;
use crate::domain::order::{
    validate_cart, CartLine, Order, OrderBuilder, OrderStatus, OrderSummary, ShippingInfo,
};
use crate::domain::ports::{InventoryLedger, OrderStore};
use crate::domain::principal::Principal;
use crate::domain::product::ReservedStock;

/// Order use cases as seen by the HTTP layer.
pub trait OrderOperations: Send + Sync {
    /// Reserves stock for every cart line and records the order, all or
    /// nothing.
    fn place_order(
        &self,
        user_id: Uuid,
        lines: Vec<CartLine>,
        shipping_info: ShippingInfo,
    ) -> Result<Order, DomainError>;

    /// Cancels a `Processing` order on behalf of its owner (or an admin) and
    /// returns its items to stock.
    fn cancel_order(&self, order_id: Uuid, requester: &Principal) -> Result<Order, DomainError>;

    /// Admin-only status change. Stamps the delivery date on `Delivered`.
    fn update_status(
        &self,
        order_id: Uuid,
        status: OrderStatus,
        requester: &Principal,
    ) -> Result<Order, DomainError>;

    fn get_orders_for_user(&self, user_id: Uuid) -> Result<Vec<OrderSummary>, DomainError>;

    fn get_order_detail(&self, order_id: Uuid, requester: &Principal)
        -> Result<Order, DomainError>;

    fn get_all_orders(&self, requester: &Principal) -> Result<Vec<OrderSummary>, DomainError>;
}

pub struct OrderService<S> {
    store: S,
    estimator: DeliveryEstimator,
}

impl<S: OrderStore> OrderService<S> {
    pub fn new(store: S, estimator: DeliveryEstimator) -> Self {
        Self { store, estimator }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

// Postgres keeps microseconds; trimming here keeps returned and stored
// orders identical.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Reserves every line, taking products in ascending id order so that two
/// transactions sharing products lock them in the same sequence. The result
/// is in cart order.
fn reserve_lines<L>(ledger: &mut L, lines: &[CartLine]) -> Result<Vec<ReservedStock>, DomainError>
where
    L: InventoryLedger + ?Sized,
{
    let mut lock_order: Vec<usize> = (0..lines.len()).collect();
    lock_order.sort_by_key(|&i| lines[i].product_id);

    let mut reserved: Vec<Option<ReservedStock>> = vec![None; lines.len()];
    for i in lock_order {
        let line = &lines[i];
        reserved[i] = Some(ledger.reserve(line.product_id, line.quantity)?);
    }
    Ok(reserved.into_iter().flatten().collect())
}

impl<S: OrderStore> OrderOperations for OrderService<S> {
    fn place_order(
        &self,
        user_id: Uuid,
        lines: Vec<CartLine>,
        shipping_info: ShippingInfo,
    ) -> Result<Order, DomainError> {
        validate_cart(&lines)?;
        shipping_info.validate()?;

        let placed_at = now();
        let estimated_delivery_date = self.estimator.estimate(placed_at.date_naive());

        let result = self.store.transaction(|uow| {
            let reserved = reserve_lines(uow, &lines)?;

            let mut builder =
                OrderBuilder::new(user_id, shipping_info, placed_at, estimated_delivery_date);
            for (line, stock) in lines.iter().zip(&reserved) {
                builder.line(line, stock);
            }
            let order = builder.build()?;

            uow.insert_order(&order)?;
            uow.append_event(&OrderEvent::placed(&order))?;
            Ok(order)
        });

        match &result {
            Ok(order) => log::info!(
                "Order {} placed by {} ({} items, total {})",
                order.id,
                user_id,
                order.items.len(),
                order.total
            ),
            Err(e) if e.is_stock_error() => {
                log::warn!("Order placement by {} rejected: {}", user_id, e)
            }
            Err(e) => log::error!("Order placement by {} failed: {}", user_id, e),
        }
        result
    }

    fn cancel_order(&self, order_id: Uuid, requester: &Principal) -> Result<Order, DomainError> {
        let order = self.store.transaction(|uow| {
            let mut order = uow.lock_order(order_id)?.ok_or(DomainError::NotFound)?;
            if !requester.can_access(order.user_id) {
                return Err(DomainError::NotAuthorized);
            }

            order.status = order.status.cancel_by_customer()?;
            uow.set_status(order.id, order.status, order.delivery_date)?;

            let mut restock: Vec<_> = order
                .items
                .iter()
                .map(|item| (item.product_id, item.quantity))
                .collect();
            restock.sort_by_key(|(product_id, _)| *product_id);
            for (product_id, quantity) in restock {
                uow.release(product_id, quantity)?;
            }

            uow.append_event(&OrderEvent::cancelled(&order, requester.user_id))?;
            Ok(order)
        })?;

        log::info!("Order {} cancelled by {}", order.id, requester.user_id);
        Ok(order)
    }

    fn update_status(
        &self,
        order_id: Uuid,
        status: OrderStatus,
        requester: &Principal,
    ) -> Result<Order, DomainError> {
        if !requester.is_admin() {
            return Err(DomainError::Forbidden);
        }

        let (order, from) = self.store.transaction(|uow| {
            let mut order = uow.lock_order(order_id)?.ok_or(DomainError::NotFound)?;
            let from = order.status;

            order.status = from.transition_by_admin(status)?;
            if order.status == OrderStatus::Delivered {
                order.delivery_date = Some(now());
            }
            uow.set_status(order.id, order.status, order.delivery_date)?;
            uow.append_event(&OrderEvent::status_changed(&order, from))?;
            Ok((order, from))
        })?;

        log::info!(
            "Order {} moved from {} to {} by {}",
            order.id,
            from,
            order.status,
            requester.user_id
        );
        Ok(order)
    }

    fn get_orders_for_user(&self, user_id: Uuid) -> Result<Vec<OrderSummary>, DomainError> {
        self.store.list_for_user(user_id)
    }

    fn get_order_detail(
        &self,
        order_id: Uuid,
        requester: &Principal,
    ) -> Result<Order, DomainError> {
        let order = self
            .store
            .find_by_id(order_id)?
            .ok_or(DomainError::NotFound)?;
        if !requester.can_access(order.user_id) {
            return Err(DomainError::NotAuthorized);
        }
        Ok(order)
    }

    fn get_all_orders(&self, requester: &Principal) -> Result<Vec<OrderSummary>, DomainError> {
        if !requester.is_admin() {
            return Err(DomainError::Forbidden);
        }
        self.store.list_all()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::Arc;

    use bigdecimal::BigDecimal;

    use super::*;
    use crate::domain::delivery::{add_business_days, FixedLeadTime};
    use crate::domain::events::OrderEventType;
    use crate::domain::order::tests::shipping;
    use crate::domain::product::Product;
    use crate::infrastructure::memory::InMemoryOrderStore;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).expect("valid decimal")
    }

    fn product(name: &str, price: &str, stock: i32) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: name.to_string(),
            image_url: Some(format!("/images/{name}.jpg")),
            price: dec(price),
            stock,
            is_archived: stock == 0,
        }
    }

    fn line(product: &Product, quantity: i32) -> CartLine {
        CartLine {
            product_id: product.id,
            quantity,
            unit_price: product.price.clone(),
        }
    }

    fn service(products: &[Product]) -> OrderService<InMemoryOrderStore> {
        OrderService::new(
            InMemoryOrderStore::with_products(products.iter().cloned()),
            DeliveryEstimator::new(FixedLeadTime(5)),
        )
    }

    fn stock_of(svc: &OrderService<InMemoryOrderStore>, p: &Product) -> Product {
        svc.store().product(p.id).expect("product exists")
    }

    #[test]
    fn placing_an_order_reserves_stock_and_archives_depleted_products() {
        let p1 = product("P1", "10.00", 5);
        let p2 = product("P2", "25.00", 1);
        let svc = service(&[p1.clone(), p2.clone()]);
        let user = Uuid::new_v4();

        let order = svc
            .place_order(user, vec![line(&p1, 2), line(&p2, 1)], shipping())
            .unwrap();

        assert_eq!(order.total, dec("45.00"));
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.user_id, user);
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.items[0].product_id, p1.id);
        assert_eq!(order.items[0].name, "P1");
        assert_eq!(
            order.estimated_delivery_date,
            add_business_days(order.date.date_naive(), 5)
        );

        let p1_after = stock_of(&svc, &p1);
        let p2_after = stock_of(&svc, &p2);
        assert_eq!(p1_after.stock, 3);
        assert!(!p1_after.is_archived);
        assert_eq!(p2_after.stock, 0);
        assert!(p2_after.is_archived);

        let events = svc.store().events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, OrderEventType::OrderPlaced);
        assert_eq!(events[0].order_id, order.id);
    }

    #[test]
    fn out_of_stock_line_rolls_back_every_reservation() {
        let p1 = product("P1", "10.00", 5);
        let p2 = product("P2", "25.00", 0);
        let svc = service(&[p1.clone(), p2.clone()]);
        let user = Uuid::new_v4();

        let err = svc
            .place_order(user, vec![line(&p1, 2), line(&p2, 1)], shipping())
            .unwrap_err();

        match err {
            DomainError::OutOfStock {
                product_id,
                product_name,
                available,
            } => {
                assert_eq!(product_id, p2.id);
                assert_eq!(product_name, "P2");
                assert_eq!(available, 0);
            }
            other => panic!("expected OutOfStock, got {other:?}"),
        }
        assert_eq!(stock_of(&svc, &p1).stock, 5);
        assert!(svc.get_orders_for_user(user).unwrap().is_empty());
        assert!(svc.store().events().is_empty());
    }

    #[test]
    fn unknown_product_is_reported_and_nothing_is_reserved() {
        let p1 = product("P1", "10.00", 5);
        let ghost = product("ghost", "1.00", 1);
        let svc = service(&[p1.clone()]);

        let err = svc
            .place_order(
                Uuid::new_v4(),
                vec![line(&p1, 1), line(&ghost, 1)],
                shipping(),
            )
            .unwrap_err();

        assert!(matches!(err, DomainError::ProductNotFound(id) if id == ghost.id));
        assert_eq!(stock_of(&svc, &p1).stock, 5);
    }

    #[test]
    fn empty_cart_and_bad_shipping_are_rejected_before_reserving() {
        let p1 = product("P1", "10.00", 5);
        let svc = service(&[p1.clone()]);

        assert!(matches!(
            svc.place_order(Uuid::new_v4(), vec![], shipping()),
            Err(DomainError::EmptyCart)
        ));

        let mut no_address = shipping();
        no_address.address.clear();
        assert!(matches!(
            svc.place_order(Uuid::new_v4(), vec![line(&p1, 1)], no_address),
            Err(DomainError::InvalidInput(_))
        ));
        assert_eq!(stock_of(&svc, &p1).stock, 5);
    }

    #[test]
    fn order_keeps_the_cart_price_after_the_product_is_repriced() {
        let p1 = product("P1", "10.00", 5);
        let svc = service(&[p1.clone()]);
        let user = Principal::customer(Uuid::new_v4());

        let order = svc
            .place_order(user.user_id, vec![line(&p1, 2)], shipping())
            .unwrap();

        let mut repriced = stock_of(&svc, &p1);
        repriced.price = dec("99.99");
        repriced.name = "Renamed".to_string();
        svc.store().upsert_product(repriced);

        let reread = svc.get_order_detail(order.id, &user).unwrap();
        assert_eq!(reread.items[0].price, dec("10.00"));
        assert_eq!(reread.items[0].name, "P1");
        assert_eq!(reread.total, dec("20.00"));
    }

    #[test]
    fn owner_cancellation_restocks_and_unarchives() {
        let p1 = product("P1", "10.00", 5);
        let p2 = product("P2", "25.00", 1);
        let svc = service(&[p1.clone(), p2.clone()]);
        let owner = Principal::customer(Uuid::new_v4());

        let order = svc
            .place_order(owner.user_id, vec![line(&p1, 2), line(&p2, 1)], shipping())
            .unwrap();
        assert!(stock_of(&svc, &p2).is_archived);

        let cancelled = svc.cancel_order(order.id, &owner).unwrap();

        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(stock_of(&svc, &p1).stock, 5);
        let p2_after = stock_of(&svc, &p2);
        assert_eq!(p2_after.stock, 1);
        assert!(!p2_after.is_archived);
        assert_eq!(
            svc.get_order_detail(order.id, &owner).unwrap().status,
            OrderStatus::Cancelled
        );

        let events = svc.store().events();
        assert_eq!(events.last().unwrap().event_type, OrderEventType::OrderCancelled);
    }

    #[test]
    fn shipped_orders_cannot_be_cancelled_by_the_owner() {
        let p1 = product("P1", "10.00", 5);
        let svc = service(&[p1.clone()]);
        let owner = Principal::customer(Uuid::new_v4());
        let admin = Principal::admin(Uuid::new_v4());

        let order = svc
            .place_order(owner.user_id, vec![line(&p1, 1)], shipping())
            .unwrap();
        svc.update_status(order.id, OrderStatus::Shipped, &admin)
            .unwrap();

        let err = svc.cancel_order(order.id, &owner).unwrap_err();
        assert!(matches!(
            err,
            DomainError::InvalidTransition {
                from: OrderStatus::Shipped,
                to: OrderStatus::Cancelled
            }
        ));
        assert_eq!(
            svc.get_order_detail(order.id, &owner).unwrap().status,
            OrderStatus::Shipped
        );
        assert_eq!(stock_of(&svc, &p1).stock, 4);
    }

    #[test]
    fn only_owner_or_admin_may_cancel() {
        let p1 = product("P1", "10.00", 5);
        let svc = service(&[p1.clone()]);
        let owner = Principal::customer(Uuid::new_v4());
        let order = svc
            .place_order(owner.user_id, vec![line(&p1, 1)], shipping())
            .unwrap();

        let stranger = Principal::customer(Uuid::new_v4());
        assert!(matches!(
            svc.cancel_order(order.id, &stranger),
            Err(DomainError::NotAuthorized)
        ));
        assert_eq!(stock_of(&svc, &p1).stock, 4);

        let admin = Principal::admin(Uuid::new_v4());
        assert!(svc.cancel_order(order.id, &admin).is_ok());
        assert_eq!(stock_of(&svc, &p1).stock, 5);

        assert!(matches!(
            svc.cancel_order(Uuid::new_v4(), &owner),
            Err(DomainError::NotFound)
        ));
    }

    #[test]
    fn status_updates_are_admin_only_and_stamp_delivery() {
        let p1 = product("P1", "10.00", 5);
        let svc = service(&[p1.clone()]);
        let owner = Principal::customer(Uuid::new_v4());
        let admin = Principal::admin(Uuid::new_v4());
        let order = svc
            .place_order(owner.user_id, vec![line(&p1, 2)], shipping())
            .unwrap();

        assert!(matches!(
            svc.update_status(order.id, OrderStatus::Shipped, &owner),
            Err(DomainError::Forbidden)
        ));

        let shipped = svc
            .update_status(order.id, OrderStatus::Shipped, &admin)
            .unwrap();
        assert_eq!(shipped.delivery_date, None);

        let delivered = svc
            .update_status(order.id, OrderStatus::Delivered, &admin)
            .unwrap();
        assert!(delivered.delivery_date.is_some());
        assert_eq!(
            svc.get_order_detail(order.id, &owner).unwrap().delivery_date,
            delivered.delivery_date
        );
        assert_eq!(stock_of(&svc, &p1).stock, 3);

        assert!(matches!(
            svc.update_status(order.id, OrderStatus::Processing, &admin),
            Err(DomainError::InvalidTransition { .. })
        ));
        assert!(matches!(
            svc.update_status(Uuid::new_v4(), OrderStatus::Shipped, &admin),
            Err(DomainError::NotFound)
        ));
    }

    #[test]
    fn order_detail_is_private_to_owner_and_admins() {
        let p1 = product("P1", "10.00", 5);
        let svc = service(&[p1.clone()]);
        let owner = Principal::customer(Uuid::new_v4());
        let order = svc
            .place_order(owner.user_id, vec![line(&p1, 1)], shipping())
            .unwrap();

        let first = svc.get_order_detail(order.id, &owner).unwrap();
        let second = svc.get_order_detail(order.id, &owner).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, order);

        assert!(svc
            .get_order_detail(order.id, &Principal::admin(Uuid::new_v4()))
            .is_ok());
        assert!(matches!(
            svc.get_order_detail(order.id, &Principal::customer(Uuid::new_v4())),
            Err(DomainError::NotAuthorized)
        ));
        assert!(matches!(
            svc.get_order_detail(Uuid::new_v4(), &owner),
            Err(DomainError::NotFound)
        ));
    }

    #[test]
    fn listings_are_scoped_and_most_recent_first() {
        let p1 = product("P1", "1.00", 10);
        let svc = service(&[p1.clone()]);
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let first = svc.place_order(alice, vec![line(&p1, 1)], shipping()).unwrap();
        let second = svc.place_order(alice, vec![line(&p1, 2)], shipping()).unwrap();
        let bobs = svc.place_order(bob, vec![line(&p1, 1)], shipping()).unwrap();

        let mine = svc.get_orders_for_user(alice).unwrap();
        let ids: Vec<Uuid> = mine.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert_eq!(mine[0].purchaser_name, "Ada Lovelace");

        assert!(matches!(
            svc.get_all_orders(&Principal::customer(alice)),
            Err(DomainError::Forbidden)
        ));
        let all = svc.get_all_orders(&Principal::admin(Uuid::new_v4())).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].id, bobs.id);
    }

    #[test]
    fn concurrent_placements_never_oversell() {
        let p1 = product("P1", "5.00", 10);
        let svc = Arc::new(service(&[p1.clone()]));

        let successes: usize = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..16)
                .map(|_| {
                    let svc = Arc::clone(&svc);
                    let cart = vec![line(&p1, 3)];
                    scope.spawn(move || svc.place_order(Uuid::new_v4(), cart, shipping()))
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("placement thread panicked"))
                .filter(Result::is_ok)
                .count()
        });

        assert_eq!(successes, 3);
        let after = stock_of(&svc, &p1);
        assert_eq!(after.stock, 1);
        assert!(!after.is_archived);
    }
}
