use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::events::{OrderEvent, AGGREGATE_TYPE};
use crate::domain::order::{Order, OrderStatus, OrderSummary};
use crate::domain::ports::{InventoryLedger, OrderStore, OrderWriter, UnitOfWork};
use crate::domain::product::ReservedStock;
use crate::schema::{order_items, order_outbox, orders, products};

use super::models::{NewOrderItemRow, NewOrderRow, NewOutboxEventRow, OrderItemRow, OrderRow};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        DomainError::Persistence(e.to_string())
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Persistence(e.to_string())
    }
}

fn load_items(conn: &mut PgConnection, order: &OrderRow) -> QueryResult<Vec<OrderItemRow>> {
    OrderItemRow::belonging_to(order)
        .order(order_items::position.asc())
        .select(OrderItemRow::as_select())
        .load(conn)
}

// ── Unit of work ─────────────────────────────────────────────────────────────

struct PgUnitOfWork<'a> {
    conn: &'a mut PgConnection,
}

impl InventoryLedger for PgUnitOfWork<'_> {
    fn reserve(&mut self, product_id: Uuid, quantity: i32) -> Result<ReservedStock, DomainError> {
        // Conditional decrement: concurrent reservations on the same row queue
        // behind each other and re-check `stock >= quantity` on the new value.
        let reserved = diesel::update(
            products::table
                .filter(products::id.eq(product_id))
                .filter(products::stock.ge(quantity)),
        )
        .set((
            products::stock.eq(products::stock - quantity),
            products::is_archived.eq(products::is_archived.or((products::stock - quantity).le(0))),
            products::updated_at.eq(Utc::now()),
        ))
        .returning((products::name, products::image_url, products::stock))
        .get_result::<(String, Option<String>, i32)>(self.conn)
        .optional()?;

        if let Some((name, image_url, remaining)) = reserved {
            return Ok(ReservedStock {
                product_id,
                name,
                image_url,
                remaining,
            });
        }

        let current = products::table
            .find(product_id)
            .select((products::name, products::stock))
            .first::<(String, i32)>(self.conn)
            .optional()?;

        match current {
            Some((product_name, available)) => Err(DomainError::OutOfStock {
                product_id,
                product_name,
                available,
            }),
            None => Err(DomainError::ProductNotFound(product_id)),
        }
    }

    fn release(&mut self, product_id: Uuid, quantity: i32) -> Result<(), DomainError> {
        let updated = diesel::update(products::table.find(product_id))
            .set((
                products::stock.eq(products::stock + quantity),
                products::is_archived.eq(false),
                products::updated_at.eq(Utc::now()),
            ))
            .execute(self.conn)?;

        if updated == 0 {
            log::warn!(
                "Product {} no longer exists, {} units not restocked",
                product_id,
                quantity
            );
        }
        Ok(())
    }
}

impl OrderWriter for PgUnitOfWork<'_> {
    fn insert_order(&mut self, order: &Order) -> Result<(), DomainError> {
        diesel::insert_into(orders::table)
            .values(&NewOrderRow::from_order(order))
            .execute(self.conn)?;

        let items: Vec<NewOrderItemRow> = order
            .items
            .iter()
            .enumerate()
            .map(|(position, item)| NewOrderItemRow::from_item(order.id, position, item))
            .collect();
        diesel::insert_into(order_items::table)
            .values(&items)
            .execute(self.conn)?;

        Ok(())
    }

    fn lock_order(&mut self, id: Uuid) -> Result<Option<Order>, DomainError> {
        let row = orders::table
            .find(id)
            .select(OrderRow::as_select())
            .for_update()
            .first(self.conn)
            .optional()?;

        let Some(row) = row else {
            return Ok(None);
        };
        let items = load_items(self.conn, &row)?;
        row.into_order(items).map(Some)
    }

    fn set_status(
        &mut self,
        id: Uuid,
        status: OrderStatus,
        delivery_date: Option<DateTime<Utc>>,
    ) -> Result<(), DomainError> {
        let updated = diesel::update(orders::table.find(id))
            .set((
                orders::status.eq(status.as_str()),
                orders::delivery_date.eq(delivery_date),
                orders::updated_at.eq(Utc::now()),
            ))
            .execute(self.conn)?;

        if updated == 0 {
            return Err(DomainError::NotFound);
        }
        Ok(())
    }

    fn append_event(&mut self, event: &OrderEvent) -> Result<(), DomainError> {
        // Consumers route on `aggregate_type` and key on `aggregate_id`.
        diesel::insert_into(order_outbox::table)
            .values(&NewOutboxEventRow {
                id: Uuid::new_v4(),
                aggregate_type: AGGREGATE_TYPE.to_string(),
                aggregate_id: event.order_id.to_string(),
                event_type: event.event_type.as_str().to_string(),
                payload: event.payload.clone(),
            })
            .execute(self.conn)?;
        Ok(())
    }
}

// ── Store ────────────────────────────────────────────────────────────────────

pub struct DieselOrderStore {
    pool: DbPool,
}

impl DieselOrderStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl OrderStore for DieselOrderStore {
    fn transaction<T, F>(&self, work: F) -> Result<T, DomainError>
    where
        F: FnOnce(&mut dyn UnitOfWork) -> Result<T, DomainError>,
    {
        let mut pooled = self.pool.get()?;
        let conn: &mut PgConnection = &mut pooled;

        conn.transaction::<_, DomainError, _>(|conn| {
            let mut uow = PgUnitOfWork { conn };
            work(&mut uow)
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = orders::table
            .find(id)
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(row) = row else {
            return Ok(None);
        };
        let items = load_items(&mut conn, &row)?;
        row.into_order(items).map(Some)
    }

    fn list_for_user(&self, user_id: Uuid) -> Result<Vec<OrderSummary>, DomainError> {
        let mut conn = self.pool.get()?;

        orders::table
            .filter(orders::user_id.eq(user_id))
            .order((orders::created_at.desc(), orders::id.desc()))
            .select(OrderRow::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(OrderRow::into_summary)
            .collect()
    }

    fn list_all(&self) -> Result<Vec<OrderSummary>, DomainError> {
        let mut conn = self.pool.get()?;

        orders::table
            .order((orders::created_at.desc(), orders::id.desc()))
            .select(OrderRow::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(OrderRow::into_summary)
            .collect()
    }
}
