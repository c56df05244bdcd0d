use chrono::Utc;
use diesel::prelude::*;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::mirror::MirrorEvent;
use crate::domain::order::{ListResult, NewOrder, Order, OrderStatus};
use crate::domain::ports::OrderRepository;
use crate::schema::{orders, payments};

use super::models::{NewOrderRow, OrderRow};
use super::outbox_repo::insert_mirror_event;

#[derive(Clone)]
pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn new_order_row(order: &NewOrder) -> Result<NewOrderRow, DomainError> {
    let line_items = serde_json::to_value(&order.items)
        .map_err(|e| DomainError::InvalidInput(format!("unserialisable line items: {e}")))?;
    let d = &order.delivery;
    Ok(NewOrderRow {
        order_number: order.order_number.clone(),
        order_date: Utc::now(),
        payment_method: order.payment_method.clone(),
        products: order.products_summary(),
        quantities: order.quantities_summary(),
        line_items,
        total_usd: order.totals.usd.clone(),
        total_bs: order.totals.bs.clone(),
        // Whatever the storefront intends to display, the durable record starts pending.
        status: OrderStatus::Pending.as_str().to_string(),
        delivery_method: order.delivery_method.clone(),
        delivery_type: order.delivery_type.clone(),
        customer_name: d.name.clone(),
        customer_phone: d.phone.clone(),
        customer_national_id: d.national_id.clone(),
        customer_email: d.email.clone(),
        customer_address: d.address.clone(),
        courier: d.courier.clone(),
        courier_office: d.office.clone(),
        courier_state: d.state.clone(),
        delivery_instructions: d.instructions.clone(),
    })
}

impl OrderRepository for DieselOrderRepository {
    fn find_by_number(&self, order_number: &str) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = orders::table
            .filter(orders::order_number.eq(order_number))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;

        row.map(Order::try_from).transpose()
    }

    fn find_by_id(&self, id: i64) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = orders::table
            .find(id)
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;

        row.map(Order::try_from).transpose()
    }

    fn insert(&self, order: &NewOrder, mirror: &MirrorEvent) -> Result<Order, DomainError> {
        let row = new_order_row(order)?;
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // 1. Insert the order
            let stored = diesel::insert_into(orders::table)
                .values(&row)
                .returning(OrderRow::as_returning())
                .get_result(conn)?;

            // 2. Queue the legacy mirror write in the same transaction.
            insert_mirror_event(conn, mirror)?;

            Order::try_from(stored)
        })
    }

    fn update_status(
        &self,
        order_number: &str,
        status: OrderStatus,
        mirror: &MirrorEvent,
    ) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let updated = diesel::update(orders::table.filter(orders::order_number.eq(order_number)))
                .set((
                    orders::status.eq(status.as_str()),
                    orders::updated_at.eq(Utc::now()),
                ))
                .execute(conn)?;
            if updated == 0 {
                return Err(DomainError::NotFound(format!("order {order_number}")));
            }

            insert_mirror_event(conn, mirror)?;
            Ok(())
        })
    }

    fn delete_pending(&self, order_number: &str) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // Row lock keeps a concurrent payment insert out until we are done.
            let row_id: Option<i64> = orders::table
                .filter(orders::order_number.eq(order_number))
                .filter(orders::status.eq(OrderStatus::Pending.as_str()))
                .select(orders::id)
                .for_update()
                .first(conn)
                .optional()?;
            let Some(row_id) = row_id else {
                return Ok(false);
            };

            let paid: i64 = payments::table
                .filter(payments::order_row_id.eq(row_id))
                .count()
                .get_result(conn)?;
            if paid > 0 {
                return Err(DomainError::Conflict(format!(
                    "order {order_number} has {paid} recorded payment(s)"
                )));
            }

            diesel::delete(orders::table.find(row_id)).execute(conn)?;
            Ok(true)
        })
    }

    fn list(&self, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        let mut conn = self.pool.get()?;

        let offset = (page - 1) * limit;
        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = orders::table.count().get_result(conn)?;

            let rows = orders::table
                .select(OrderRow::as_select())
                .order((orders::order_date.desc(), orders::id.desc()))
                .limit(limit)
                .offset(offset)
                .load(conn)?;

            Ok(ListResult {
                items: rows
                    .into_iter()
                    .map(Order::try_from)
                    .collect::<Result<_, _>>()?,
                total,
            })
        })
    }
}
