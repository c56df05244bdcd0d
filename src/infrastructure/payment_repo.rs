use chrono::Utc;
use diesel::prelude::*;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::mirror::MirrorEvent;
use crate::domain::payment::{NewPayment, PaymentRecord};
use crate::domain::ports::PaymentRepository;
use crate::schema::payments;

use super::models::{NewPaymentRow, PaymentRow};
use super::outbox_repo::insert_mirror_event;

#[derive(Clone)]
pub struct DieselPaymentRepository {
    pool: DbPool,
}

impl DieselPaymentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl PaymentRepository for DieselPaymentRepository {
    fn find_by_transaction_id(&self, transaction_id: &str) -> Result<Option<PaymentRecord>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = payments::table
            .filter(payments::transaction_id.eq(transaction_id))
            .select(PaymentRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(row.map(PaymentRecord::from))
    }

    fn insert(&self, payment: &NewPayment, mirror: &MirrorEvent) -> Result<PaymentRecord, DomainError> {
        let order_row_id = payment.order_row_id.ok_or_else(|| {
            DomainError::InvalidInput(format!(
                "payment for order {} has no order row",
                payment.order_number
            ))
        })?;
        let row = NewPaymentRow {
            order_id: payment.order_number.clone(),
            order_row_id,
            payment_date: Utc::now(),
            method: payment.method.clone(),
            transaction_id: payment.transaction_id.clone(),
            usd: payment.usd.clone(),
            bs: payment.bs.clone(),
            name: payment.name.clone(),
            email: payment.email.clone(),
            items: payment.items.clone(),
            quantity: payment.quantity.clone(),
            status: payment.status.clone(),
        };
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let stored = diesel::insert_into(payments::table)
                .values(&row)
                .returning(PaymentRow::as_returning())
                .get_result(conn)?;

            insert_mirror_event(conn, mirror)?;

            Ok(PaymentRecord::from(stored))
        })
    }

    fn list_for_order(&self, order_number: &str) -> Result<Vec<PaymentRecord>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows = payments::table
            .filter(payments::order_id.eq(order_number))
            .order((payments::payment_date.asc(), payments::id.asc()))
            .select(PaymentRow::as_select())
            .load(&mut conn)?;

        Ok(rows.into_iter().map(PaymentRecord::from).collect())
    }
}
