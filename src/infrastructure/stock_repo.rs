use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::StockRepository;
use crate::domain::stock::{InventoryRecord, LockStatus, NewStockLock, StockLockEntry, StockTarget};
use crate::schema::{locked_stock, product_variants, products};

use super::models::{LockRow, NewLockRow, ProductRow, VariantRow};

#[derive(Clone)]
pub struct DieselStockRepository {
    pool: DbPool,
}

impl DieselStockRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn usable_sku(sku: Option<&str>) -> Option<&str> {
    sku.map(str::trim).filter(|s| !s.is_empty())
}

/// Decrements on-hand stock by `quantity`, never below zero, and returns
/// what is left. The row is locked for the rest of the transaction.
fn decrement_stock(conn: &mut PgConnection, target: StockTarget, quantity: i32) -> Result<i32, DomainError> {
    let now = Utc::now();
    match target {
        StockTarget::Product(id) => {
            let current: i32 = products::table
                .find(id)
                .select(products::stock)
                .for_update()
                .first(conn)?;
            let remaining = (current - quantity).max(0);
            diesel::update(products::table.find(id))
                .set((products::stock.eq(remaining), products::updated_at.eq(now)))
                .execute(conn)?;
            Ok(remaining)
        }
        StockTarget::Variant(id) => {
            let current: i32 = product_variants::table
                .find(id)
                .select(product_variants::stock)
                .for_update()
                .first(conn)?;
            let remaining = (current - quantity).max(0);
            diesel::update(product_variants::table.find(id))
                .set((
                    product_variants::stock.eq(remaining),
                    product_variants::updated_at.eq(now),
                ))
                .execute(conn)?;
            Ok(remaining)
        }
    }
}

impl StockRepository for DieselStockRepository {
    fn find_variant(&self, name: &str, sku: Option<&str>) -> Result<Option<InventoryRecord>, DomainError> {
        let mut conn = self.pool.get()?;

        let mut query = product_variants::table
            .select(VariantRow::as_select())
            .order(product_variants::id.asc())
            .into_boxed();
        query = match usable_sku(sku) {
            Some(sku) => query.filter(
                product_variants::name
                    .eq(name.to_string())
                    .or(product_variants::sku.eq(sku.to_string())),
            ),
            None => query.filter(product_variants::name.eq(name.to_string())),
        };

        Ok(query.first(&mut conn).optional()?.map(InventoryRecord::from))
    }

    fn find_product(&self, name: &str, sku: Option<&str>) -> Result<Option<InventoryRecord>, DomainError> {
        let mut conn = self.pool.get()?;

        let mut query = products::table
            .select(ProductRow::as_select())
            .order(products::id.asc())
            .into_boxed();
        query = match usable_sku(sku) {
            Some(sku) => query.filter(
                products::name
                    .eq(name.to_string())
                    .or(products::sku.eq(sku.to_string())),
            ),
            None => query.filter(products::name.eq(name.to_string())),
        };

        Ok(query.first(&mut conn).optional()?.map(InventoryRecord::from))
    }

    fn locks_for_order(&self, order_number: &str) -> Result<Vec<StockLockEntry>, DomainError> {
        let mut conn = self.pool.get()?;

        locked_stock::table
            .filter(locked_stock::order_number.eq(order_number))
            .order(locked_stock::id.asc())
            .select(LockRow::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(StockLockEntry::try_from)
            .collect()
    }

    fn insert_locks(&self, locks: &[NewStockLock]) -> Result<usize, DomainError> {
        let rows: Vec<NewLockRow> = locks
            .iter()
            .map(|l| NewLockRow {
                order_number: l.order_number.clone(),
                product_id: l.target.product_id(),
                variant_id: l.target.variant_id(),
                quantity: l.quantity,
                status: LockStatus::Locked.as_str().to_string(),
            })
            .collect();
        let mut conn = self.pool.get()?;

        Ok(diesel::insert_into(locked_stock::table)
            .values(&rows)
            .execute(&mut conn)?)
    }

    fn complete_lock(&self, lock_id: i64) -> Result<Option<i32>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // The status guard makes this the single point where a lock can be
            // completed; a concurrent or repeated commit updates zero rows.
            let lock = diesel::update(
                locked_stock::table
                    .filter(locked_stock::id.eq(lock_id))
                    .filter(locked_stock::status.eq(LockStatus::Locked.as_str())),
            )
            .set((
                locked_stock::status.eq(LockStatus::Completed.as_str()),
                locked_stock::updated_at.eq(Utc::now()),
            ))
            .returning(LockRow::as_returning())
            .get_result(conn)
            .optional()?;

            let Some(lock) = lock else {
                return Ok(None);
            };
            let target = StockTarget::from_columns(lock.product_id, lock.variant_id)?;
            decrement_stock(conn, target, lock.quantity).map(Some)
        })
    }

    fn release_lock(&self, lock_id: i64) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;

        let released = diesel::update(
            locked_stock::table
                .filter(locked_stock::id.eq(lock_id))
                .filter(locked_stock::status.eq(LockStatus::Locked.as_str())),
        )
        .set((
            locked_stock::status.eq(LockStatus::Released.as_str()),
            locked_stock::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)?;

        Ok(released > 0)
    }
}
