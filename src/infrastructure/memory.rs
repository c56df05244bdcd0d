//! Process-local implementation of every port, used by service tests and
//! handy for running the HTTP layer without Postgres.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::mirror::{MirrorEvent, MirrorTask};
use crate::domain::order::{ListResult, NewOrder, Order, OrderStatus};
use crate::domain::payment::{NewPayment, PaymentRecord};
use crate::domain::ports::{MirrorOutbox, OrderRepository, PaymentRepository, StockRepository};
use crate::domain::stock::{InventoryRecord, LockStatus, NewStockLock, StockLockEntry, StockTarget};

#[derive(Debug, Clone)]
pub struct OutboxEntry {
    pub task: MirrorTask,
    pub delivered: bool,
    pub last_error: Option<String>,
}

#[derive(Default)]
struct State {
    next_id: i64,
    orders: Vec<Order>,
    products: BTreeMap<i64, InventoryRecord>,
    variants: BTreeMap<i64, InventoryRecord>,
    locks: Vec<StockLockEntry>,
    payments: Vec<PaymentRecord>,
    outbox: Vec<OutboxEntry>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn push_event(&mut self, event: &MirrorEvent) -> Uuid {
        let id = Uuid::new_v4();
        self.outbox.push(OutboxEntry {
            task: MirrorTask {
                id,
                event: event.clone(),
                attempts: 0,
                created_at: Utc::now(),
            },
            delivered: false,
            last_error: None,
        });
        id
    }

    fn stock_mut(&mut self, target: StockTarget) -> Option<&mut InventoryRecord> {
        match target {
            StockTarget::Product(id) => self.products.get_mut(&id),
            StockTarget::Variant(id) => self.variants.get_mut(&id),
        }
    }

    fn outbox_entry(&mut self, id: Uuid) -> Result<&mut OutboxEntry, DomainError> {
        self.outbox
            .iter_mut()
            .find(|e| e.task.id == id)
            .ok_or_else(|| DomainError::NotFound(format!("outbox task {id}")))
    }
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Mutex<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, State>, DomainError> {
        self.inner
            .lock()
            .map_err(|_| DomainError::Persistence("in-memory store lock poisoned".into()))
    }

    pub fn add_product(&self, name: &str, sku: Option<&str>, stock: i32) -> Result<i64, DomainError> {
        let mut state = self.state()?;
        let id = state.next_id();
        state.products.insert(
            id,
            InventoryRecord {
                id,
                name: name.to_string(),
                sku: sku.map(String::from),
                stock,
            },
        );
        Ok(id)
    }

    pub fn add_variant(
        &self,
        product_id: i64,
        name: &str,
        sku: Option<&str>,
        stock: i32,
    ) -> Result<i64, DomainError> {
        let mut state = self.state()?;
        if !state.products.contains_key(&product_id) {
            return Err(DomainError::NotFound(format!("product {product_id}")));
        }
        let id = state.next_id();
        state.variants.insert(
            id,
            InventoryRecord {
                id,
                name: name.to_string(),
                sku: sku.map(String::from),
                stock,
            },
        );
        Ok(id)
    }

    /// Current on-hand stock of a product or variant.
    pub fn on_hand(&self, target: StockTarget) -> Result<Option<i32>, DomainError> {
        Ok(self.state()?.stock_mut(target).map(|r| r.stock))
    }

    pub fn outbox_entries(&self) -> Result<Vec<OutboxEntry>, DomainError> {
        Ok(self.state()?.outbox.clone())
    }

    pub fn payment_count(&self) -> Result<usize, DomainError> {
        Ok(self.state()?.payments.len())
    }
}

fn find_record<'a>(
    records: &'a BTreeMap<i64, InventoryRecord>,
    name: &str,
    sku: Option<&str>,
) -> Option<&'a InventoryRecord> {
    records.values().find(|r| r.matches(name, sku))
}

impl OrderRepository for InMemoryStore {
    fn find_by_number(&self, order_number: &str) -> Result<Option<Order>, DomainError> {
        Ok(self
            .state()?
            .orders
            .iter()
            .find(|o| o.order_number == order_number)
            .cloned())
    }

    fn find_by_id(&self, id: i64) -> Result<Option<Order>, DomainError> {
        Ok(self.state()?.orders.iter().find(|o| o.id == id).cloned())
    }

    fn insert(&self, order: &NewOrder, mirror: &MirrorEvent) -> Result<Order, DomainError> {
        let mut state = self.state()?;
        if state.orders.iter().any(|o| o.order_number == order.order_number) {
            return Err(DomainError::Conflict(format!(
                "order number {} already exists",
                order.order_number
            )));
        }

        let now = Utc::now();
        let stored = Order {
            id: state.next_id(),
            order_number: order.order_number.clone(),
            created_at: now,
            payment_method: order.payment_method.clone(),
            items: order.items.clone(),
            totals: order.totals.clone(),
            status: OrderStatus::Pending,
            delivery_method: order.delivery_method.clone(),
            delivery_type: order.delivery_type.clone(),
            delivery: order.delivery.clone(),
            updated_at: now,
        };
        state.orders.push(stored.clone());
        state.push_event(mirror);
        Ok(stored)
    }

    fn update_status(
        &self,
        order_number: &str,
        status: OrderStatus,
        mirror: &MirrorEvent,
    ) -> Result<(), DomainError> {
        let mut state = self.state()?;
        let order = state
            .orders
            .iter_mut()
            .find(|o| o.order_number == order_number)
            .ok_or_else(|| DomainError::NotFound(format!("order {order_number}")))?;
        order.status = status;
        order.updated_at = Utc::now();
        state.push_event(mirror);
        Ok(())
    }

    fn delete_pending(&self, order_number: &str) -> Result<bool, DomainError> {
        let mut state = self.state()?;
        let Some(pos) = state
            .orders
            .iter()
            .position(|o| o.order_number == order_number && o.status == OrderStatus::Pending)
        else {
            return Ok(false);
        };

        let row_id = state.orders[pos].id;
        let paid = state.payments.iter().filter(|p| p.order_row_id == row_id).count();
        if paid > 0 {
            return Err(DomainError::Conflict(format!(
                "order {order_number} has {paid} recorded payment(s)"
            )));
        }
        state.orders.remove(pos);
        Ok(true)
    }

    fn list(&self, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        let state = self.state()?;
        let mut items = state.orders.clone();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let offset = ((page - 1) * limit).max(0) as usize;
        Ok(ListResult {
            total: items.len() as i64,
            items: items.into_iter().skip(offset).take(limit.max(0) as usize).collect(),
        })
    }
}

impl StockRepository for InMemoryStore {
    fn find_variant(&self, name: &str, sku: Option<&str>) -> Result<Option<InventoryRecord>, DomainError> {
        Ok(find_record(&self.state()?.variants, name, sku).cloned())
    }

    fn find_product(&self, name: &str, sku: Option<&str>) -> Result<Option<InventoryRecord>, DomainError> {
        Ok(find_record(&self.state()?.products, name, sku).cloned())
    }

    fn locks_for_order(&self, order_number: &str) -> Result<Vec<StockLockEntry>, DomainError> {
        Ok(self
            .state()?
            .locks
            .iter()
            .filter(|l| l.order_number == order_number)
            .cloned()
            .collect())
    }

    fn insert_locks(&self, locks: &[NewStockLock]) -> Result<usize, DomainError> {
        let mut state = self.state()?;
        // Same rule as the partial unique index: one active lock per order and target.
        let duplicate = locks.iter().enumerate().any(|(i, new)| {
            state.locks.iter().any(|l| {
                l.status != LockStatus::Released
                    && l.order_number == new.order_number
                    && l.target == new.target
            }) || locks[..i]
                .iter()
                .any(|prev| prev.order_number == new.order_number && prev.target == new.target)
        });
        if duplicate {
            return Err(DomainError::Conflict("stock lock already exists".into()));
        }

        for new in locks {
            let id = state.next_id();
            state.locks.push(StockLockEntry {
                id,
                order_number: new.order_number.clone(),
                target: new.target,
                quantity: new.quantity,
                status: LockStatus::Locked,
            });
        }
        Ok(locks.len())
    }

    fn complete_lock(&self, lock_id: i64) -> Result<Option<i32>, DomainError> {
        let mut state = self.state()?;
        let Some(lock) = state
            .locks
            .iter_mut()
            .find(|l| l.id == lock_id && l.status == LockStatus::Locked)
        else {
            return Ok(None);
        };
        lock.status = LockStatus::Completed;
        let (target, quantity) = (lock.target, lock.quantity);

        let record = state
            .stock_mut(target)
            .ok_or_else(|| DomainError::NotFound(format!("stock target {target:?}")))?;
        record.stock = (record.stock - quantity).max(0);
        Ok(Some(record.stock))
    }

    fn release_lock(&self, lock_id: i64) -> Result<bool, DomainError> {
        let mut state = self.state()?;
        match state
            .locks
            .iter_mut()
            .find(|l| l.id == lock_id && l.status == LockStatus::Locked)
        {
            Some(lock) => {
                lock.status = LockStatus::Released;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl PaymentRepository for InMemoryStore {
    fn find_by_transaction_id(&self, transaction_id: &str) -> Result<Option<PaymentRecord>, DomainError> {
        Ok(self
            .state()?
            .payments
            .iter()
            .find(|p| p.transaction_id.as_deref() == Some(transaction_id))
            .cloned())
    }

    fn insert(&self, payment: &NewPayment, mirror: &MirrorEvent) -> Result<PaymentRecord, DomainError> {
        let mut state = self.state()?;
        let order_row_id = payment.order_row_id.ok_or_else(|| {
            DomainError::InvalidInput(format!(
                "payment for order {} has no order row",
                payment.order_number
            ))
        })?;
        if !state.orders.iter().any(|o| o.id == order_row_id) {
            return Err(DomainError::NotFound(format!("order row {order_row_id}")));
        }
        if let Some(tx) = payment.transaction_id.as_deref() {
            if state
                .payments
                .iter()
                .any(|p| p.transaction_id.as_deref() == Some(tx))
            {
                return Err(DomainError::Conflict(format!(
                    "transaction {tx} already recorded"
                )));
            }
        }

        let record = PaymentRecord {
            id: state.next_id(),
            order_number: payment.order_number.clone(),
            order_row_id,
            paid_at: Utc::now(),
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
        state.payments.push(record.clone());
        state.push_event(mirror);
        Ok(record)
    }

    fn list_for_order(&self, order_number: &str) -> Result<Vec<PaymentRecord>, DomainError> {
        Ok(self
            .state()?
            .payments
            .iter()
            .filter(|p| p.order_number == order_number)
            .cloned()
            .collect())
    }
}

impl MirrorOutbox for InMemoryStore {
    fn enqueue(&self, event: &MirrorEvent) -> Result<Uuid, DomainError> {
        Ok(self.state()?.push_event(event))
    }

    fn pending(&self, limit: i64, max_attempts: i32) -> Result<Vec<MirrorTask>, DomainError> {
        Ok(self
            .state()?
            .outbox
            .iter()
            .filter(|e| !e.delivered && e.task.attempts < max_attempts)
            .take(limit.max(0) as usize)
            .map(|e| e.task.clone())
            .collect())
    }

    fn mark_delivered(&self, id: Uuid) -> Result<(), DomainError> {
        let mut state = self.state()?;
        let entry = state.outbox_entry(id)?;
        entry.delivered = true;
        entry.last_error = None;
        Ok(())
    }

    fn mark_failed(&self, id: Uuid, error: &str) -> Result<(), DomainError> {
        let mut state = self.state()?;
        let entry = state.outbox_entry(id)?;
        entry.task.attempts += 1;
        entry.last_error = Some(error.to_string());
        Ok(())
    }
}
