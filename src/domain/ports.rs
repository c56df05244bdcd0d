use uuid::Uuid;

use super::errors::DomainError;
use super::mirror::{MirrorEvent, MirrorTask};
use super::order::{ListResult, NewOrder, Order, OrderStatus};
use super::payment::{NewPayment, PaymentRecord};
use super::stock::{InventoryRecord, NewStockLock, StockLockEntry};

pub trait OrderRepository: Send + Sync + 'static {
    fn find_by_number(&self, order_number: &str) -> Result<Option<Order>, DomainError>;
    fn find_by_id(&self, id: i64) -> Result<Option<Order>, DomainError>;
    /// Inserts the order as `pending` together with its mirror event.
    /// A duplicate order number yields `DomainError::Conflict`.
    fn insert(&self, order: &NewOrder, mirror: &MirrorEvent) -> Result<Order, DomainError>;
    fn update_status(
        &self,
        order_number: &str,
        status: OrderStatus,
        mirror: &MirrorEvent,
    ) -> Result<(), DomainError>;
    /// Deletes the order only while it is still pending. Returns whether a
    /// row was removed. An order with recorded payments is never deleted and
    /// yields `DomainError::Conflict`.
    fn delete_pending(&self, order_number: &str) -> Result<bool, DomainError>;
    fn list(&self, page: i64, limit: i64) -> Result<ListResult, DomainError>;
}

pub trait StockRepository: Send + Sync + 'static {
    fn find_variant(&self, name: &str, sku: Option<&str>) -> Result<Option<InventoryRecord>, DomainError>;
    fn find_product(&self, name: &str, sku: Option<&str>) -> Result<Option<InventoryRecord>, DomainError>;
    fn locks_for_order(&self, order_number: &str) -> Result<Vec<StockLockEntry>, DomainError>;
    fn insert_locks(&self, locks: &[NewStockLock]) -> Result<usize, DomainError>;
    /// Flips a `locked` entry to `completed` and decrements the target's
    /// on-hand stock (floored at zero) in one step. Returns the remaining
    /// stock, or `None` when the entry was not `locked`.
    fn complete_lock(&self, lock_id: i64) -> Result<Option<i32>, DomainError>;
    /// Flips a `locked` entry to `released`. Returns whether it changed.
    fn release_lock(&self, lock_id: i64) -> Result<bool, DomainError>;
}

pub trait PaymentRepository: Send + Sync + 'static {
    fn find_by_transaction_id(&self, transaction_id: &str) -> Result<Option<PaymentRecord>, DomainError>;
    /// Inserts the payment together with its mirror event. A duplicate
    /// transaction id yields `DomainError::Conflict`.
    fn insert(&self, payment: &NewPayment, mirror: &MirrorEvent) -> Result<PaymentRecord, DomainError>;
    fn list_for_order(&self, order_number: &str) -> Result<Vec<PaymentRecord>, DomainError>;
}

pub trait MirrorOutbox: Send + Sync + 'static {
    fn enqueue(&self, event: &MirrorEvent) -> Result<Uuid, DomainError>;
    /// Undelivered tasks with fewer than `max_attempts` attempts, oldest first.
    fn pending(&self, limit: i64, max_attempts: i32) -> Result<Vec<MirrorTask>, DomainError>;
    fn mark_delivered(&self, id: Uuid) -> Result<(), DomainError>;
    fn mark_failed(&self, id: Uuid, error: &str) -> Result<(), DomainError>;
}
