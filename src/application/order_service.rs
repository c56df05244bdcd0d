use chrono::Utc;

use crate::domain::checkout::CheckoutSession;
use crate::domain::errors::DomainError;
use crate::domain::mirror::MirrorEvent;
use crate::domain::order::{CreateOrderOutcome, ListResult, NewOrder, Order, OrderStatus};
use crate::domain::order_number::generate as generate_order_number;
use crate::domain::ports::{OrderRepository, StockRepository};
use crate::domain::stock::StockLockEntry;

use super::stock_service::StockReservationEngine;

pub struct OrderService<O, S> {
    repo: O,
    stock: StockReservationEngine<S>,
}

impl<O: OrderRepository, S: StockRepository> OrderService<O, S> {
    pub fn new(repo: O, stock: S) -> Self {
        Self {
            repo,
            stock: StockReservationEngine::new(stock),
        }
    }

    pub fn stock(&self) -> &StockReservationEngine<S> {
        &self.stock
    }

    /// Stores the order once per order number. A repeated call returns the
    /// first stored order untouched and, while it is still pending, retries
    /// its stock lock. Stock locking is best effort and never fails the call;
    /// the legacy mirror write is queued with the insert.
    pub fn create_order(&self, order: NewOrder) -> Result<CreateOrderOutcome, DomainError> {
        order.validate()?;

        if let Some(existing) = self.repo.find_by_number(&order.order_number)? {
            log::info!("Order {} already exists, returning it", existing.order_number);
            return Ok(self.existing(existing));
        }

        if let Some(requested) = order.requested_status {
            if requested != OrderStatus::Pending {
                log::debug!(
                    "Order {}: storefront shows '{}', storing as pending",
                    order.order_number,
                    requested
                );
            }
        }

        let mirror = MirrorEvent::order_created(&order, Utc::now());
        let stored = match self.repo.insert(&order, &mirror) {
            Ok(stored) => stored,
            Err(DomainError::Conflict(reason)) => {
                // Lost the race to a concurrent create; the winner's row is the order.
                log::warn!(
                    "Order {} was inserted concurrently ({}), returning the stored row",
                    order.order_number,
                    reason
                );
                return self
                    .repo
                    .find_by_number(&order.order_number)?
                    .map(|existing| self.existing(existing))
                    .ok_or(DomainError::Conflict(reason));
            }
            Err(e) => return Err(e),
        };
        log::info!("Created order {}", stored.order_number);

        self.lock_best_effort(&stored);
        Ok(CreateOrderOutcome::Created(stored))
    }

    /// Locking skips entries that are already held, so a retried create
    /// only fills in what an earlier attempt missed.
    fn existing(&self, order: Order) -> CreateOrderOutcome {
        if order.status == OrderStatus::Pending {
            self.lock_best_effort(&order);
        }
        CreateOrderOutcome::Existing(order)
    }

    fn lock_best_effort(&self, order: &Order) {
        if let Err(e) = self.stock.lock(&order.order_number, &order.items) {
            log::warn!("Order {}: stock lock failed: {}", order.order_number, e);
        }
    }

    /// Prices the session and creates the order. A fresh order number is
    /// generated when the caller does not bring one.
    pub fn create_from_session(
        &self,
        session: &CheckoutSession,
        order_number: Option<String>,
    ) -> Result<CreateOrderOutcome, DomainError> {
        let number = order_number
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(generate_order_number);
        self.create_order(session.to_new_order(number)?)
    }

    pub fn set_status(&self, order_number: &str, status: OrderStatus) -> Result<Order, DomainError> {
        let current = self
            .repo
            .find_by_number(order_number)?
            .ok_or_else(|| DomainError::NotFound(format!("order {order_number}")))?;

        if current.status == status {
            return Ok(current);
        }
        if !current.status.can_transition_to(status) {
            return Err(DomainError::InvalidTransition {
                order_number: order_number.to_string(),
                from: current.status.to_string(),
                to: status.to_string(),
            });
        }

        let settled = match status {
            OrderStatus::Cancelled => Some(self.stock.release(order_number)),
            OrderStatus::Completed => Some(self.stock.commit(order_number)),
            _ => None,
        };
        if let Some(Err(e)) = settled {
            log::warn!(
                "Order {}: stock settlement for '{}' failed: {}",
                order_number,
                status,
                e
            );
        }

        self.repo.update_status(
            order_number,
            status,
            &MirrorEvent::status_changed(order_number, status),
        )?;
        log::info!("Order {}: {} -> {}", order_number, current.status, status);

        self.repo
            .find_by_number(order_number)?
            .ok_or_else(|| DomainError::NotFound(format!("order {order_number}")))
    }

    pub fn delete_pending_order(&self, order_number: &str) -> Result<(), DomainError> {
        let current = self
            .repo
            .find_by_number(order_number)?
            .ok_or_else(|| DomainError::NotFound(format!("order {order_number}")))?;
        let not_deletable = |from: OrderStatus| DomainError::InvalidTransition {
            order_number: order_number.to_string(),
            from: from.to_string(),
            to: "deleted".to_string(),
        };
        if current.status != OrderStatus::Pending {
            return Err(not_deletable(current.status));
        }

        // Paid orders are refused here, before any lock is touched.
        if !self.repo.delete_pending(order_number)? {
            // Moved out of pending between the read and the delete.
            return Err(not_deletable(current.status));
        }
        if let Err(e) = self.stock.release(order_number) {
            log::warn!("Order {}: releasing stock after delete failed: {}", order_number, e);
        }
        log::info!("Deleted pending order {}", order_number);
        Ok(())
    }

    pub fn get_order(&self, order_number: &str) -> Result<Option<Order>, DomainError> {
        self.repo.find_by_number(order_number)
    }

    pub fn list_orders(&self, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        self.repo.list(page, limit)
    }

    pub fn stock_locks(&self, order_number: &str) -> Result<Vec<StockLockEntry>, DomainError> {
        self.stock.locks(order_number)
    }
}
