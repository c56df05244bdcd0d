use crate::domain::errors::DomainError;
use crate::domain::order::LineItem;
use crate::domain::ports::StockRepository;
use crate::domain::stock::{LockStatus, NewStockLock, StockLockEntry, StockTarget};

/// Result of [`StockReservationEngine::lock`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockReport {
    pub locked: usize,
    /// Targets that already had a `locked` or `completed` entry.
    pub skipped_existing: usize,
    /// Line items that matched neither a variant nor a product.
    pub unresolved: Vec<String>,
}

/// Result of [`StockReservationEngine::commit`] and [`StockReservationEngine::release`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettleReport {
    pub settled: usize,
    /// Entries that were no longer `locked` when we got to them.
    pub skipped: usize,
    pub failed: usize,
}

pub struct StockReservationEngine<S> {
    repo: S,
}

impl<S: StockRepository> StockReservationEngine<S> {
    pub fn new(repo: S) -> Self {
        Self { repo }
    }

    /// Variant matches win over product matches. An empty SKU never matches.
    pub fn resolve(&self, name: &str, sku: Option<&str>) -> Result<Option<StockTarget>, DomainError> {
        let sku = sku.map(str::trim).filter(|s| !s.is_empty());
        if let Some(variant) = self.repo.find_variant(name, sku)? {
            return Ok(Some(StockTarget::Variant(variant.id)));
        }
        Ok(self
            .repo
            .find_product(name, sku)?
            .map(|p| StockTarget::Product(p.id)))
    }

    pub fn lock(&self, order_number: &str, items: &[LineItem]) -> Result<LockReport, DomainError> {
        let mut report = LockReport::default();

        // Several lines can resolve to the same record; they share one entry.
        let mut wanted: Vec<(StockTarget, i32)> = Vec::new();
        for item in items {
            match self.resolve(&item.product, item.sku.as_deref())? {
                Some(target) => match wanted.iter_mut().find(|(t, _)| *t == target) {
                    Some((_, qty)) => {
                        *qty = qty.checked_add(item.quantity).ok_or_else(|| {
                            DomainError::InvalidInput(format!(
                                "order {order_number}: combined quantity for '{}' is too large",
                                item.product
                            ))
                        })?;
                    }
                    None => wanted.push((target, item.quantity)),
                },
                None => {
                    log::warn!(
                        "Order {}: no product or variant matches '{}', not locking it",
                        order_number,
                        item.product
                    );
                    report.unresolved.push(item.product.clone());
                }
            }
        }

        let existing = self.repo.locks_for_order(order_number)?;
        let mut fresh = Vec::with_capacity(wanted.len());
        for (target, quantity) in wanted {
            let held = existing
                .iter()
                .any(|l| l.target == target && l.status != LockStatus::Released);
            if held {
                report.skipped_existing += 1;
            } else {
                fresh.push(NewStockLock {
                    order_number: order_number.to_string(),
                    target,
                    quantity,
                });
            }
        }

        if !fresh.is_empty() {
            report.locked = self.repo.insert_locks(&fresh)?;
        }
        log::info!(
            "Order {}: locked {} stock entries ({} already held, {} unresolved)",
            order_number,
            report.locked,
            report.skipped_existing,
            report.unresolved.len()
        );
        Ok(report)
    }

    /// Turns every `locked` entry into a permanent decrement. Entries already
    /// completed are never touched again, so repeated calls are harmless.
    pub fn commit(&self, order_number: &str) -> Result<SettleReport, DomainError> {
        self.settle(order_number, "commit", |id| {
            Ok(self.repo.complete_lock(id)?.map(|remaining| {
                log::debug!("Lock {id}: stock now {remaining}");
            }))
        })
    }

    pub fn release(&self, order_number: &str) -> Result<SettleReport, DomainError> {
        self.settle(order_number, "release", |id| {
            Ok(self.repo.release_lock(id)?.then_some(()))
        })
    }

    pub fn locks(&self, order_number: &str) -> Result<Vec<StockLockEntry>, DomainError> {
        self.repo.locks_for_order(order_number)
    }

    fn settle<F>(&self, order_number: &str, what: &str, mut apply: F) -> Result<SettleReport, DomainError>
    where
        F: FnMut(i64) -> Result<Option<()>, DomainError>,
    {
        let mut report = SettleReport::default();
        let entries = self.repo.locks_for_order(order_number)?;

        for entry in entries.iter().filter(|e| e.status == LockStatus::Locked) {
            match apply(entry.id) {
                Ok(Some(())) => report.settled += 1,
                Ok(None) => report.skipped += 1,
                Err(e) => {
                    log::error!(
                        "Order {}: {} of lock {} failed: {}",
                        order_number,
                        what,
                        entry.id,
                        e
                    );
                    report.failed += 1;
                }
            }
        }
        log::info!(
            "Order {}: {} settled {} lock entries ({} skipped, {} failed)",
            order_number,
            what,
            report.settled,
            report.skipped,
            report.failed
        );
        Ok(report)
    }
}
