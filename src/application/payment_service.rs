use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;

use crate::domain::errors::DomainError;
use crate::domain::mirror::MirrorEvent;
use crate::domain::payment::{stored_status, NewPayment, OrderRef, PaymentData, PaymentOutcome, PaymentRecord};
use crate::domain::ports::{MirrorOutbox, OrderRepository, PaymentRepository};

/// Records provider-confirmed payments against their order.
///
/// The recorder never changes an order's status; what the storefront shows
/// after payment is its own business.
pub struct PaymentRecorder<P, O, M> {
    payments: P,
    orders: O,
    outbox: M,
    order_rows: Mutex<HashMap<String, i64>>,
}

impl<P, O, M> PaymentRecorder<P, O, M>
where
    P: PaymentRepository,
    O: OrderRepository,
    M: MirrorOutbox,
{
    pub fn new(payments: P, orders: O, outbox: M) -> Self {
        Self {
            payments,
            orders,
            outbox,
            order_rows: Mutex::new(HashMap::new()),
        }
    }

    /// Pre-seeds the order number to row id cache, e.g. right after checkout
    /// created the order.
    pub fn remember_order(&self, order_number: &str, row_id: i64) {
        if let Ok(mut rows) = self.order_rows.lock() {
            rows.insert(order_number.to_string(), row_id);
        }
    }

    /// Stores the payment once per transaction id.
    ///
    /// Returns `PaymentNotConfirmed` when the provider status is not a success
    /// status (the row is still stored with that status), and `PaymentUnlinked`
    /// when no order row could be found (only the legacy mirror write is made).
    pub fn record_payment(&self, data: &PaymentData, order: &OrderRef) -> Result<PaymentOutcome, DomainError> {
        if let Some(tx) = data.transaction_id() {
            if let Some(existing) = self.payments.find_by_transaction_id(tx)? {
                log::info!("Payment {} already recorded, not inserting again", tx);
                return confirmed(PaymentOutcome::AlreadyRecorded(existing));
            }
        }

        let resolved = self.resolve_order(order);
        let payment = NewPayment {
            order_number: resolved
                .as_ref()
                .map_or_else(|| order.order_number.clone(), |(_, number)| number.clone()),
            order_row_id: resolved.map(|(id, _)| id),
            method: data.payment_method.clone(),
            transaction_id: data.transaction_id().map(String::from),
            usd: data.total_usd.clone(),
            bs: data.total_bs.clone(),
            name: data.customer_name.clone(),
            email: data.customer_email.clone(),
            items: data.items.clone(),
            quantity: data.quantities.clone(),
            status: stored_status(&data.status),
        };
        let mirror = MirrorEvent::payment_registered(&payment, Utc::now());

        if payment.order_row_id.is_none() {
            if let Err(e) = self.outbox.enqueue(&mirror) {
                log::error!(
                    "Payment {}: mirror write for unlinked payment failed: {}",
                    data.reference(),
                    e
                );
            }
            log::warn!(
                "Payment {} could not be linked to order {}",
                data.reference(),
                order.order_number
            );
            return Err(DomainError::PaymentUnlinked {
                reference: data.reference().to_string(),
                order_number: order.order_number.clone(),
            });
        }

        let outcome = match self.payments.insert(&payment, &mirror) {
            Ok(record) => {
                log::info!(
                    "Recorded payment {} for order {} ({})",
                    data.reference(),
                    record.order_number,
                    record.status
                );
                PaymentOutcome::Recorded(record)
            }
            Err(DomainError::Conflict(reason)) => {
                let existing = match payment.transaction_id.as_deref() {
                    Some(tx) => self.payments.find_by_transaction_id(tx)?,
                    None => None,
                };
                match existing {
                    Some(existing) => PaymentOutcome::AlreadyRecorded(existing),
                    None => return Err(DomainError::Conflict(reason)),
                }
            }
            Err(e) => return Err(e),
        };

        confirmed(outcome)
    }

    pub fn payments_for_order(&self, order_number: &str) -> Result<Vec<PaymentRecord>, DomainError> {
        self.payments.list_for_order(order_number)
    }

    /// Row id and order number the payment is stored under. The explicit row
    /// id wins, then the cache, then a lookup by number; the number always
    /// comes from the resolved row. A failed lookup counts as unresolved.
    fn resolve_order(&self, order: &OrderRef) -> Option<(i64, String)> {
        let hinted = order.row_id.or_else(|| {
            self.order_rows
                .lock()
                .ok()
                .and_then(|rows| rows.get(&order.order_number).copied())
        });
        if let Some(id) = hinted {
            match self.orders.find_by_id(id) {
                Ok(Some(found)) => {
                    if found.order_number != order.order_number {
                        log::warn!(
                            "Order row {} belongs to {}, recording payment for {} against it",
                            id,
                            found.order_number,
                            order.order_number
                        );
                    }
                    return Some((found.id, found.order_number));
                }
                Ok(None) => log::warn!("Order row {} is gone, looking up {}", id, order.order_number),
                Err(e) => log::warn!("Order row {} lookup failed: {}", id, e),
            }
        }

        match self.orders.find_by_number(&order.order_number) {
            Ok(Some(found)) => {
                self.remember_order(&found.order_number, found.id);
                Some((found.id, found.order_number))
            }
            Ok(None) => None,
            Err(e) => {
                log::warn!("Order {} lookup failed: {}", order.order_number, e);
                None
            }
        }
    }
}

fn confirmed(outcome: PaymentOutcome) -> Result<PaymentOutcome, DomainError> {
    let record = outcome.record();
    if record.is_confirmed() {
        Ok(outcome)
    } else {
        Err(DomainError::PaymentNotConfirmed {
            reference: record
                .transaction_id
                .clone()
                .unwrap_or_else(|| record.order_number.clone()),
            status: record.status.clone(),
        })
    }
}
