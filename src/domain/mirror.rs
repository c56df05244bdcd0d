use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use super::order::{NewOrder, OrderStatus};
use super::payment::NewPayment;

pub const ACTION_CREATE_ORDER: &str = "createOrder";
pub const ACTION_UPDATE_STATUS: &str = "updateOrderStatus";
pub const ACTION_REGISTER_PAYMENT: &str = "registerPayment";

/// A write destined for the legacy tracker, queued in the outbox.
#[derive(Debug, Clone, PartialEq)]
pub struct MirrorEvent {
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub action: String,
    pub payload: Value,
}

impl MirrorEvent {
    pub fn order_created(order: &NewOrder, created_at: DateTime<Utc>) -> Self {
        let d = &order.delivery;
        Self {
            aggregate_type: "Order".to_string(),
            aggregate_id: order.order_number.clone(),
            action: ACTION_CREATE_ORDER.to_string(),
            payload: json!({
                "orderNumber": order.order_number,
                "date": created_at.to_rfc3339(),
                "paymentMethod": order.payment_method,
                "products": order.products_summary(),
                "quantities": order.quantities_summary(),
                "totalUSD": order.totals.usd.to_string(),
                "totalBS": order.totals.bs.to_string(),
                "status": OrderStatus::Pending.as_str(),
                "deliveryMethod": order.delivery_method,
                "deliveryType": order.delivery_type,
                "name": d.name,
                "phone": d.phone,
                "nationalId": d.national_id,
                "email": d.email,
                "address": d.address,
                "courier": d.courier,
                "office": d.office,
                "state": d.state,
                "instructions": d.instructions,
            }),
        }
    }

    pub fn status_changed(order_number: &str, status: OrderStatus) -> Self {
        Self {
            aggregate_type: "Order".to_string(),
            aggregate_id: order_number.to_string(),
            action: ACTION_UPDATE_STATUS.to_string(),
            payload: json!({
                "orderNumber": order_number,
                "status": status.as_str(),
            }),
        }
    }

    /// `linked` is false when the payment could not be tied to an order row.
    pub fn payment_registered(payment: &NewPayment, paid_at: DateTime<Utc>) -> Self {
        Self {
            aggregate_type: "Payment".to_string(),
            aggregate_id: payment
                .transaction_id
                .clone()
                .unwrap_or_else(|| payment.order_number.clone()),
            action: ACTION_REGISTER_PAYMENT.to_string(),
            payload: json!({
                "orderNumber": payment.order_number,
                "date": paid_at.to_rfc3339(),
                "method": payment.method,
                "transactionId": payment.transaction_id,
                "totalUSD": payment.usd.to_string(),
                "totalBS": payment.bs.to_string(),
                "name": payment.name,
                "email": payment.email,
                "items": payment.items,
                "quantity": payment.quantity,
                "status": payment.status,
                "linked": payment.order_row_id.is_some(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MirrorTask {
    pub id: Uuid,
    pub event: MirrorEvent,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use bigdecimal::BigDecimal;

    use super::*;
    use crate::domain::order::{DeliveryInfo, LineItem, Prices};

    #[test]
    fn status_change_payload() {
        let event = MirrorEvent::status_changed("NOV-12345678", OrderStatus::Completed);
        assert_eq!(event.action, ACTION_UPDATE_STATUS);
        assert_eq!(event.aggregate_id, "NOV-12345678");
        assert_eq!(event.payload["status"], "completed");
    }

    #[test]
    fn order_created_payload_is_always_pending() {
        let order = NewOrder {
            order_number: "NOV-12345678".into(),
            payment_method: "paypal".into(),
            items: vec![LineItem {
                product: "Widget".into(),
                sku: None,
                quantity: 2,
                price_usd: BigDecimal::from(5),
                price_bs: BigDecimal::from(180),
            }],
            totals: Prices::new(BigDecimal::from(10), BigDecimal::from(360)),
            delivery_method: "pickup".into(),
            delivery_type: None,
            delivery: DeliveryInfo::default(),
            requested_status: Some(OrderStatus::Completed),
        };

        let event = MirrorEvent::order_created(&order, Utc::now());
        assert_eq!(event.action, ACTION_CREATE_ORDER);
        assert_eq!(event.payload["status"], "pending");
        assert_eq!(event.payload["products"], "Widget");
        assert_eq!(event.payload["quantities"], "2");
        assert_eq!(event.payload["totalUSD"], "10");
    }

    #[test]
    fn payment_event_is_keyed_by_transaction_id() {
        let payment = NewPayment {
            order_number: "NOV-12345678".into(),
            order_row_id: None,
            method: "paypal".into(),
            transaction_id: Some("TX-1".into()),
            usd: BigDecimal::from(10),
            bs: BigDecimal::from(360),
            name: "Ana".into(),
            email: "ana@example.com".into(),
            items: "Widget".into(),
            quantity: "2".into(),
            status: "completed".into(),
        };

        let event = MirrorEvent::payment_registered(&payment, Utc::now());
        assert_eq!(event.aggregate_id, "TX-1");
        assert_eq!(event.payload["linked"], false);

        let unkeyed = NewPayment {
            transaction_id: None,
            order_row_id: Some(3),
            ..payment
        };
        let event = MirrorEvent::payment_registered(&unkeyed, Utc::now());
        assert_eq!(event.aggregate_id, "NOV-12345678");
        assert_eq!(event.payload["linked"], true);
    }
}
