use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::mirror::{MirrorEvent, MirrorTask};
use crate::domain::order::{DeliveryInfo, LineItem, Order, Prices};
use crate::domain::payment::PaymentRecord;
use crate::domain::stock::{InventoryRecord, StockLockEntry, StockTarget};
use crate::schema::{
    legacy_mirror_outbox, locked_stock, orders, payments, product_variants, products,
};

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: i64,
    pub order_number: String,
    pub order_date: DateTime<Utc>,
    pub payment_method: String,
    pub products: String,
    pub quantities: String,
    pub line_items: Value,
    pub total_usd: BigDecimal,
    pub total_bs: BigDecimal,
    pub status: String,
    pub delivery_method: String,
    pub delivery_type: Option<String>,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_national_id: Option<String>,
    pub customer_email: String,
    pub customer_address: Option<String>,
    pub courier: Option<String>,
    pub courier_office: Option<String>,
    pub courier_state: Option<String>,
    pub delivery_instructions: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = DomainError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let items: Vec<LineItem> = serde_json::from_value(row.line_items).map_err(|e| {
            DomainError::Persistence(format!(
                "order {} has unreadable line items: {}",
                row.order_number, e
            ))
        })?;
        Ok(Order {
            id: row.id,
            status: row.status.parse()?,
            order_number: row.order_number,
            created_at: row.order_date,
            payment_method: row.payment_method,
            items,
            totals: Prices::new(row.total_usd, row.total_bs),
            delivery_method: row.delivery_method,
            delivery_type: row.delivery_type,
            delivery: DeliveryInfo {
                name: row.customer_name,
                phone: row.customer_phone,
                national_id: row.customer_national_id,
                email: row.customer_email,
                address: row.customer_address,
                courier: row.courier,
                office: row.courier_office,
                state: row.courier_state,
                instructions: row.delivery_instructions,
            },
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrderRow {
    pub order_number: String,
    pub order_date: DateTime<Utc>,
    pub payment_method: String,
    pub products: String,
    pub quantities: String,
    pub line_items: Value,
    pub total_usd: BigDecimal,
    pub total_bs: BigDecimal,
    pub status: String,
    pub delivery_method: String,
    pub delivery_type: Option<String>,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_national_id: Option<String>,
    pub customer_email: String,
    pub customer_address: Option<String>,
    pub courier: Option<String>,
    pub courier_office: Option<String>,
    pub courier_state: Option<String>,
    pub delivery_instructions: Option<String>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductRow {
    pub id: i64,
    pub name: String,
    pub sku: Option<String>,
    pub stock: i32,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = product_variants)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct VariantRow {
    pub id: i64,
    pub name: String,
    pub sku: Option<String>,
    pub stock: i32,
}

impl From<ProductRow> for InventoryRecord {
    fn from(row: ProductRow) -> Self {
        InventoryRecord {
            id: row.id,
            name: row.name,
            sku: row.sku,
            stock: row.stock,
        }
    }
}

impl From<VariantRow> for InventoryRecord {
    fn from(row: VariantRow) -> Self {
        InventoryRecord {
            id: row.id,
            name: row.name,
            sku: row.sku,
            stock: row.stock,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = products)]
pub struct NewProductRow {
    pub name: String,
    pub sku: Option<String>,
    pub stock: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = product_variants)]
pub struct NewVariantRow {
    pub product_id: i64,
    pub name: String,
    pub sku: Option<String>,
    pub stock: i32,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = locked_stock)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LockRow {
    pub id: i64,
    pub order_number: String,
    pub product_id: Option<i64>,
    pub variant_id: Option<i64>,
    pub quantity: i32,
    pub status: String,
}

impl TryFrom<LockRow> for StockLockEntry {
    type Error = DomainError;

    fn try_from(row: LockRow) -> Result<Self, Self::Error> {
        Ok(StockLockEntry {
            id: row.id,
            target: StockTarget::from_columns(row.product_id, row.variant_id)?,
            status: row.status.parse()?,
            order_number: row.order_number,
            quantity: row.quantity,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = locked_stock)]
pub struct NewLockRow {
    pub order_number: String,
    pub product_id: Option<i64>,
    pub variant_id: Option<i64>,
    pub quantity: i32,
    pub status: String,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = payments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PaymentRow {
    pub id: i64,
    pub order_id: String,
    pub order_row_id: i64,
    pub payment_date: DateTime<Utc>,
    pub method: String,
    pub transaction_id: Option<String>,
    pub usd: BigDecimal,
    pub bs: BigDecimal,
    pub name: String,
    pub email: String,
    pub items: String,
    pub quantity: String,
    pub status: String,
}

impl From<PaymentRow> for PaymentRecord {
    fn from(row: PaymentRow) -> Self {
        PaymentRecord {
            id: row.id,
            order_number: row.order_id,
            order_row_id: row.order_row_id,
            paid_at: row.payment_date,
            method: row.method,
            transaction_id: row.transaction_id,
            usd: row.usd,
            bs: row.bs,
            name: row.name,
            email: row.email,
            items: row.items,
            quantity: row.quantity,
            status: row.status,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = payments)]
pub struct NewPaymentRow {
    pub order_id: String,
    pub order_row_id: i64,
    pub payment_date: DateTime<Utc>,
    pub method: String,
    pub transaction_id: Option<String>,
    pub usd: BigDecimal,
    pub bs: BigDecimal,
    pub name: String,
    pub email: String,
    pub items: String,
    pub quantity: String,
    pub status: String,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = legacy_mirror_outbox)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OutboxEventRow {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub action: String,
    pub payload: Value,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<OutboxEventRow> for MirrorTask {
    fn from(row: OutboxEventRow) -> Self {
        MirrorTask {
            id: row.id,
            event: MirrorEvent {
                aggregate_type: row.aggregate_type,
                aggregate_id: row.aggregate_id,
                action: row.action,
                payload: row.payload,
            },
            attempts: row.attempts,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = legacy_mirror_outbox)]
pub struct NewOutboxEventRow {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub action: String,
    pub payload: Value,
}
