use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored status of a payment the provider confirmed.
pub const COMPLETED: &str = "completed";

/// Provider statuses that count as a successful payment (compared
/// case-insensitively).
const CONFIRMED_STATUSES: [&str; 3] = ["completed", "paid", "success"];

pub fn is_confirmed_status(raw: &str) -> bool {
    let raw = raw.trim();
    CONFIRMED_STATUSES.iter().any(|s| s.eq_ignore_ascii_case(raw))
}

/// Status to persist for a provider-reported status: the `completed` marker
/// for whitelisted statuses, otherwise the provider's value untouched.
pub fn stored_status(raw: &str) -> String {
    if is_confirmed_status(raw) {
        COMPLETED.to_string()
    } else {
        raw.trim().to_string()
    }
}

/// Provider response, already normalised by the checkout layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentData {
    pub order_number: String,
    #[serde(default)]
    pub transaction_id: Option<String>,
    pub total_usd: BigDecimal,
    pub total_bs: BigDecimal,
    pub payment_method: String,
    pub status: String,
    pub customer_name: String,
    pub customer_email: String,
    #[serde(default)]
    pub items: String,
    #[serde(default)]
    pub quantities: String,
}

impl PaymentData {
    pub fn transaction_id(&self) -> Option<&str> {
        self.transaction_id
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Identity used in logs and errors: the transaction id, else the order number.
    pub fn reference(&self) -> &str {
        self.transaction_id().unwrap_or(&self.order_number)
    }
}

/// How the caller points at the order a payment belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRef {
    pub order_number: String,
    /// Row identifier when the caller already knows it.
    pub row_id: Option<i64>,
}

impl OrderRef {
    pub fn by_number(order_number: impl Into<String>) -> Self {
        Self {
            order_number: order_number.into(),
            row_id: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub order_number: String,
    /// `None` when no order row could be resolved; such payments are only
    /// mirrored, never stored.
    pub order_row_id: Option<i64>,
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

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentRecord {
    pub id: i64,
    pub order_number: String,
    pub order_row_id: i64,
    pub paid_at: DateTime<Utc>,
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

impl PaymentRecord {
    pub fn is_confirmed(&self) -> bool {
        self.status == COMPLETED
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Recorded(PaymentRecord),
    /// The transaction id was already on file; nothing new was written.
    AlreadyRecorded(PaymentRecord),
}

impl PaymentOutcome {
    pub fn record(&self) -> &PaymentRecord {
        match self {
            PaymentOutcome::Recorded(r) | PaymentOutcome::AlreadyRecorded(r) => r,
        }
    }

    pub fn into_record(self) -> PaymentRecord {
        match self {
            PaymentOutcome::Recorded(r) | PaymentOutcome::AlreadyRecorded(r) => r,
        }
    }
}
