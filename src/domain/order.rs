use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Amounts carried in both storefront currencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prices {
    pub usd: BigDecimal,
    pub bs: BigDecimal,
}

impl Prices {
    pub fn new(usd: BigDecimal, bs: BigDecimal) -> Self {
        Self { usd, bs }
    }

    pub fn zero() -> Self {
        Self::new(BigDecimal::from(0), BigDecimal::from(0))
    }

    /// Sums `quantity * unit price` over every line.
    pub fn from_items(items: &[LineItem]) -> Self {
        items.iter().fold(Self::zero(), |acc, item| {
            let qty = BigDecimal::from(item.quantity);
            Self {
                usd: acc.usd + &item.price_usd * &qty,
                bs: acc.bs + &item.price_bs * &qty,
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Whether `self -> next` is an edge of the lifecycle. Staying in the same
    /// state is not an edge; callers treat it as a no-op before asking.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Completed)
                | (Pending, Cancelled)
                | (Processing, Completed)
                | (Processing, Cancelled)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" | "canceled" => Ok(OrderStatus::Cancelled),
            other => Err(DomainError::InvalidInput(format!(
                "unknown order status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product: String,
    #[serde(default)]
    pub sku: Option<String>,
    pub quantity: i32,
    pub price_usd: BigDecimal,
    pub price_bs: BigDecimal,
}

/// Who receives the order and where. Either `address` (home delivery) or the
/// courier/office/state triple (pickup at a courier office) is filled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryInfo {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub national_id: Option<String>,
    pub email: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub courier: Option<String>,
    #[serde(default)]
    pub office: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub payment_method: String,
    pub items: Vec<LineItem>,
    pub totals: Prices,
    pub delivery_method: String,
    pub delivery_type: Option<String>,
    pub delivery: DeliveryInfo,
    /// Status the storefront would like to show. Never persisted: new orders
    /// are always stored as pending.
    pub requested_status: Option<OrderStatus>,
}

impl NewOrder {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.order_number.trim().is_empty() {
            return Err(DomainError::InvalidInput("order number is empty".into()));
        }
        if self.items.is_empty() {
            return Err(DomainError::InvalidInput(format!(
                "order {} has no line items",
                self.order_number
            )));
        }
        if let Some(item) = self.items.iter().find(|i| i.quantity <= 0) {
            return Err(DomainError::InvalidInput(format!(
                "line '{}' has non-positive quantity {}",
                item.product, item.quantity
            )));
        }
        Ok(())
    }

    pub fn products_summary(&self) -> String {
        join_products(&self.items)
    }

    pub fn quantities_summary(&self) -> String {
        join_quantities(&self.items)
    }
}

pub fn join_products(items: &[LineItem]) -> String {
    items
        .iter()
        .map(|i| i.product.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn join_quantities(items: &[LineItem]) -> String {
    items
        .iter()
        .map(|i| i.quantity.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: i64,
    pub order_number: String,
    pub created_at: DateTime<Utc>,
    pub payment_method: String,
    pub items: Vec<LineItem>,
    pub totals: Prices,
    pub status: OrderStatus,
    pub delivery_method: String,
    pub delivery_type: Option<String>,
    pub delivery: DeliveryInfo,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ListResult {
    pub items: Vec<Order>,
    pub total: i64,
}

/// Result of `create_order`. A repeated order number is not an error: the
/// first stored order is handed back unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOrderOutcome {
    Created(Order),
    Existing(Order),
}

impl CreateOrderOutcome {
    pub fn order(&self) -> &Order {
        match self {
            CreateOrderOutcome::Created(o) | CreateOrderOutcome::Existing(o) => o,
        }
    }

    pub fn into_order(self) -> Order {
        match self {
            CreateOrderOutcome::Created(o) | CreateOrderOutcome::Existing(o) => o,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, CreateOrderOutcome::Created(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(product: &str, quantity: i32, usd: i32, bs: i32) -> LineItem {
        LineItem {
            product: product.to_string(),
            sku: None,
            quantity,
            price_usd: BigDecimal::from(usd),
            price_bs: BigDecimal::from(bs),
        }
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert_eq!("Canceled".parse::<OrderStatus>().unwrap(), OrderStatus::Cancelled);
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn lifecycle_edges() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Pending.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Cancelled));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(!Processing.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn totals_sum_quantity_times_price() {
        let totals = Prices::from_items(&[item("Widget", 2, 5, 180), item("Gadget", 1, 3, 100)]);
        assert_eq!(totals.usd, BigDecimal::from(13));
        assert_eq!(totals.bs, BigDecimal::from(460));
    }

    #[test]
    fn validate_rejects_empty_and_non_positive_lines() {
        let mut order = NewOrder {
            order_number: "NOV-12345678".into(),
            payment_method: "paypal".into(),
            items: vec![],
            totals: Prices::zero(),
            delivery_method: "pickup".into(),
            delivery_type: None,
            delivery: DeliveryInfo::default(),
            requested_status: None,
        };
        assert!(matches!(order.validate(), Err(DomainError::InvalidInput(_))));

        order.items = vec![item("Widget", 0, 5, 180)];
        assert!(matches!(order.validate(), Err(DomainError::InvalidInput(_))));

        order.items = vec![item("Widget", 2, 5, 180)];
        assert!(order.validate().is_ok());
    }

    #[test]
    fn summaries_join_lines() {
        let items = vec![item("Widget", 2, 5, 180), item("Gadget", 1, 3, 100)];
        assert_eq!(join_products(&items), "Widget, Gadget");
        assert_eq!(join_quantities(&items), "2, 1");
    }
}
