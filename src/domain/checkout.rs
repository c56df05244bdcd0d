use serde::{Deserialize, Serialize};

use super::discount::{effective_unit_price, PricedProduct};
use super::errors::DomainError;
use super::order::{DeliveryInfo, LineItem, NewOrder, OrderStatus, Prices};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product: PricedProduct,
    pub quantity: i32,
}

/// Everything a multi-step checkout carries between requests. The caller owns
/// persistence of the session; the order core only ever receives it by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub cart: Vec<CartLine>,
    pub payment_method: String,
    pub delivery_method: String,
    #[serde(default)]
    pub delivery_type: Option<String>,
    pub delivery: DeliveryInfo,
    /// Status the storefront intends to display once checkout finishes.
    #[serde(default)]
    pub ui_status: Option<OrderStatus>,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

impl CheckoutSession {
    /// Prices every cart line at its effective (discounted) unit price and
    /// totals the order in both currencies.
    pub fn to_new_order(&self, order_number: impl Into<String>) -> Result<NewOrder, DomainError> {
        if self.cart.is_empty() {
            return Err(DomainError::InvalidInput("cart is empty".into()));
        }

        let items: Vec<LineItem> = self
            .cart
            .iter()
            .map(|line| {
                let unit = effective_unit_price(&line.product);
                LineItem {
                    product: line.product.name.clone(),
                    sku: line.product.sku.clone(),
                    quantity: line.quantity,
                    price_usd: unit.usd,
                    price_bs: unit.bs,
                }
            })
            .collect();
        let totals = Prices::from_items(&items);

        let order = NewOrder {
            order_number: order_number.into(),
            payment_method: self.payment_method.clone(),
            items,
            totals,
            delivery_method: self.delivery_method.clone(),
            delivery_type: self.delivery_type.clone(),
            delivery: self.delivery.clone(),
            requested_status: self.ui_status,
        };
        order.validate()?;
        Ok(order)
    }
}
