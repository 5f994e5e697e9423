//! Order ledger types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use palette_core::{OrderId, PaymentMethod, Price, ProductId, UserId};

/// A completed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Order ID.
    pub id: OrderId,
    /// Who placed the order. `None` only for records that predate ownership.
    #[serde(default)]
    pub user_id: Option<UserId>,
    /// Purchased lines, snapshotted at checkout.
    pub items: Vec<OrderItem>,
    /// Amount charged.
    pub total: Price,
    /// When the order was placed.
    pub date: DateTime<Utc>,
    /// How it was paid for.
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

/// A purchased line: product details as they were at purchase time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Product that was bought.
    pub id: ProductId,
    /// Product name at purchase time.
    pub name: String,
    /// Unit price at purchase time.
    pub price: Price,
    /// Units bought.
    pub quantity: u32,
}

impl OrderItem {
    /// Price times quantity, or `None` if out of range.
    #[must_use]
    pub fn line_total(&self) -> Option<Price> {
        self.price.checked_mul(self.quantity)
    }
}
