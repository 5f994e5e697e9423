//! Session cart.
//!
//! The cart lives for one session only and is never persisted. Every line
//! holds a positive quantity; a line whose quantity would drop to zero is
//! removed instead.

use serde::{Deserialize, Serialize};

use palette_core::{Price, ProductId};

use crate::models::Product;

/// A product in the cart with its quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Product as it was when first added.
    #[serde(flatten)]
    pub product: Product,
    /// Units in the cart, always at least one.
    pub quantity: u32,
}

impl CartItem {
    /// Unit price times quantity, or `None` if out of range.
    #[must_use]
    pub fn line_total(&self) -> Option<Price> {
        self.product.price.checked_mul(self.quantity)
    }
}

/// Ordered list of cart lines, one per product.
#[derive(Debug, Clone, Default)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `quantity` units of `product`.
    ///
    /// Increases an existing line or appends a new one. Returns `true` only
    /// when a new line was created. Adding zero units does nothing.
    pub fn add(&mut self, product: &Product, quantity: u32) -> bool {
        if quantity == 0 {
            return false;
        }

        tracing::debug!(product_id = %product.id, quantity, "added to cart");

        if let Some(item) = self.items.iter_mut().find(|i| i.product.id == product.id) {
            item.quantity = item.quantity.saturating_add(quantity);
            return false;
        }

        self.items.push(CartItem {
            product: product.clone(),
            quantity,
        });
        true
    }

    /// Take `quantity` units of a product out of the cart.
    ///
    /// The line is removed when its quantity reaches zero. Returns `false`
    /// if the product is not in the cart.
    pub fn decrease(&mut self, id: ProductId, quantity: u32) -> bool {
        let Some(item) = self.items.iter_mut().find(|i| i.product.id == id) else {
            return false;
        };

        item.quantity = item.quantity.saturating_sub(quantity);
        if item.quantity == 0 {
            self.items.retain(|i| i.quantity > 0);
        }

        tracing::debug!(product_id = %id, quantity, "decreased cart line");
        true
    }

    /// Remove a product's line. Returns `false` if it was not in the cart.
    pub fn remove(&mut self, id: ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.product.id != id);
        let removed = self.items.len() != before;
        if removed {
            tracing::debug!(product_id = %id, "removed from cart");
        }
        removed
    }

    /// Empty the cart.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Sum of every line's price times quantity, or `None` if the amount
    /// is out of range.
    #[must_use]
    pub fn total(&self) -> Option<Price> {
        self.items
            .iter()
            .try_fold(Price::ZERO, |total, item| total.checked_add(item.line_total()?))
    }

    /// Total units across all lines.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.items
            .iter()
            .fold(0_u32, |acc, i| acc.saturating_add(i.quantity))
    }

    /// Cart lines in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
