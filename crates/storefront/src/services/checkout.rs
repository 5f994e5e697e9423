//! Checkout: turns the session cart into a recorded order.
//!
//! The wallet debit, the signed-in user record and the ledger append are
//! committed as one storage batch. In-memory state and the cart change only
//! after that batch lands, so a failure at any point leaves the wallet, the
//! cart and the ledger as they were.

use chrono::Utc;
use thiserror::Error;
use tracing::instrument;

use palette_core::{OrderId, PaymentMethod, Price};

use crate::models::{Order, OrderItem};
use crate::services::auth::AuthError;
use crate::state::Storefront;
use crate::storage::{StorageError, WriteBatch};

/// Reasons a checkout can be refused.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Nobody is signed in.
    #[error("please log in first")]
    NotAuthenticated,

    /// There is nothing to buy.
    #[error("cart is empty")]
    EmptyCart,

    /// Cart total is too large to represent.
    #[error("cart total is out of range")]
    TotalOutOfRange,

    /// Wallet balance is below the cart total.
    #[error("not enough balance in wallet: have {balance}, need {total}")]
    InsufficientBalance {
        /// Balance at the time of checkout.
        balance: Price,
        /// Cart total.
        total: Price,
    },

    /// Updating the user failed.
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    /// The order could not be saved.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Place an order for everything in the cart.
///
/// Debits the signed-in user's wallet by the cart total, records the order
/// in the ledger with the chosen payment method, and empties the cart.
///
/// # Errors
///
/// Returns `CheckoutError::NotAuthenticated` when anonymous,
/// `CheckoutError::EmptyCart` for an empty cart,
/// `CheckoutError::InsufficientBalance` when the wallet cannot cover the
/// total, and `CheckoutError::Storage` if the batch cannot be committed.
#[instrument(skip(ctx))]
pub fn checkout(ctx: &mut Storefront, payment_method: PaymentMethod) -> Result<Order, CheckoutError> {
    let user = ctx
        .auth
        .current_user()
        .ok_or(CheckoutError::NotAuthenticated)?;

    if ctx.cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let total = ctx.cart.total().ok_or(CheckoutError::TotalOutOfRange)?;
    let Some(remaining) = user.wallet.checked_sub(total) else {
        tracing::info!(user_id = %user.id, balance = %user.wallet, %total, "checkout refused");
        return Err(CheckoutError::InsufficientBalance {
            balance: user.wallet,
            total,
        });
    };

    let order = Order {
        id: OrderId::generate(),
        user_id: Some(user.id),
        items: ctx
            .cart
            .items()
            .iter()
            .map(|item| OrderItem {
                id: item.product.id,
                name: item.product.name.clone(),
                price: item.product.price,
                quantity: item.quantity,
            })
            .collect(),
        total,
        date: Utc::now(),
        payment_method,
    };

    let mut updated = user.clone();
    updated.wallet = remaining;

    let mut batch = WriteBatch::new();
    let users = ctx.auth.stage_update(&updated, &mut batch)?;
    let orders = ctx.orders.stage_order(&order, &mut batch)?;
    ctx.storage.commit(batch)?;

    tracing::info!(
        user_id = %updated.id,
        order_id = %order.id,
        %total,
        balance = %remaining,
        "order placed"
    );

    ctx.auth.apply_update(updated, users);
    ctx.orders.apply_orders(orders);
    ctx.cart.clear();

    Ok(order)
}
