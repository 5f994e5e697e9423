//! Simulated wallet top-ups and withdrawals.

use thiserror::Error;

use palette_core::Price;

use crate::services::auth::AuthError;
use crate::state::Storefront;

/// Errors that can occur when moving wallet funds.
#[derive(Debug, Error)]
pub enum WalletError {
    /// Amount is zero or negative.
    #[error("enter a valid amount")]
    InvalidAmount(Price),

    /// Withdrawal larger than the balance.
    #[error("insufficient balance: have {balance}, asked for {amount}")]
    InsufficientBalance {
        /// Current balance.
        balance: Price,
        /// Requested withdrawal.
        amount: Price,
    },

    /// Deposit would push the balance out of range.
    #[error("balance out of range: have {balance}, adding {amount}")]
    BalanceOutOfRange {
        /// Current balance.
        balance: Price,
        /// Requested deposit.
        amount: Price,
    },

    /// Not signed in, or the user could not be saved.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Add funds to the signed-in user's wallet. Returns the new balance.
///
/// # Errors
///
/// Returns `WalletError::InvalidAmount` unless `amount` is positive,
/// `WalletError::BalanceOutOfRange` if the new balance cannot be
/// represented, and `WalletError::Auth` when anonymous or if saving fails.
pub fn deposit(ctx: &mut Storefront, amount: Price) -> Result<Price, WalletError> {
    if !amount.is_positive() {
        return Err(WalletError::InvalidAmount(amount));
    }

    let mut user = ctx.auth.require_user()?.clone();
    let balance = user
        .wallet
        .checked_add(amount)
        .ok_or(WalletError::BalanceOutOfRange {
            balance: user.wallet,
            amount,
        })?;
    user.wallet = balance;

    ctx.auth.update_user(ctx.storage.as_ref(), user)?;
    tracing::info!(%amount, %balance, "wallet deposit");
    Ok(balance)
}

/// Take funds out of the signed-in user's wallet. Returns the new balance.
///
/// # Errors
///
/// Returns `WalletError::InvalidAmount` unless `amount` is positive,
/// `WalletError::InsufficientBalance` if it exceeds the balance, and
/// `WalletError::Auth` when anonymous or if saving fails.
pub fn withdraw(ctx: &mut Storefront, amount: Price) -> Result<Price, WalletError> {
    if !amount.is_positive() {
        return Err(WalletError::InvalidAmount(amount));
    }

    let mut user = ctx.auth.require_user()?.clone();
    let balance = user
        .wallet
        .checked_sub(amount)
        .ok_or(WalletError::InsufficientBalance {
            balance: user.wallet,
            amount,
        })?;
    user.wallet = balance;

    ctx.auth.update_user(ctx.storage.as_ref(), user)?;
    tracing::info!(%amount, %balance, "wallet withdrawal");
    Ok(balance)
}
