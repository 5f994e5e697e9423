//! Wallet commands.

use palette_core::Price;
use palette_storefront::services::wallet;
use palette_storefront::{AppError, Storefront};

use crate::output::say;

/// Show the balance.
///
/// # Errors
///
/// Returns `AppError::Auth` when nobody is signed in.
pub fn balance(shop: &Storefront) -> Result<(), AppError> {
    let user = shop.require_user()?;
    say(format!("Current balance: {}", user.wallet));
    Ok(())
}

/// Add funds.
///
/// # Errors
///
/// Returns `AppError::Wallet` for a non-positive amount or when anonymous.
pub fn deposit(shop: &mut Storefront, amount: Price) -> Result<(), AppError> {
    let balance = wallet::deposit(shop, amount)?;
    say(format!("{amount} added to wallet. Balance: {balance}"));
    Ok(())
}

/// Take funds out.
///
/// # Errors
///
/// Returns `AppError::Wallet` for a bad amount or insufficient balance.
pub fn withdraw(shop: &mut Storefront, amount: Price) -> Result<(), AppError> {
    let balance = wallet::withdraw(shop, amount)?;
    say(format!("{amount} withdrawn from wallet. Balance: {balance}"));
    Ok(())
}
