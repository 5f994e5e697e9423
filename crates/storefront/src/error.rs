//! Unified error handling.
//!
//! Provides a unified `AppError` type for front ends. Every store error
//! converts into it, and [`AppError::user_message`] gives the short notice
//! to show the user without exposing internals.

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::migrate::MigrationError;
use crate::services::auth::AuthError;
use crate::services::checkout::CheckoutError;
use crate::services::profile::ProfileError;
use crate::services::reviews::ReviewError;
use crate::services::wallet::WalletError;
use crate::storage::StorageError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Persistence failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Catalog lookup or loading failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Checkout was refused.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Wallet operation was refused.
    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),

    /// Review was refused.
    #[error("Review error: {0}")]
    Review(#[from] ReviewError),

    /// Profile edit was refused.
    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    /// Configuration is invalid.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Stored records could not be upgraded.
    #[error("Migration error: {0}")]
    Migration(#[from] MigrationError),

    /// Reading user input failed.
    #[error("Input error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// The notice to show the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Storage(_) | Self::Migration(_) => "Something went wrong saving your data".to_string(),
            Self::Config(err) => err.to_string(),
            Self::Catalog(err) => match err {
                CatalogError::NotFound(_) => "Product not found".to_string(),
                _ => "The product catalog could not be loaded".to_string(),
            },
            Self::Auth(err) => auth_message(err),
            Self::Checkout(err) => match err {
                CheckoutError::NotAuthenticated => "Please log in first!".to_string(),
                CheckoutError::EmptyCart => "Your cart is empty".to_string(),
                CheckoutError::TotalOutOfRange => "Cart total is too large".to_string(),
                CheckoutError::InsufficientBalance { .. } => "Not enough balance in wallet!".to_string(),
                CheckoutError::Auth(err) => auth_message(err),
                CheckoutError::Storage(_) => "Something went wrong saving your order".to_string(),
            },
            Self::Wallet(err) => match err {
                WalletError::InvalidAmount(_) => "Enter a valid amount".to_string(),
                WalletError::InsufficientBalance { .. } => "Insufficient balance".to_string(),
                WalletError::BalanceOutOfRange { .. } => "That amount is too large".to_string(),
                WalletError::Auth(err) => auth_message(err),
            },
            Self::Review(err) => match err {
                ReviewError::Auth(AuthError::NotAuthenticated) => {
                    "Please login to leave a review!".to_string()
                }
                ReviewError::Auth(err) => auth_message(err),
                ReviewError::InvalidRating(_) | ReviewError::EmptyComment => {
                    "Please provide a rating and a comment.".to_string()
                }
                ReviewError::Catalog(_) => "Product not found".to_string(),
                ReviewError::Storage(_) => "Something went wrong saving your review".to_string(),
            },
            Self::Profile(err) => match err {
                ProfileError::Auth(err) => auth_message(err),
                other => other.to_string(),
            },
            Self::Io(_) => "Could not read input".to_string(),
        }
    }
}

fn auth_message(err: &AuthError) -> String {
    match err {
        AuthError::InvalidCredentials => "Invalid credentials".to_string(),
        AuthError::EmailTaken => "An account with this email already exists".to_string(),
        AuthError::NotAuthenticated => "Please log in".to_string(),
        AuthError::WeakPassword(msg) => msg.clone(),
        AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
        AuthError::UserMismatch | AuthError::Storage(_) | AuthError::PasswordHash => {
            "Authentication error".to_string()
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use palette_core::{Price, ProductId};

    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::from(CatalogError::NotFound(ProductId::new(9)));
        assert_eq!(err.to_string(), "Catalog error: product not found: 9");
    }

    #[test]
    fn test_user_messages_hide_internals() {
        let err = AppError::from(StorageError::InvalidKey("../etc".to_string()));
        assert!(!err.user_message().contains("etc"));

        let err = AppError::from(AuthError::PasswordHash);
        assert_eq!(err.user_message(), "Authentication error");
    }

    #[test]
    fn test_checkout_messages() {
        let err = AppError::from(CheckoutError::InsufficientBalance {
            balance: Price::from_major(1000),
            total: Price::from_major(1200),
        });
        assert_eq!(err.user_message(), "Not enough balance in wallet!");

        let err = AppError::from(CheckoutError::NotAuthenticated);
        assert_eq!(err.user_message(), "Please log in first!");
    }
}
