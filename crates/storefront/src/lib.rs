//! Palette Storefront library.
//!
//! Catalog, cart, wishlist, checkout and account stores for the Palette
//! art-supplies shop, persisted to a local key-value store of JSON records.
//!
//! Front ends build one [`Storefront`] at start and pass it by reference:
//!
//! ```rust,ignore
//! let config = StorefrontConfig::from_env()?;
//! let mut shop = Storefront::from_config(&config)?;
//! shop.login("asha@example.com", "sketch42")?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod config;
pub mod error;
pub mod ids;
pub mod migrate;
pub mod models;
pub mod services;
pub mod state;
pub mod storage;

pub use config::StorefrontConfig;
pub use error::AppError;
pub use state::Storefront;
