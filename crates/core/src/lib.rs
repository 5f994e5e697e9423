//! Palette Core - Shared types library.
//!
//! This crate provides common types used across all Palette components:
//! - `storefront` - Catalog, cart, wishlist, checkout and account stores
//! - `cli` - Command-line front end for the storefront
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no persistence,
//! no clocks. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, ratings and credentials

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
