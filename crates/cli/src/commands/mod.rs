//! CLI command implementations.

pub mod account;
pub mod catalog;
pub mod orders;
pub mod shop;
pub mod wallet;
