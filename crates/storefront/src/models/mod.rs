//! Domain models for the storefront.
//!
//! These are the persisted record shapes. Store logic lives in
//! [`crate::services`].

pub mod order;
pub mod product;
pub mod user;

pub use order::{Order, OrderItem};
pub use product::{Product, Review};
pub use user::{HistoryEntry, MyReview, Recommendation, User};
