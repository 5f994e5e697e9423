//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Registration, login and the user roster
//! - `cart` - Session cart
//! - `wishlist` - Session wishlist
//! - `orders` - Completed-order ledger
//! - `checkout` - Cart to order, paid from the wallet
//! - `wallet` - Wallet deposits and withdrawals
//! - `reviews` - Product reviews
//! - `profile` - Profile editing

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod orders;
pub mod profile;
pub mod reviews;
pub mod wallet;
pub mod wishlist;

pub use auth::{AuthError, AuthStore, CredentialHasher, HashCost, Registration};
pub use cart::{Cart, CartItem};
pub use checkout::{CheckoutError, checkout};
pub use orders::OrderStore;
pub use profile::{ProfileError, ProfileForm};
pub use reviews::{ReviewError, submit_review};
pub use wallet::WalletError;
pub use wishlist::Wishlist;
