//! Integration tests for Palette.
//!
//! Every test runs the storefront against a real [`FileStorage`] in a
//! throwaway directory, so restarts and crash recovery go through the same
//! code paths as the `palette` binary.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p palette-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `restart` - State that must survive reopening the store
//! - `recovery` - Journal replay after an interrupted batch
//! - `migration` - Upgrading records written by the browser storefront
//! - `checkout` - End-to-end purchase flows

use std::path::Path;

use palette_core::Price;
use palette_storefront::catalog::Catalog;
use palette_storefront::models::User;
use palette_storefront::services::{CredentialHasher, HashCost, Registration};
use palette_storefront::storage::FileStorage;
use palette_storefront::{AppError, Storefront};
use tempfile::TempDir;

/// Password used for every test account.
pub const PASSWORD: &str = "sketch42";

/// A data directory that outlives individual [`Storefront`] sessions.
pub struct TestShop {
    dir: TempDir,
}

impl TestShop {
    /// Create an empty data directory.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the temp directory cannot be created.
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    /// The data directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Start a new session, as if the process had just launched.
    ///
    /// # Errors
    ///
    /// Returns `AppError` if the store cannot be opened.
    pub fn open(&self) -> Result<Storefront, AppError> {
        Storefront::open(
            Box::new(FileStorage::open(self.path())?),
            Catalog::builtin()?,
            CredentialHasher::new(HashCost::Low),
        )
    }

    /// Write a raw record file, bypassing the store.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be written.
    pub fn seed(&self, key: &str, json: &str) -> std::io::Result<()> {
        std::fs::write(self.path().join(format!("{key}.json")), json)
    }
}

/// Register a user and give them `balance` rupees.
///
/// # Errors
///
/// Returns `AppError` if registration or the wallet update fails.
pub fn register(shop: &mut Storefront, name: &str, email: &str, balance: i64) -> Result<User, AppError> {
    let mut user = shop.register(Registration {
        name,
        email,
        password: PASSWORD,
        phone: "9876543210",
        country_code: "+91",
        address: "12 MG Road, Pune",
    })?;
    user.wallet = Price::from_major(balance);
    shop.update_user(user.clone())?;
    Ok(user)
}
