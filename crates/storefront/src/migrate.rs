//! Upgrades of persisted records between schema versions.
//!
//! Records written before versioning (version 0) differ from the current
//! layout in three ways:
//!
//! - users carry a plaintext `password` instead of `passwordHash`
//! - users embed their purchases in `orders` instead of the ledger
//! - ledger orders may have non-UUID ids and string product ids
//!
//! The upgrade works on raw JSON so it can read shapes the typed models no
//! longer accept. All rewritten keys and the new version marker are
//! committed in a single batch; an interrupted upgrade simply runs again.

use chrono::Utc;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use palette_core::{OrderId, PaymentMethod, Price, UserId};

use crate::models::{Order, OrderItem};
use crate::services::auth::CredentialHasher;
use crate::storage::{self, Storage, StorageError, WriteBatch, keys};

/// Schema version written by this build.
pub const CURRENT_VERSION: u32 = 1;

/// Stored in place of a password that could not be hashed. It is not a
/// valid PHC string, so no password ever verifies against it.
pub const LOCKED_PASSWORD_HASH: &str = "!locked";

/// Errors that can occur while upgrading stored records.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Records could not be read or written.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Stored data was written by a newer build.
    #[error("stored schema version {found} is newer than supported version {CURRENT_VERSION}")]
    UnsupportedVersion {
        /// Version found in storage.
        found: u32,
    },
}

/// What an upgrade changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Version the store was at before the upgrade.
    pub from_version: u32,
    /// Plaintext passwords replaced with hashes.
    pub passwords_hashed: usize,
    /// Ledger orders created from embedded user purchases.
    pub orders_moved: usize,
    /// Existing ledger orders given a fresh id.
    pub orders_rekeyed: usize,
    /// Users left without a usable password, who can no longer sign in.
    pub accounts_locked: usize,
}

/// Bring stored records up to [`CURRENT_VERSION`].
///
/// Returns `None` if the store is already current.
///
/// # Errors
///
/// Returns `MigrationError::UnsupportedVersion` for data from a newer
/// build and `MigrationError::Storage` if records cannot be read or the
/// upgrade batch cannot be committed.
pub fn migrate(
    storage: &dyn Storage,
    hasher: &CredentialHasher,
) -> Result<Option<MigrationReport>, MigrationError> {
    let from_version: u32 = storage::load_or_default(storage, keys::SCHEMA_VERSION)?;
    if from_version == CURRENT_VERSION {
        return Ok(None);
    }
    if from_version > CURRENT_VERSION {
        return Err(MigrationError::UnsupportedVersion {
            found: from_version,
        });
    }

    let mut report = MigrationReport {
        from_version,
        ..MigrationReport::default()
    };
    let mut batch = WriteBatch::new();

    let mut moved_orders = Vec::new();
    let users = read_array(storage, keys::USERS)?.map(|users| {
        users
            .into_iter()
            .map(|mut user| {
                upgrade_user(&mut user, hasher, &mut report, &mut moved_orders);
                user
            })
            .collect::<Vec<_>>()
    });

    let mut ledger = read_array(storage, keys::ORDERS)?;
    if let Some(orders) = &mut ledger {
        for order in orders.iter_mut() {
            upgrade_order(order, &mut report);
        }
    }
    if !moved_orders.is_empty() {
        let orders = ledger.get_or_insert_with(Vec::new);
        for order in &moved_orders {
            orders.push(serde_json::to_value(order).map_err(StorageError::from)?);
        }
    }

    if let Some(users) = &users {
        batch.put_json(keys::USERS, users)?;

        let current: Option<Value> = storage::load_optional(storage, keys::CURRENT_USER)?;
        if let Some(current_id) = current.as_ref().and_then(|c| c.get("id")).and_then(Value::as_i64) {
            match users.iter().find(|u| u.get("id").and_then(Value::as_i64) == Some(current_id)) {
                Some(user) => {
                    batch.put_json(keys::CURRENT_USER, user)?;
                }
                None => {
                    tracing::warn!(user_id = current_id, "signed-in user missing from roster, signing out");
                    batch.remove(keys::CURRENT_USER);
                }
            }
        }
    }
    if let Some(orders) = &ledger {
        batch.put_json(keys::ORDERS, orders)?;
    }
    batch.put_json(keys::SCHEMA_VERSION, &CURRENT_VERSION)?;

    storage.commit(batch)?;
    tracing::info!(
        from_version,
        to_version = CURRENT_VERSION,
        passwords_hashed = report.passwords_hashed,
        orders_moved = report.orders_moved,
        orders_rekeyed = report.orders_rekeyed,
        accounts_locked = report.accounts_locked,
        "storage schema upgraded"
    );
    Ok(Some(report))
}

/// Read a key as a JSON array. Anything else is left for the typed loaders
/// to default.
fn read_array(storage: &dyn Storage, key: &str) -> Result<Option<Vec<Value>>, StorageError> {
    match storage::load_optional::<Value>(storage, key)? {
        Some(Value::Array(items)) => Ok(Some(items)),
        Some(_) => {
            tracing::warn!(key, "expected a JSON array, leaving as is");
            Ok(None)
        }
        None => Ok(None),
    }
}

fn upgrade_user(
    user: &mut Value,
    hasher: &CredentialHasher,
    report: &mut MigrationReport,
    moved_orders: &mut Vec<Order>,
) {
    let Value::Object(fields) = user else {
        return;
    };
    let user_id = fields.get("id").and_then(Value::as_i64).map(UserId::new);

    // A plaintext copy next to an existing hash is dropped without rehashing.
    let password = fields.remove("password");
    if let (Some(Value::String(password)), false) = (password, fields.contains_key("passwordHash")) {
        match hasher.hash(&password) {
            Ok(hash) => {
                fields.insert(
                    "passwordHash".to_owned(),
                    Value::String(hash.as_str().to_owned()),
                );
                report.passwords_hashed += 1;
            }
            Err(error) => {
                tracing::warn!(user_id = ?user_id, %error, "could not hash legacy password");
            }
        }
    }
    if !fields.contains_key("passwordHash") {
        tracing::warn!(user_id = ?user_id, "user has no usable password, locking account");
        fields.insert(
            "passwordHash".to_owned(),
            Value::String(LOCKED_PASSWORD_HASH.to_owned()),
        );
        report.accounts_locked += 1;
    }

    if let Some(Value::Array(purchases)) = fields.remove("orders") {
        let items: Vec<OrderItem> = purchases
            .into_iter()
            .filter_map(|mut item| {
                coerce_product_id(&mut item);
                serde_json::from_value(item)
                    .inspect_err(|error| {
                        tracing::warn!(user_id = ?user_id, %error, "skipping unreadable purchase");
                    })
                    .ok()
            })
            .collect();

        if !items.is_empty() {
            let total = items
                .iter()
                .map(OrderItem::line_total)
                .collect::<Option<Vec<_>>>()
                .and_then(Price::checked_sum)
                .unwrap_or_else(|| {
                    tracing::warn!(user_id = ?user_id, "legacy purchase total out of range, recording zero");
                    Price::ZERO
                });
            moved_orders.push(Order {
                id: OrderId::generate(),
                user_id,
                total,
                items,
                date: Utc::now(),
                payment_method: PaymentMethod::Wallet,
            });
            report.orders_moved += 1;
        }
    }
}

fn upgrade_order(order: &mut Value, report: &mut MigrationReport) {
    let Value::Object(fields) = order else {
        return;
    };

    let has_uuid = fields
        .get("id")
        .and_then(Value::as_str)
        .is_some_and(|id| Uuid::parse_str(id).is_ok());
    if !has_uuid {
        fields.insert("id".to_owned(), Value::String(OrderId::generate().to_string()));
        report.orders_rekeyed += 1;
    }

    if let Some(Value::Array(items)) = fields.get_mut("items") {
        items.iter_mut().for_each(coerce_product_id);
    }
}

/// Legacy order lines sometimes stored the product id as a string.
fn coerce_product_id(item: &mut Value) {
    let Some(fields) = item.as_object_mut() else {
        return;
    };
    let parsed = fields
        .get("id")
        .and_then(Value::as_str)
        .and_then(|id| id.trim().parse::<i64>().ok());
    if let Some(id) = parsed {
        fields.insert("id".to_owned(), Value::from(id));
    }
}
