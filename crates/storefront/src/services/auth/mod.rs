//! Authentication and profile store.
//!
//! [`AuthStore`] owns the session's signed-in user and the roster of every
//! registered user. It is the only writer of the `users` and `currentUser`
//! records; every change to a user (wallet, profile, reviews, history)
//! flows through [`AuthStore::update_user`] or its staged form.
//!
//! The session is either anonymous (`current_user() == None`) or
//! authenticated. `register` and `login` move anonymous to authenticated,
//! `logout` moves back.

mod error;
mod password;

pub use error::AuthError;
pub use password::{CredentialHasher, HashCost};

use chrono::Utc;
use tracing::instrument;

use palette_core::{Email, Price, ProductId, UserId};

use crate::catalog::Catalog;
use crate::ids::IdSequence;
use crate::models::user::RECOMMENDATION_LIMIT;
use crate::models::{Recommendation, User};
use crate::storage::{self, Storage, StoredList, WriteBatch, keys};

/// Details collected by the registration form.
#[derive(Debug, Clone, Copy)]
pub struct Registration<'a> {
    /// Display name.
    pub name: &'a str,
    /// Login email.
    pub email: &'a str,
    /// Plain password; only its hash is kept.
    pub password: &'a str,
    /// Phone number without country code.
    pub phone: &'a str,
    /// Dialling prefix, e.g. `+91`.
    pub country_code: &'a str,
    /// Shipping address.
    pub address: &'a str,
}

/// Session user state plus the persisted user roster.
#[derive(Debug)]
pub struct AuthStore {
    current: Option<User>,
    users: StoredList<User>,
    ids: IdSequence,
    hasher: CredentialHasher,
}

impl AuthStore {
    /// Load the roster and restore the signed-in user, if any.
    ///
    /// The roster is authoritative: the stored current-user record only
    /// selects which roster entry is signed in. Roster entries that do not
    /// decode are kept as is and still reserve their email and ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the store cannot be read.
    pub fn load(storage: &dyn Storage, hasher: CredentialHasher) -> Result<Self, AuthError> {
        let users: StoredList<User> = storage::load_list(storage, keys::USERS)?;
        let stored: Option<User> = storage::load_optional(storage, keys::CURRENT_USER)?;

        let current = stored.and_then(|stored| {
            let found = users.items().iter().find(|u| u.id == stored.id).cloned();
            if found.is_none() {
                tracing::warn!(user_id = %stored.id, "signed-in user missing from roster");
            }
            found
        });

        let ids = IdSequence::seeded(
            users
                .items()
                .iter()
                .map(|u| u.id.as_i64())
                .chain(users.unreadable().iter().filter_map(|raw| raw.get("id")?.as_i64())),
        );
        tracing::debug!(
            users = users.items().len(),
            unreadable = users.unreadable().len(),
            signed_in = current.is_some(),
            "auth store loaded"
        );

        Ok(Self {
            current,
            users,
            ids,
            hasher,
        })
    }

    /// Whether a user is signed in.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.current.is_some()
    }

    /// The signed-in user, if any.
    #[must_use]
    pub const fn current_user(&self) -> Option<&User> {
        self.current.as_ref()
    }

    /// The signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotAuthenticated` when anonymous.
    pub fn require_user(&self) -> Result<&User, AuthError> {
        self.current.as_ref().ok_or(AuthError::NotAuthenticated)
    }

    /// Every registered user.
    #[must_use]
    pub fn users(&self) -> &[User] {
        self.users.items()
    }

    /// Whether `email` belongs to a registered user other than `except`.
    #[must_use]
    pub fn email_in_use(&self, email: &str, except: Option<UserId>) -> bool {
        let readable = self
            .users()
            .iter()
            .any(|u| u.email.as_str() == email && Some(u.id) != except);
        readable
            || self
                .users
                .unreadable()
                .iter()
                .any(|raw| raw.get("email").and_then(serde_json::Value::as_str) == Some(email))
    }

    /// Register a new user and sign them in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::EmailTaken` if the email is already registered,
    /// `AuthError::InvalidEmail` or `AuthError::WeakPassword` for bad input,
    /// and `AuthError::Storage` if the new records cannot be saved. On any
    /// error the roster and the signed-in user are unchanged.
    #[instrument(skip(self, storage, form), fields(email = %form.email))]
    pub fn register(
        &mut self,
        storage: &dyn Storage,
        form: Registration<'_>,
    ) -> Result<User, AuthError> {
        let email = Email::parse(form.email)?;

        if self.email_in_use(email.as_str(), None) {
            tracing::info!("registration rejected: email taken");
            return Err(AuthError::EmailTaken);
        }

        let password_hash = self.hasher.hash(form.password)?;

        let user = User {
            id: UserId::new(self.ids.next_id()),
            name: form.name.trim().to_owned(),
            email,
            password_hash,
            wallet: Price::ZERO,
            phone: non_empty(form.phone),
            country_code: non_empty(form.country_code),
            address: non_empty(form.address),
            my_reviews: Vec::new(),
            history: Vec::new(),
            recommendations: Vec::new(),
        };

        let mut roster = self.users().to_vec();
        roster.push(user.clone());
        let users = self.users.with_items(roster);

        let mut batch = WriteBatch::new();
        batch
            .put_json(keys::USERS, &users)?
            .put_json(keys::CURRENT_USER, &user)?;
        storage.commit(batch)?;

        self.users = users;
        self.current = Some(user.clone());
        tracing::info!(user_id = %user.id, "user registered");

        Ok(user)
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if no registered user has
    /// this exact email and password.
    #[instrument(skip(self, storage, password))]
    pub fn login(
        &mut self,
        storage: &dyn Storage,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let user = self
            .users()
            .iter()
            .filter(|u| u.email.as_str() == email)
            .find(|u| self.hasher.verify(password, &u.password_hash).is_ok())
            .cloned()
            .ok_or_else(|| {
                tracing::info!("login rejected");
                AuthError::InvalidCredentials
            })?;

        let mut batch = WriteBatch::new();
        batch.put_json(keys::CURRENT_USER, &user)?;
        storage.commit(batch)?;

        tracing::info!(user_id = %user.id, "user signed in");
        self.current = Some(user.clone());
        Ok(user)
    }

    /// Sign out. The roster is not touched.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the current-user record cannot be
    /// removed; the session stays signed in in that case.
    pub fn logout(&mut self, storage: &dyn Storage) -> Result<(), AuthError> {
        storage.remove(keys::CURRENT_USER)?;
        if let Some(user) = self.current.take() {
            tracing::info!(user_id = %user.id, "user signed out");
        }
        Ok(())
    }

    /// Replace the signed-in user's record.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotAuthenticated` when anonymous,
    /// `AuthError::UserMismatch` if `updated` is a different user, and
    /// `AuthError::Storage` if the records cannot be saved.
    pub fn update_user(&mut self, storage: &dyn Storage, updated: User) -> Result<(), AuthError> {
        let mut batch = WriteBatch::new();
        let users = self.stage_update(&updated, &mut batch)?;
        storage.commit(batch)?;
        self.apply_update(updated, users);
        Ok(())
    }

    /// Record a product view and refresh recommendations.
    ///
    /// Does nothing when anonymous. Recommendations are replaced with up to
    /// four products related to the viewed one; an unknown product leaves
    /// them as they were.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the updated user cannot be saved.
    pub fn add_to_history(
        &mut self,
        storage: &dyn Storage,
        catalog: &Catalog,
        product_id: ProductId,
    ) -> Result<(), AuthError> {
        let Some(current) = &self.current else {
            return Ok(());
        };

        let mut updated = current.clone();
        updated.record_view(product_id, Utc::now());

        if let Some(viewed) = catalog.find(product_id) {
            let reason = format!("Because you viewed {}", viewed.name);
            updated.recommendations = catalog
                .related(product_id, RECOMMENDATION_LIMIT)
                .into_iter()
                .map(|p| Recommendation {
                    product_id: p.id,
                    reason: Some(reason.clone()),
                })
                .collect();
        }

        tracing::debug!(user_id = %updated.id, %product_id, "recorded product view");
        self.update_user(storage, updated)
    }

    /// Queue the writes for replacing the signed-in user without applying
    /// them, so the change can share a batch with other stores.
    ///
    /// Returns the roster to pass to [`AuthStore::apply_update`] after the
    /// batch commits.
    pub(crate) fn stage_update(
        &self,
        updated: &User,
        batch: &mut WriteBatch,
    ) -> Result<StoredList<User>, AuthError> {
        let current = self.require_user()?;
        if current.id != updated.id {
            return Err(AuthError::UserMismatch);
        }

        let mut roster = self.users().to_vec();
        match roster.iter_mut().find(|u| u.id == updated.id) {
            Some(slot) => *slot = updated.clone(),
            None => {
                tracing::warn!(user_id = %updated.id, "signed-in user re-added to roster");
                roster.push(updated.clone());
            }
        }
        let users = self.users.with_items(roster);

        batch
            .put_json(keys::USERS, &users)?
            .put_json(keys::CURRENT_USER, updated)?;
        Ok(users)
    }

    /// Apply an update staged with [`AuthStore::stage_update`].
    pub(crate) fn apply_update(&mut self, updated: User, users: StoredList<User>) {
        self.users = users;
        self.current = Some(updated);
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::user::HISTORY_LIMIT;
    use crate::storage::MemoryStorage;

    fn form<'a>(email: &'a str, password: &'a str) -> Registration<'a> {
        Registration {
            name: "Asha",
            email,
            password,
            phone: "9876543210",
            country_code: "+91",
            address: "12 MG Road, Pune",
        }
    }

    fn store(storage: &MemoryStorage) -> AuthStore {
        AuthStore::load(storage, CredentialHasher::new(HashCost::Low)).unwrap()
    }

    #[test]
    fn test_register_signs_in_and_persists() {
        let storage = MemoryStorage::new();
        let mut auth = store(&storage);

        let user = auth.register(&storage, form("asha@example.com", "pw")).unwrap();
        assert!(auth.is_authenticated());
        assert_eq!(user.wallet, Price::ZERO);
        assert_eq!(user.phone.as_deref(), Some("9876543210"));
        assert!(user.history.is_empty());

        let reloaded = store(&storage);
        assert_eq!(reloaded.users().len(), 1);
        assert_eq!(reloaded.current_user().unwrap().id, user.id);
    }

    #[test]
    fn test_register_never_stores_raw_password() {
        let storage = MemoryStorage::new();
        let mut auth = store(&storage);
        auth.register(&storage, form("asha@example.com", "hunter22")).unwrap();

        let raw = storage.read(keys::USERS).unwrap().unwrap();
        assert!(!raw.contains("hunter22"));
        assert!(raw.contains("$argon2id$"));
    }

    #[test]
    fn test_register_duplicate_email_leaves_state_unchanged() {
        let storage = MemoryStorage::new();
        let mut auth = store(&storage);
        let first = auth.register(&storage, form("asha@example.com", "pw")).unwrap();
        let roster_before = storage.read(keys::USERS).unwrap();

        let err = auth
            .register(&storage, form("asha@example.com", "other"))
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken));
        assert_eq!(auth.users().len(), 1);
        assert_eq!(auth.current_user().unwrap().id, first.id);
        assert_eq!(storage.read(keys::USERS).unwrap(), roster_before);
    }

    #[test]
    fn test_email_match_is_case_sensitive() {
        let storage = MemoryStorage::new();
        let mut auth = store(&storage);
        auth.register(&storage, form("asha@example.com", "pw")).unwrap();
        assert!(auth.register(&storage, form("Asha@example.com", "pw")).is_ok());
        assert_eq!(auth.users().len(), 2);
    }

    #[test]
    fn test_register_ids_unique_under_rapid_creation() {
        let storage = MemoryStorage::new();
        let mut auth = store(&storage);
        let a = auth.register(&storage, form("a@example.com", "pw")).unwrap();
        let b = auth.register(&storage, form("b@example.com", "pw")).unwrap();
        let c = auth.register(&storage, form("c@example.com", "pw")).unwrap();
        assert!(a.id < b.id && b.id < c.id);
    }

    #[test]
    fn test_login_and_logout() {
        let storage = MemoryStorage::new();
        let mut auth = store(&storage);
        let user = auth.register(&storage, form("asha@example.com", "pw")).unwrap();

        auth.logout(&storage).unwrap();
        assert!(!auth.is_authenticated());
        assert!(storage.read(keys::CURRENT_USER).unwrap().is_none());
        assert_eq!(auth.users().len(), 1);

        assert!(matches!(
            auth.login(&storage, "asha@example.com", "wrong"),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login(&storage, "nobody@example.com", "pw"),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(!auth.is_authenticated());

        let signed_in = auth.login(&storage, "asha@example.com", "pw").unwrap();
        assert_eq!(signed_in.id, user.id);
        assert!(store(&storage).is_authenticated());
    }

    #[test]
    fn test_update_requires_matching_user() {
        let storage = MemoryStorage::new();
        let mut auth = store(&storage);
        let user = auth.register(&storage, form("asha@example.com", "pw")).unwrap();

        let mut other = user.clone();
        other.id = UserId::new(user.id.as_i64() + 1);
        assert!(matches!(
            auth.update_user(&storage, other),
            Err(AuthError::UserMismatch)
        ));

        auth.logout(&storage).unwrap();
        assert!(matches!(
            auth.update_user(&storage, user),
            Err(AuthError::NotAuthenticated)
        ));
    }

    #[test]
    fn test_update_replaces_roster_entry() {
        let storage = MemoryStorage::new();
        let mut auth = store(&storage);
        let mut user = auth.register(&storage, form("asha@example.com", "pw")).unwrap();

        user.wallet = Price::from_major(500);
        auth.update_user(&storage, user.clone()).unwrap();

        let reloaded = store(&storage);
        assert_eq!(reloaded.users()[0].wallet, Price::from_major(500));
        assert_eq!(reloaded.current_user().unwrap().wallet, Price::from_major(500));
    }

    #[test]
    fn test_history_dedupes_and_caps() {
        let storage = MemoryStorage::new();
        let catalog = Catalog::builtin().unwrap();
        let mut auth = store(&storage);
        auth.register(&storage, form("asha@example.com", "pw")).unwrap();

        auth.add_to_history(&storage, &catalog, ProductId::new(2)).unwrap();
        auth.add_to_history(&storage, &catalog, ProductId::new(2)).unwrap();
        let history = &auth.current_user().unwrap().history;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].product_id, ProductId::new(2));

        for id in 100..130 {
            auth.add_to_history(&storage, &catalog, ProductId::new(id)).unwrap();
        }
        assert_eq!(auth.current_user().unwrap().history.len(), HISTORY_LIMIT);
    }

    #[test]
    fn test_history_sets_recommendations() {
        let storage = MemoryStorage::new();
        let catalog = Catalog::builtin().unwrap();
        let mut auth = store(&storage);
        auth.register(&storage, form("asha@example.com", "pw")).unwrap();

        auth.add_to_history(&storage, &catalog, ProductId::new(2)).unwrap();
        let recs = &auth.current_user().unwrap().recommendations;
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].product_id, ProductId::new(4));
        assert_eq!(recs[0].reason.as_deref(), Some("Because you viewed Sketchbook"));

        // Unknown product keeps the previous recommendations.
        auth.add_to_history(&storage, &catalog, ProductId::new(404)).unwrap();
        assert_eq!(auth.current_user().unwrap().recommendations.len(), 1);

        // Viewing another product replaces rather than merges.
        auth.add_to_history(&storage, &catalog, ProductId::new(1)).unwrap();
        let ids: Vec<i64> = auth
            .current_user()
            .unwrap()
            .recommendations
            .iter()
            .map(|r| r.product_id.as_i64())
            .collect();
        assert_eq!(ids, vec![3, 5]);
    }

    #[test]
    fn test_history_is_noop_when_anonymous() {
        let storage = MemoryStorage::new();
        let catalog = Catalog::builtin().unwrap();
        let mut auth = store(&storage);
        auth.add_to_history(&storage, &catalog, ProductId::new(1)).unwrap();
        assert!(storage.keys().unwrap().is_empty());
    }

    #[test]
    fn test_load_ignores_current_user_missing_from_roster() {
        let storage = MemoryStorage::with_entries([
            (keys::USERS, "[]"),
            (
                keys::CURRENT_USER,
                r#"{"id":7,"name":"Ghost","email":"g@example.com","passwordHash":"x"}"#,
            ),
        ]);
        assert!(!store(&storage).is_authenticated());
    }

    #[test]
    fn test_unreadable_roster_entry_is_kept_and_reserves_email() {
        let legacy = r#"{"id":1725000000000,"name":"Old","email":"old@example.com","wallet":500}"#;
        let storage = MemoryStorage::with_entries([(keys::USERS, format!("[{legacy}]"))]);
        let mut auth = store(&storage);
        assert!(auth.users().is_empty());

        assert!(matches!(
            auth.register(&storage, form("old@example.com", "pw")),
            Err(AuthError::EmailTaken)
        ));

        let mut user = auth.register(&storage, form("new@example.com", "pw")).unwrap();
        assert!(user.id.as_i64() > 1_725_000_000_000);
        user.wallet = Price::from_major(10);
        auth.update_user(&storage, user).unwrap();

        let raw: Vec<serde_json::Value> =
            serde_json::from_str(&storage.read(keys::USERS).unwrap().unwrap()).unwrap();
        assert_eq!(raw.len(), 2);
        assert_eq!(raw[1], serde_json::from_str::<serde_json::Value>(legacy).unwrap());
        assert_eq!(store(&storage).users().len(), 1);
    }
}
