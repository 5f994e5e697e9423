//! The storefront context handed to every consumer.

use std::fmt;

use palette_core::{ProductId, UserId};

use crate::catalog::Catalog;
use crate::config::StorefrontConfig;
use crate::error::AppError;
use crate::migrate;
use crate::models::{OrderItem, Product, User};
use crate::services::auth::{AuthError, AuthStore, CredentialHasher, Registration};
use crate::services::cart::Cart;
use crate::services::orders::OrderStore;
use crate::services::wishlist::Wishlist;
use crate::storage::{FileStorage, Storage};

/// Everything one storefront session works with.
///
/// Constructed once at start and passed by reference; there is no global
/// state. The cart and wishlist live only as long as this value.
pub struct Storefront {
    pub(crate) storage: Box<dyn Storage>,
    pub(crate) catalog: Catalog,
    pub(crate) auth: AuthStore,
    pub(crate) orders: OrderStore,
    pub(crate) cart: Cart,
    pub(crate) wishlist: Wishlist,
}

impl fmt::Debug for Storefront {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storefront")
            .field("catalog", &self.catalog.products().len())
            .field("auth", &self.auth)
            .field("orders", &self.orders.orders().len())
            .field("cart", &self.cart)
            .field("wishlist", &self.wishlist)
            .finish_non_exhaustive()
    }
}

impl Storefront {
    /// Open a session over `storage`.
    ///
    /// Upgrades old records, merges stored reviews into `catalog`, then
    /// loads the user roster, the signed-in user and the order ledger.
    ///
    /// # Errors
    ///
    /// Returns `AppError` if the store cannot be read or upgraded.
    pub fn open(
        storage: Box<dyn Storage>,
        mut catalog: Catalog,
        hasher: CredentialHasher,
    ) -> Result<Self, AppError> {
        migrate::migrate(storage.as_ref(), &hasher)?;
        catalog.load_reviews(storage.as_ref())?;
        let auth = AuthStore::load(storage.as_ref(), hasher)?;
        let orders = OrderStore::load(storage.as_ref())?;

        Ok(Self {
            storage,
            catalog,
            auth,
            orders,
            cart: Cart::new(),
            wishlist: Wishlist::new(),
        })
    }

    /// Open a file-backed session as configured.
    ///
    /// # Errors
    ///
    /// Returns `AppError` if the catalog or the data directory cannot be
    /// loaded.
    pub fn from_config(config: &StorefrontConfig) -> Result<Self, AppError> {
        let catalog = match &config.catalog_path {
            Some(path) => Catalog::from_json_file(path)?,
            None => Catalog::builtin()?,
        };
        let storage = FileStorage::open(config.data_dir.clone())?;

        tracing::info!(
            data_dir = %config.data_dir.display(),
            products = catalog.products().len(),
            "storefront opened"
        );
        Self::open(Box::new(storage), catalog, CredentialHasher::new(config.hash_cost))
    }

    /// The product catalog.
    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The auth store.
    #[must_use]
    pub const fn auth(&self) -> &AuthStore {
        &self.auth
    }

    /// The order ledger.
    #[must_use]
    pub const fn orders(&self) -> &OrderStore {
        &self.orders
    }

    /// The session cart.
    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    /// The session cart, for editing.
    pub const fn cart_mut(&mut self) -> &mut Cart {
        &mut self.cart
    }

    /// The session wishlist.
    #[must_use]
    pub const fn wishlist(&self) -> &Wishlist {
        &self.wishlist
    }

    /// The session wishlist, for editing.
    pub const fn wishlist_mut(&mut self) -> &mut Wishlist {
        &mut self.wishlist
    }

    // =========================================================================
    // Route guard
    // =========================================================================

    /// Whether a user is signed in.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.auth.is_authenticated()
    }

    /// The signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotAuthenticated` when anonymous.
    pub fn require_user(&self) -> Result<&User, AuthError> {
        self.auth.require_user()
    }

    // =========================================================================
    // Account
    // =========================================================================

    /// Register and sign in. See [`AuthStore::register`].
    ///
    /// # Errors
    ///
    /// As [`AuthStore::register`].
    pub fn register(&mut self, form: Registration<'_>) -> Result<User, AuthError> {
        self.auth.register(self.storage.as_ref(), form)
    }

    /// Sign in. See [`AuthStore::login`].
    ///
    /// # Errors
    ///
    /// As [`AuthStore::login`].
    pub fn login(&mut self, email: &str, password: &str) -> Result<User, AuthError> {
        self.auth.login(self.storage.as_ref(), email, password)
    }

    /// Sign out. The cart and wishlist are kept for the rest of the session.
    ///
    /// # Errors
    ///
    /// As [`AuthStore::logout`].
    pub fn logout(&mut self) -> Result<(), AuthError> {
        self.auth.logout(self.storage.as_ref())
    }

    /// Replace the signed-in user's record. See [`AuthStore::update_user`].
    ///
    /// # Errors
    ///
    /// As [`AuthStore::update_user`].
    pub fn update_user(&mut self, updated: User) -> Result<(), AuthError> {
        self.auth.update_user(self.storage.as_ref(), updated)
    }

    // =========================================================================
    // Browsing
    // =========================================================================

    /// Look up a product for display and record the view in the signed-in
    /// user's history.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Catalog` for an unknown product and
    /// `AppError::Auth` if the history cannot be saved.
    pub fn view_product(&mut self, id: ProductId) -> Result<&Product, AppError> {
        self.catalog.get(id)?;
        self.auth
            .add_to_history(self.storage.as_ref(), &self.catalog, id)?;
        Ok(self.catalog.get(id)?)
    }

    /// Lines bought by the signed-in user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotAuthenticated` when anonymous.
    pub fn purchase_history(&self) -> Result<impl Iterator<Item = &OrderItem>, AuthError> {
        let user_id: UserId = self.auth.require_user()?.id;
        Ok(self.orders.purchase_lines(user_id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use palette_core::Price;

    use super::*;
    use crate::services::auth::HashCost;
    use crate::storage::MemoryStorage;

    pub(crate) fn memory_storefront() -> Storefront {
        Storefront::open(
            Box::new(MemoryStorage::new()),
            Catalog::builtin().unwrap(),
            CredentialHasher::new(HashCost::Low),
        )
        .unwrap()
    }

    /// Register "Asha" with a wallet of `balance` rupees.
    pub(crate) fn register_with_wallet(ctx: &mut Storefront, balance: i64) -> User {
        let mut user = ctx
            .register(Registration {
                name: "Asha",
                email: "asha@example.com",
                password: "sketch42",
                phone: "9876543210",
                country_code: "+91",
                address: "12 MG Road, Pune",
            })
            .unwrap();
        user.wallet = Price::from_major(balance);
        ctx.update_user(user.clone()).unwrap();
        user
    }

    #[test]
    fn test_view_product_records_history_when_signed_in() {
        let mut ctx = memory_storefront();
        assert_eq!(ctx.view_product(ProductId::new(3)).unwrap().name, "Oil Paint Set");

        register_with_wallet(&mut ctx, 0);
        ctx.view_product(ProductId::new(3)).unwrap();
        let user = ctx.require_user().unwrap();
        assert_eq!(user.history[0].product_id, ProductId::new(3));
        assert_eq!(user.recommendations.len(), 2);
    }

    #[test]
    fn test_view_unknown_product() {
        let mut ctx = memory_storefront();
        register_with_wallet(&mut ctx, 0);
        assert!(matches!(
            ctx.view_product(ProductId::new(42)),
            Err(AppError::Catalog(_))
        ));
        assert!(ctx.require_user().unwrap().history.is_empty());
    }

    #[test]
    fn test_route_guard() {
        let mut ctx = memory_storefront();
        assert!(!ctx.is_authenticated());
        assert!(matches!(ctx.require_user(), Err(AuthError::NotAuthenticated)));
        assert!(ctx.purchase_history().is_err());

        register_with_wallet(&mut ctx, 0);
        assert!(ctx.is_authenticated());
        assert_eq!(ctx.purchase_history().unwrap().count(), 0);
    }

    #[test]
    fn test_logout_keeps_cart() {
        let mut ctx = memory_storefront();
        register_with_wallet(&mut ctx, 0);
        let sketchbook = ctx.catalog().get(ProductId::new(2)).unwrap().clone();
        ctx.cart_mut().add(&sketchbook, 1);
        ctx.wishlist_mut().add(&sketchbook);

        ctx.logout().unwrap();
        assert_eq!(ctx.cart().count(), 1);
        assert!(ctx.wishlist().contains(sketchbook.id));
    }
}
