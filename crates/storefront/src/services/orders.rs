//! Order ledger.
//!
//! The ledger is the one place completed orders are stored. A user's
//! purchase history is derived from it by owner, never kept separately.

use palette_core::UserId;

use crate::models::{Order, OrderItem};
use crate::storage::{self, Storage, StorageError, StoredList, WriteBatch, keys};

/// Append-only list of completed orders.
#[derive(Debug, Clone, Default)]
pub struct OrderStore {
    orders: StoredList<Order>,
}

impl OrderStore {
    /// Load the ledger. Missing or malformed data gives an empty ledger.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    pub fn load(storage: &dyn Storage) -> Result<Self, StorageError> {
        let orders: StoredList<Order> = storage::load_list(storage, keys::ORDERS)?;
        tracing::debug!(
            count = orders.items().len(),
            unreadable = orders.unreadable().len(),
            "order ledger loaded"
        );
        Ok(Self { orders })
    }

    /// Append an order and persist the ledger.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the ledger cannot be saved; the in-memory
    /// ledger is unchanged in that case.
    pub fn add_order(&mut self, storage: &dyn Storage, order: Order) -> Result<(), StorageError> {
        let mut batch = WriteBatch::new();
        let orders = self.stage_order(&order, &mut batch)?;
        storage.commit(batch)?;
        self.apply_orders(orders);
        tracing::info!(order_id = %order.id, total = %order.total, "order recorded");
        Ok(())
    }

    /// Every order, oldest first.
    #[must_use]
    pub fn orders(&self) -> &[Order] {
        self.orders.items()
    }

    /// Orders placed by `user`, oldest first.
    pub fn for_user(&self, user: UserId) -> impl Iterator<Item = &Order> {
        self.orders()
            .iter()
            .filter(move |o| o.user_id == Some(user))
    }

    /// Every line `user` has bought, in purchase order.
    pub fn purchase_lines(&self, user: UserId) -> impl Iterator<Item = &OrderItem> {
        self.for_user(user).flat_map(|o| o.items.iter())
    }

    /// Queue the ledger write for `order` without applying it.
    pub(crate) fn stage_order(
        &self,
        order: &Order,
        batch: &mut WriteBatch,
    ) -> Result<StoredList<Order>, StorageError> {
        let mut items = self.orders().to_vec();
        items.push(order.clone());
        let orders = self.orders.with_items(items);
        batch.put_json(keys::ORDERS, &orders)?;
        Ok(orders)
    }

    /// Apply a ledger staged with [`OrderStore::stage_order`].
    pub(crate) fn apply_orders(&mut self, orders: StoredList<Order>) {
        self.orders = orders;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use palette_core::{OrderId, PaymentMethod, Price, ProductId};

    use super::*;
    use crate::storage::MemoryStorage;

    fn order(user: Option<i64>, product: i64) -> Order {
        let item = OrderItem {
            id: ProductId::new(product),
            name: format!("Product {product}"),
            price: Price::from_major(100),
            quantity: 2,
        };
        Order {
            id: OrderId::generate(),
            user_id: user.map(UserId::new),
            total: item.line_total().unwrap(),
            items: vec![item],
            date: Utc::now(),
            payment_method: PaymentMethod::Wallet,
        }
    }

    #[test]
    fn test_add_order_persists() {
        let storage = MemoryStorage::new();
        let mut store = OrderStore::load(&storage).unwrap();
        store.add_order(&storage, order(Some(1), 1)).unwrap();
        store.add_order(&storage, order(Some(2), 2)).unwrap();

        let reloaded = OrderStore::load(&storage).unwrap();
        assert_eq!(reloaded.orders(), store.orders());
        assert_eq!(reloaded.orders().len(), 2);
    }

    #[test]
    fn test_add_order_accepts_empty_items() {
        let storage = MemoryStorage::new();
        let mut store = OrderStore::default();
        let mut empty = order(None, 1);
        empty.items.clear();
        empty.total = Price::ZERO;
        store.add_order(&storage, empty).unwrap();
        assert_eq!(store.orders().len(), 1);
    }

    #[test]
    fn test_purchase_lines_filter_by_owner() {
        let storage = MemoryStorage::new();
        let mut store = OrderStore::default();
        store.add_order(&storage, order(Some(1), 1)).unwrap();
        store.add_order(&storage, order(Some(2), 2)).unwrap();
        store.add_order(&storage, order(Some(1), 3)).unwrap();
        store.add_order(&storage, order(None, 4)).unwrap();

        let lines: Vec<i64> = store
            .purchase_lines(UserId::new(1))
            .map(|l| l.id.as_i64())
            .collect();
        assert_eq!(lines, vec![1, 3]);
        assert_eq!(store.for_user(UserId::new(2)).count(), 1);
    }

    #[test]
    fn test_malformed_ledger_loads_empty() {
        let storage = MemoryStorage::with_entries([(keys::ORDERS, "{oops")]);
        assert!(OrderStore::load(&storage).unwrap().orders().is_empty());
    }

    #[test]
    fn test_unreadable_order_survives_append() {
        let storage = MemoryStorage::with_entries([(keys::ORDERS, r#"[{"id":"legacy"}]"#)]);
        let mut store = OrderStore::load(&storage).unwrap();
        assert!(store.orders().is_empty());

        store.add_order(&storage, order(Some(1), 1)).unwrap();

        let raw: Vec<serde_json::Value> =
            serde_json::from_str(&storage.read(keys::ORDERS).unwrap().unwrap()).unwrap();
        assert_eq!(raw.len(), 2);
        assert_eq!(raw[1], serde_json::json!({"id": "legacy"}));
        assert_eq!(OrderStore::load(&storage).unwrap().orders().len(), 1);
    }
}
