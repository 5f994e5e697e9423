//! Product catalog.
//!
//! The catalog is loaded once at start, either from the built-in product
//! list or from a JSON file, and is read-only afterwards except for review
//! appends. Appended reviews are persisted under [`keys::REVIEWS`] and
//! merged back in on the next start.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use palette_core::{ProductId, ReviewId};

use crate::ids::IdSequence;
use crate::models::{Product, Review};
use crate::storage::{self, Storage, StorageError, StoredList, WriteBatch, keys};

const BUILTIN_CATALOG: &str = include_str!("builtin.json");

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No product has the requested ID.
    #[error("product not found: {0}")]
    NotFound(ProductId),

    /// Two products share an ID.
    #[error("duplicate product id in catalog: {0}")]
    DuplicateId(ProductId),

    /// Catalog file could not be read.
    #[error("failed to read catalog file {}: {source}", path.display())]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Catalog JSON does not match the product schema.
    #[error("invalid catalog data: {0}")]
    Parse(#[from] serde_json::Error),

    /// Review storage failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// A review appended after the catalog was published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredReview {
    /// Product the review belongs to.
    pub product_id: ProductId,
    /// The review itself.
    pub review: Review,
}

/// The set of purchasable products.
#[derive(Debug, Clone)]
pub struct Catalog {
    products: Vec<Product>,
    appended: StoredList<StoredReview>,
    review_ids: IdSequence,
}

impl Catalog {
    /// Build a catalog from a product list.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::DuplicateId` if two products share an ID.
    pub fn new(products: Vec<Product>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        if let Some(dup) = products.iter().find(|p| !seen.insert(p.id)) {
            return Err(CatalogError::DuplicateId(dup.id));
        }

        let review_ids = IdSequence::seeded(
            products
                .iter()
                .flat_map(|p| p.reviews.iter().map(|r| r.id.as_i64())),
        );

        Ok(Self {
            products,
            appended: StoredList::default(),
            review_ids,
        })
    }

    /// The catalog shipped with the storefront.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` only if the bundled data is malformed.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json_str(BUILTIN_CATALOG)
    }

    /// Parse a catalog from a JSON array of products.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Parse` for invalid JSON and
    /// `CatalogError::DuplicateId` for repeated IDs.
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        Self::new(serde_json::from_str(json)?)
    }

    /// Load a catalog from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Io` if the file cannot be read, otherwise as
    /// [`Catalog::from_json_str`].
    pub fn from_json_file(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Merge reviews persisted by earlier sessions.
    ///
    /// Reviews for products no longer in the catalog are kept on disk but
    /// not shown.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if the store cannot be read.
    pub fn load_reviews(&mut self, storage: &dyn Storage) -> Result<(), CatalogError> {
        let appended: StoredList<StoredReview> = storage::load_list(storage, keys::REVIEWS)?;

        for stored in appended.items() {
            self.review_ids.observe(stored.review.id.as_i64());
            match self.products.iter_mut().find(|p| p.id == stored.product_id) {
                Some(product) => product.reviews.push(stored.review.clone()),
                None => tracing::warn!(
                    product_id = %stored.product_id,
                    "stored review refers to unknown product"
                ),
            }
        }

        tracing::debug!(count = appended.items().len(), "loaded appended reviews");
        self.appended = appended;
        Ok(())
    }

    /// All products in catalog order.
    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Look up a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if no product has this ID.
    pub fn get(&self, id: ProductId) -> Result<&Product, CatalogError> {
        self.find(id).ok_or(CatalogError::NotFound(id))
    }

    /// Look up a product by ID.
    #[must_use]
    pub fn find(&self, id: ProductId) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Products whose name or description contains `term`, ignoring case.
    #[must_use]
    pub fn search(&self, term: &str) -> Vec<&Product> {
        let needle = term.trim().to_lowercase();
        self.products
            .iter()
            .filter(|p| {
                p.name.to_lowercase().contains(&needle)
                    || p.description.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Up to `limit` other products related to `id`.
    ///
    /// Related means "same category"; a product without a category relates
    /// to every other product. Returns an empty list for unknown IDs.
    #[must_use]
    pub fn related(&self, id: ProductId, limit: usize) -> Vec<&Product> {
        let Some(viewed) = self.find(id) else {
            return Vec::new();
        };

        self.products
            .iter()
            .filter(|p| p.id != id)
            .filter(|p| viewed.category.is_none() || p.category == viewed.category)
            .take(limit)
            .collect()
    }

    /// Allocate an ID for a new review.
    pub(crate) fn next_review_id(&mut self) -> ReviewId {
        ReviewId::new(self.review_ids.next_id())
    }

    /// Queue persistence of `review` on `product_id` without applying it.
    ///
    /// Returns the appended-review list to hand to [`Catalog::apply_review`]
    /// once the batch has committed.
    pub(crate) fn stage_review(
        &self,
        product_id: ProductId,
        review: &Review,
        batch: &mut WriteBatch,
    ) -> Result<StoredList<StoredReview>, CatalogError> {
        self.get(product_id)?;

        let mut items = self.appended.items().to_vec();
        items.push(StoredReview {
            product_id,
            review: review.clone(),
        });
        let appended = self.appended.with_items(items);
        batch.put_json(keys::REVIEWS, &appended)?;
        Ok(appended)
    }

    /// Apply a review previously staged with [`Catalog::stage_review`].
    pub(crate) fn apply_review(
        &mut self,
        appended: StoredList<StoredReview>,
        product_id: ProductId,
        review: Review,
    ) {
        if let Some(product) = self.products.iter_mut().find(|p| p.id == product_id) {
            product.reviews.push(review);
        }
        self.appended = appended;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;
    use palette_core::{Price, Rating};

    use super::*;
    use crate::storage::MemoryStorage;

    fn product(id: i64, category: Option<&str>) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            price: Price::from_major(100),
            image: String::new(),
            description: String::new(),
            category: category.map(str::to_owned),
            reviews: Vec::new(),
        }
    }

    #[test]
    fn test_builtin_catalog_loads() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.products().len(), 5);
        let canvas = catalog.get(ProductId::new(1)).unwrap();
        assert_eq!(canvas.name, "Canvas Art");
        assert_eq!(canvas.price, Price::from_major(1200));
        assert_eq!(canvas.reviews.len(), 2);
    }

    #[test]
    fn test_get_unknown_is_not_found() {
        let catalog = Catalog::builtin().unwrap();
        assert!(matches!(
            catalog.get(ProductId::new(99)),
            Err(CatalogError::NotFound(id)) if id == ProductId::new(99)
        ));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = Catalog::new(vec![product(1, None), product(1, None)]);
        assert!(matches!(result, Err(CatalogError::DuplicateId(_))));
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let catalog = Catalog::builtin().unwrap();
        let hits: Vec<&str> = catalog
            .search("PAINT")
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert!(hits.contains(&"Oil Paint Set"));
        assert!(!hits.contains(&"Sketchbook"));
    }

    #[test]
    fn test_related_same_category_excludes_self() {
        let catalog = Catalog::builtin().unwrap();
        let related: Vec<i64> = catalog
            .related(ProductId::new(1), 4)
            .iter()
            .map(|p| p.id.as_i64())
            .collect();
        assert_eq!(related, vec![3, 5]);
    }

    #[test]
    fn test_related_without_category_uses_everything() {
        let catalog = Catalog::new((1..=6).map(|id| product(id, None)).collect()).unwrap();
        let related: Vec<i64> = catalog
            .related(ProductId::new(2), 4)
            .iter()
            .map(|p| p.id.as_i64())
            .collect();
        assert_eq!(related, vec![1, 3, 4, 5]);
    }

    #[test]
    fn test_staged_review_round_trips_through_storage() {
        let storage = MemoryStorage::new();
        let mut catalog = Catalog::builtin().unwrap();

        let review = Review {
            id: catalog.next_review_id(),
            user: "Asha".to_owned(),
            rating: Rating::new(4).unwrap(),
            comment: "Smooth paper".to_owned(),
            date: NaiveDate::from_ymd_opt(2025, 9, 2).unwrap(),
        };
        let mut batch = WriteBatch::new();
        let appended = catalog
            .stage_review(ProductId::new(2), &review, &mut batch)
            .unwrap();
        storage.commit(batch).unwrap();
        catalog.apply_review(appended, ProductId::new(2), review.clone());
        assert_eq!(catalog.get(ProductId::new(2)).unwrap().reviews, vec![review.clone()]);

        let mut reloaded = Catalog::builtin().unwrap();
        reloaded.load_reviews(&storage).unwrap();
        assert_eq!(reloaded.get(ProductId::new(2)).unwrap().reviews, vec![review.clone()]);
        assert!(reloaded.next_review_id() > review.id);
    }
}
