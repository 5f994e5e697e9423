//! Catalog product and review types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use palette_core::{Price, ProductId, Rating, ReviewId};

/// A purchasable product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Stable catalog ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Unit price.
    pub price: Price,
    /// Image URL.
    pub image: String,
    /// Long description.
    pub description: String,
    /// Grouping used for recommendations.
    #[serde(default)]
    pub category: Option<String>,
    /// Customer reviews, oldest first.
    #[serde(default)]
    pub reviews: Vec<Review>,
}

impl Product {
    /// Mean star rating, or `None` if there are no reviews.
    #[must_use]
    pub fn average_rating(&self) -> Option<f64> {
        if self.reviews.is_empty() {
            return None;
        }
        let total: u32 = self.reviews.iter().map(|r| u32::from(r.rating.stars())).sum();
        #[allow(clippy::cast_precision_loss)] // review counts are tiny
        let count = self.reviews.len() as f64;
        Some(f64::from(total) / count)
    }
}

/// A customer review shown on a product page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// Review ID.
    pub id: ReviewId,
    /// Author display name.
    pub user: String,
    /// Star rating.
    pub rating: Rating,
    /// Review text.
    pub comment: String,
    /// Day the review was written.
    pub date: NaiveDate,
}
