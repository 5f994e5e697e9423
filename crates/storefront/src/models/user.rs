//! User domain types.
//!
//! The JSON layout keeps the camelCase field names of the browser-era
//! records. Every field added after the first release carries a serde
//! default so older records still load.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use palette_core::{Email, PasswordHash, Price, ProductId, Rating, UserId};

/// Maximum number of browsing-history entries kept per user.
pub const HISTORY_LIMIT: usize = 10;

/// Maximum number of recommendations kept per user.
pub const RECOMMENDATION_LIMIT: usize = 4;

/// A registered storefront user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Login email, unique among registered users.
    pub email: Email,
    /// Argon2id verifier for the user's password.
    pub password_hash: PasswordHash,
    /// Simulated wallet balance.
    #[serde(default)]
    pub wallet: Price,
    /// Phone number without country code.
    #[serde(default)]
    pub phone: Option<String>,
    /// Dialling prefix, e.g. `+91`.
    #[serde(default)]
    pub country_code: Option<String>,
    /// Shipping address.
    #[serde(default)]
    pub address: Option<String>,
    /// Reviews this user has written.
    #[serde(default)]
    pub my_reviews: Vec<MyReview>,
    /// Recently viewed products, newest first.
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    /// Products suggested from the latest view.
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
}

impl User {
    /// Record a product view: newest first, one entry per product, capped at
    /// [`HISTORY_LIMIT`].
    pub fn record_view(&mut self, product_id: ProductId, viewed_at: DateTime<Utc>) {
        self.history.retain(|entry| entry.product_id != product_id);
        self.history.insert(
            0,
            HistoryEntry {
                product_id,
                viewed_at,
            },
        );
        self.history.truncate(HISTORY_LIMIT);
    }
}

/// A review as remembered on the author's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MyReview {
    /// Reviewed product.
    pub product_id: ProductId,
    /// Star rating given.
    pub rating: Rating,
    /// Review text.
    pub comment: String,
    /// Day the review was written.
    pub date: NaiveDate,
}

/// One browsing-history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Viewed product.
    pub product_id: ProductId,
    /// When it was viewed. Some early records used `date` for this field.
    #[serde(alias = "date", default)]
    pub viewed_at: DateTime<Utc>,
}

/// A suggested product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    /// Suggested product.
    pub product_id: ProductId,
    /// Why it was suggested.
    #[serde(default)]
    pub reason: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_user() -> User {
        User {
            id: UserId::new(1),
            name: "Asha".to_owned(),
            email: Email::parse("asha@example.com").unwrap(),
            password_hash: PasswordHash::new("$argon2id$stub".to_owned()),
            wallet: Price::ZERO,
            phone: None,
            country_code: None,
            address: None,
            my_reviews: Vec::new(),
            history: Vec::new(),
            recommendations: Vec::new(),
        }
    }

    #[test]
    fn test_record_view_dedupes_and_moves_to_front() {
        let mut user = sample_user();
        let now = Utc::now();
        user.record_view(ProductId::new(1), now);
        user.record_view(ProductId::new(2), now);
        user.record_view(ProductId::new(1), now);

        let ids: Vec<i64> = user.history.iter().map(|h| h.product_id.as_i64()).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_record_view_caps_history() {
        let mut user = sample_user();
        for id in 0..25 {
            user.record_view(ProductId::new(id), Utc::now());
        }
        assert_eq!(user.history.len(), HISTORY_LIMIT);
        assert_eq!(user.history[0].product_id, ProductId::new(24));
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let json = r#"{
            "id": 1725000000000,
            "name": "Ravi",
            "email": "ravi@example.com",
            "passwordHash": "$argon2id$stub",
            "history": [{"productId": 3, "date": "2025-09-01T10:00:00Z"}]
        }"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.wallet, Price::ZERO);
        assert!(user.phone.is_none());
        assert!(user.recommendations.is_empty());
        assert_eq!(user.history[0].product_id, ProductId::new(3));
    }

    #[test]
    fn test_serializes_camel_case() {
        let value = serde_json::to_value(sample_user()).unwrap();
        assert!(value.get("passwordHash").is_some());
        assert!(value.get("myReviews").is_some());
        assert!(value.get("countryCode").is_some());
    }
}
