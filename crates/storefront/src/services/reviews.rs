//! Product reviews written by signed-in users.

use chrono::Utc;
use thiserror::Error;
use tracing::instrument;

use palette_core::{ProductId, Rating, RatingError};

use crate::catalog::CatalogError;
use crate::models::{MyReview, Review};
use crate::services::auth::AuthError;
use crate::state::Storefront;
use crate::storage::{StorageError, WriteBatch};

/// Errors that can occur when submitting a review.
#[derive(Debug, Error)]
pub enum ReviewError {
    /// Not signed in, or the user could not be updated.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Rating outside 1 to 5.
    #[error(transparent)]
    InvalidRating(#[from] RatingError),

    /// Comment is blank.
    #[error("please provide a rating and a comment")]
    EmptyComment,

    /// Reviewed product does not exist.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The review could not be saved.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Post a review on a product as the signed-in user.
///
/// The review is added to the product (author is the user's name, dated
/// today) and a copy is kept on the user's profile. Both are committed in
/// one batch.
///
/// # Errors
///
/// Returns `ReviewError::Auth` when anonymous, `ReviewError::InvalidRating`
/// or `ReviewError::EmptyComment` for bad input, `ReviewError::Catalog` for
/// an unknown product, and `ReviewError::Storage` if saving fails.
#[instrument(skip(ctx, comment))]
pub fn submit_review(
    ctx: &mut Storefront,
    product_id: ProductId,
    rating: i64,
    comment: &str,
) -> Result<Review, ReviewError> {
    let user = ctx.auth.require_user()?;
    let rating = Rating::new(rating)?;
    let comment = comment.trim();
    if comment.is_empty() {
        return Err(ReviewError::EmptyComment);
    }
    ctx.catalog.get(product_id)?;

    let review = Review {
        id: ctx.catalog.next_review_id(),
        user: user.name.clone(),
        rating,
        comment: comment.to_owned(),
        date: Utc::now().date_naive(),
    };

    let mut updated = user.clone();
    updated.my_reviews.push(MyReview {
        product_id,
        rating,
        comment: review.comment.clone(),
        date: review.date,
    });

    let mut batch = WriteBatch::new();
    let appended = ctx.catalog.stage_review(product_id, &review, &mut batch)?;
    let users = ctx.auth.stage_update(&updated, &mut batch)?;
    ctx.storage.commit(batch)?;

    tracing::info!(user_id = %updated.id, review_id = %review.id, "review submitted");

    ctx.catalog.apply_review(appended, product_id, review.clone());
    ctx.auth.apply_update(updated, users);
    Ok(review)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::state::tests::{memory_storefront, register_with_wallet};

    #[test]
    fn test_review_lands_on_product_and_profile() {
        let mut ctx = memory_storefront();
        register_with_wallet(&mut ctx, 0);

        let review = submit_review(&mut ctx, ProductId::new(4), 5, "  Very dark lines ").unwrap();
        assert_eq!(review.user, "Asha");
        assert_eq!(review.comment, "Very dark lines");

        let product = ctx.catalog().get(ProductId::new(4)).unwrap();
        assert_eq!(product.reviews.last(), Some(&review));

        let mine = &ctx.require_user().unwrap().my_reviews;
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].product_id, ProductId::new(4));
        assert_eq!(mine[0].rating.stars(), 5);
    }

    #[test]
    fn test_invalid_input_rejected() {
        let mut ctx = memory_storefront();
        register_with_wallet(&mut ctx, 0);

        assert!(matches!(
            submit_review(&mut ctx, ProductId::new(1), 0, "ok"),
            Err(ReviewError::InvalidRating(_))
        ));
        assert!(matches!(
            submit_review(&mut ctx, ProductId::new(1), 3, "   "),
            Err(ReviewError::EmptyComment)
        ));
        assert!(matches!(
            submit_review(&mut ctx, ProductId::new(99), 3, "ok"),
            Err(ReviewError::Catalog(CatalogError::NotFound(_)))
        ));
        assert!(ctx.require_user().unwrap().my_reviews.is_empty());
    }

    #[test]
    fn test_requires_login() {
        let mut ctx = memory_storefront();
        assert!(matches!(
            submit_review(&mut ctx, ProductId::new(1), 4, "Nice"),
            Err(ReviewError::Auth(AuthError::NotAuthenticated))
        ));
        assert_eq!(ctx.catalog().get(ProductId::new(1)).unwrap().reviews.len(), 2);
    }
}
