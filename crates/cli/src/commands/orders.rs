//! Order history and reviews.

use palette_core::{Price, ProductId};
use palette_storefront::services::submit_review;
use palette_storefront::{AppError, Storefront};

use crate::output::{self, say};

/// List the signed-in user's orders with their lines.
///
/// # Errors
///
/// Returns `AppError::Auth` when nobody is signed in.
pub fn list(shop: &Storefront) -> Result<(), AppError> {
    let user = shop.require_user()?;
    let mut spent = Some(Price::ZERO);
    let mut any = false;

    for order in shop.orders().for_user(user.id) {
        any = true;
        spent = spent.and_then(|sum| sum.checked_add(order.total));
        say(output::order_line(order));
        for item in &order.items {
            say(format!(
                "    {} x{} @ {}",
                item.name, item.quantity, item.price
            ));
        }
    }

    match (any, spent) {
        (false, _) => say("You have not placed any orders yet."),
        (true, Some(spent)) => say(format!("Total spent: {spent}")),
        (true, None) => say("Total spent: out of range"),
    }
    Ok(())
}

/// Review a product.
///
/// # Errors
///
/// Returns `AppError::Review` when anonymous or for invalid input.
pub fn review(
    shop: &mut Storefront,
    product: ProductId,
    rating: i64,
    comment: &str,
) -> Result<(), AppError> {
    submit_review(shop, product, rating, comment)?;
    say("Review submitted!");
    Ok(())
}
