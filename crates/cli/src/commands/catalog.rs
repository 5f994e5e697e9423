//! Catalog commands.

use palette_core::ProductId;
use palette_storefront::{AppError, Storefront};

use crate::output::{self, say};

/// List every product.
pub fn list(shop: &Storefront) {
    for product in shop.catalog().products() {
        say(output::product_line(product));
    }
}

/// Show one product. Signed-in users get the view added to their history.
///
/// # Errors
///
/// Returns `AppError::Catalog` for an unknown product.
pub fn show(shop: &mut Storefront, id: ProductId) -> Result<(), AppError> {
    let product = shop.view_product(id)?;
    output::product_detail(product);
    Ok(())
}

/// Search by name or description.
pub fn search(shop: &Storefront, term: &str) {
    let hits = shop.catalog().search(term);
    if hits.is_empty() {
        say(format!("No products match \"{term}\"."));
    }
    for product in hits {
        say(output::product_line(product));
    }
}
