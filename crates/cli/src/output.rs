//! Terminal output.
//!
//! Everything the CLI shows the user goes through here; logs go to stderr
//! via `tracing`.

#![allow(clippy::print_stdout)]

use palette_storefront::models::{Order, Product, User};
use palette_storefront::services::CartItem;

/// Print one line.
pub fn say(line: impl std::fmt::Display) {
    println!("{line}");
}

/// One-line product summary: id, name, price, average stars.
pub fn product_line(product: &Product) -> String {
    let rating = product
        .average_rating()
        .map_or_else(|| "no reviews".to_owned(), |avg| format!("{avg:.1}★"));
    format!(
        "#{:<3} {:<20} {:>8}  {rating}",
        product.id,
        product.name,
        product.price.to_string()
    )
}

/// Product detail with reviews.
pub fn product_detail(product: &Product) {
    say(product_line(product));
    if let Some(category) = &product.category {
        say(format!("     category: {category}"));
    }
    say(format!("     {}", product.description));
    if product.reviews.is_empty() {
        say("     No reviews yet.");
    }
    for review in &product.reviews {
        say(format!(
            "     {} {}  {}: {}",
            review.date,
            "★".repeat(usize::from(review.rating.stars())),
            review.user,
            review.comment
        ));
    }
}

/// Cart line with its subtotal.
pub fn cart_line(item: &CartItem) -> String {
    format!(
        "#{:<3} {:<20} x{:<3} {:>8}",
        item.product.id,
        item.product.name,
        item.quantity,
        item.line_total().map_or_else(|| "-".to_owned(), |total| total.to_string())
    )
}

/// Profile summary.
pub fn profile(user: &User) {
    say(format!("Name:    {}", user.name));
    say(format!("Email:   {}", user.email.as_str()));
    say(format!(
        "Phone:   {} {}",
        user.country_code.as_deref().unwrap_or(""),
        user.phone.as_deref().unwrap_or("-")
    ));
    say(format!("Address: {}", user.address.as_deref().unwrap_or("-")));
    say(format!("Wallet:  {}", user.wallet));
    if !user.my_reviews.is_empty() {
        say(format!("Reviews written: {}", user.my_reviews.len()));
    }
}

/// Order summary line.
pub fn order_line(order: &Order) -> String {
    format!(
        "{}  {}  {:>8}  {}",
        order.date.format("%Y-%m-%d %H:%M"),
        order.id,
        order.total.to_string(),
        order.payment_method.label()
    )
}
