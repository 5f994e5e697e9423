//! Interactive shopping session.
//!
//! The cart and wishlist exist only for the length of the session, so
//! browsing, carting and checkout happen in one loop over stdin.

use std::io::{self, BufRead, Write};

use palette_core::{PaymentMethod, ProductId};
use palette_storefront::services::{Cart, checkout};
use palette_storefront::{AppError, Storefront};

use crate::output::{self, say};

const HELP: &str = "\
Commands:
  list                   show all products
  search <text>          find products
  view <id>              product details
  add <id> [qty]         add to cart
  dec <id> [qty]         take units out of the cart
  remove <id>            drop a cart line
  cart                   show the cart
  clear                  empty the cart
  wish <id>              add to or remove from the wishlist
  wishlist               show the wishlist
  balance                wallet balance
  checkout [wallet|card|cod]
  help                   this text
  quit                   leave (the cart is discarded)";

/// One line of shop input.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ShopCommand {
    List,
    Search(String),
    View(ProductId),
    Add(ProductId, u32),
    Decrease(ProductId, u32),
    Remove(ProductId),
    Cart,
    Clear,
    Wish(ProductId),
    Wishlist,
    Balance,
    Checkout(PaymentMethod),
    Help,
    Quit,
}

impl ShopCommand {
    /// Parse a line. Blank lines give `Ok(None)`.
    fn parse(line: &str) -> Result<Option<Self>, String> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();

        let command = match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("list" | "ls", []) => Self::List,
            ("search", [_, ..]) => Self::Search(args.join(" ")),
            ("view" | "show", [id]) => Self::View(parse_id(id)?),
            ("add", [id]) => Self::Add(parse_id(id)?, 1),
            ("add", [id, qty]) => Self::Add(parse_id(id)?, parse_qty(qty)?),
            ("dec", [id]) => Self::Decrease(parse_id(id)?, 1),
            ("dec", [id, qty]) => Self::Decrease(parse_id(id)?, parse_qty(qty)?),
            ("remove" | "rm", [id]) => Self::Remove(parse_id(id)?),
            ("cart", []) => Self::Cart,
            ("clear", []) => Self::Clear,
            ("wish", [id]) => Self::Wish(parse_id(id)?),
            ("wishlist", []) => Self::Wishlist,
            ("balance", []) => Self::Balance,
            ("checkout", []) => Self::Checkout(PaymentMethod::default()),
            ("checkout", [method]) => Self::Checkout(method.parse()?),
            ("help" | "?", []) => Self::Help,
            ("quit" | "exit", []) => Self::Quit,
            _ => return Err(format!("unknown command: {line} (try `help`)")),
        };
        Ok(Some(command))
    }
}

fn parse_id(word: &str) -> Result<ProductId, String> {
    word.trim_start_matches('#')
        .parse()
        .map_err(|_| format!("not a product id: {word}"))
}

fn parse_qty(word: &str) -> Result<u32, String> {
    match word.parse::<u32>() {
        Ok(qty) if qty > 0 => Ok(qty),
        _ => Err(format!("not a quantity: {word}")),
    }
}

/// Run the session until `quit` or end of input.
///
/// # Errors
///
/// Returns `AppError::Io` if stdin or stdout fail. Store errors are shown
/// and the session continues.
pub fn run(shop: &mut Storefront) -> Result<(), AppError> {
    match shop.auth().current_user() {
        Some(user) => say(format!("Hello {}! Type `help` for commands.", user.name)),
        None => say("Browsing as a guest; log in to check out. Type `help` for commands."),
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        prompt()?;
        let Some(line) = lines.next().transpose()? else {
            break;
        };

        let command = match ShopCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                say(message);
                continue;
            }
        };

        if command == ShopCommand::Quit {
            break;
        }
        if let Err(e) = dispatch(shop, command) {
            tracing::debug!(error = %e, "shop command failed");
            say(e.user_message());
        }
    }

    if !shop.cart().is_empty() {
        tracing::info!(items = shop.cart().count(), "session ended with items in cart");
    }
    Ok(())
}

fn prompt() -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(b"palette> ")?;
    stdout.flush()
}

fn dispatch(shop: &mut Storefront, command: ShopCommand) -> Result<(), AppError> {
    match command {
        ShopCommand::List => super::catalog::list(shop),
        ShopCommand::Search(term) => super::catalog::search(shop, &term),
        ShopCommand::View(id) => {
            super::catalog::show(shop, id)?;
            let state = if shop.wishlist().contains(id) { "♥ in wishlist" } else { "♡" };
            say(format!("     {state}"));
        }
        ShopCommand::Add(id, qty) => {
            let product = shop.catalog().get(id)?.clone();
            shop.cart_mut().add(&product, qty);
            say(format!("{} added to cart.", product.name));
        }
        ShopCommand::Decrease(id, qty) => {
            if shop.cart_mut().decrease(id, qty) {
                say(decreased_notice(shop.cart(), id));
            } else {
                say("That product is not in your cart.");
            }
        }
        ShopCommand::Remove(id) => {
            if shop.cart_mut().remove(id) {
                say("Removed from cart.");
            } else {
                say("That product is not in your cart.");
            }
        }
        ShopCommand::Cart => show_cart(shop),
        ShopCommand::Clear => {
            shop.cart_mut().clear();
            say("Cart cleared.");
        }
        ShopCommand::Wish(id) => {
            let product = shop.catalog().get(id)?.clone();
            if shop.wishlist_mut().toggle(&product) {
                say(format!("{} added to wishlist.", product.name));
            } else {
                say(format!("{} removed from wishlist.", product.name));
            }
        }
        ShopCommand::Wishlist => {
            if shop.wishlist().items().is_empty() {
                say("Your wishlist is empty.");
            }
            for product in shop.wishlist().items() {
                say(output::product_line(product));
            }
        }
        ShopCommand::Balance => super::wallet::balance(shop)?,
        ShopCommand::Checkout(method) => {
            let order = checkout(shop, method)?;
            say(format!(
                "Order placed successfully! {} paid by {}.",
                order.total,
                order.payment_method.label()
            ));
            if let Ok(user) = shop.require_user() {
                say(format!("Wallet balance: {}", user.wallet));
            }
        }
        ShopCommand::Help => say(HELP),
        ShopCommand::Quit => {}
    }
    Ok(())
}

/// What to tell the user after units of `id` were taken out.
fn decreased_notice(cart: &Cart, id: ProductId) -> String {
    cart.items()
        .iter()
        .find(|item| item.product.id == id)
        .map_or_else(
            || "Removed from cart.".to_owned(),
            |item| format!("{} now x{} in cart.", item.product.name, item.quantity),
        )
}

fn show_cart(shop: &Storefront) {
    let cart = shop.cart();
    if cart.is_empty() {
        say("Your cart is empty.");
        return;
    }
    for item in cart.items() {
        say(output::cart_line(item));
    }
    match cart.total() {
        Some(total) => say(format!("{} items, total {total}", cart.count())),
        None => say(format!("{} items, total out of range", cart.count())),
    }
    if let Ok(user) = shop.require_user() {
        say(format!("Wallet balance: {}", user.wallet));
    }
}
