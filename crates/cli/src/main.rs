//! Palette CLI - the art-supplies storefront from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Create an account. The password prompt echoes what you type, so
//! # prefer passing it through the environment.
//! PALETTE_PASSWORD=... palette register -n "Asha" -e asha@example.com --phone 9876543210
//!
//! # Browse
//! palette products list
//! palette products show 3
//!
//! # Top up and shop interactively
//! palette wallet deposit 2000
//! palette shop
//! ```
//!
//! # Commands
//!
//! - `register` / `login` / `logout` / `whoami` - Account session
//! - `profile` - Show or edit the signed-in profile
//! - `products` - List, show and search the catalog
//! - `wallet` - Balance, deposits and withdrawals
//! - `orders` - Purchase history
//! - `review` - Review a product
//! - `shop` - Interactive cart, wishlist and checkout session
//!
//! The signed-in user is remembered between invocations; the cart and
//! wishlist last for one `shop` session.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use palette_core::{Price, ProductId};
use palette_storefront::config::LogFormat;
use palette_storefront::{AppError, Storefront, StorefrontConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "palette")]
#[command(author, version, about = "Palette art-supplies storefront")]
struct Cli {
    /// Directory holding the shop's records (overrides `PALETTE_DATA_DIR`)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and sign in
    Register {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Phone number
        #[arg(long, default_value = "")]
        phone: String,

        /// Dialling prefix
        #[arg(long, default_value = "+91")]
        country_code: String,

        /// Shipping address
        #[arg(long, default_value = "")]
        address: String,

        /// Password. Prefer setting `PALETTE_PASSWORD`; when omitted the
        /// prompt shows the password as it is typed.
        #[arg(long, env = "PALETTE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Sign in
    Login {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password. Prefer setting `PALETTE_PASSWORD`; when omitted the
        /// prompt shows the password as it is typed.
        #[arg(long, env = "PALETTE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Sign out
    Logout,
    /// Show who is signed in
    Whoami,
    /// Show or edit the signed-in profile
    Profile {
        #[command(subcommand)]
        action: Option<ProfileAction>,
    },
    /// Browse the catalog
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// Manage the wallet
    Wallet {
        #[command(subcommand)]
        action: Option<WalletAction>,
    },
    /// List everything you have bought
    Orders,
    /// Review a product
    Review {
        /// Product to review
        product: ProductId,

        /// Stars, 1 to 5
        #[arg(short, long)]
        rating: i64,

        /// Review text
        #[arg(short, long)]
        comment: String,
    },
    /// Start an interactive shopping session
    Shop,
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Change profile fields; unspecified fields keep their value
    Edit {
        /// Display name
        #[arg(long)]
        name: Option<String>,

        /// Email address
        #[arg(long)]
        email: Option<String>,

        /// Phone number, 10 digits
        #[arg(long)]
        phone: Option<String>,

        /// Dialling prefix
        #[arg(long)]
        country_code: Option<String>,

        /// Shipping address
        #[arg(long)]
        address: Option<String>,
    },
}

#[derive(Subcommand)]
enum ProductsAction {
    /// List every product
    List,
    /// Show one product with its reviews
    Show {
        /// Product ID
        id: ProductId,
    },
    /// Find products by name or description
    Search {
        /// Text to look for
        term: String,
    },
}

#[derive(Subcommand)]
enum WalletAction {
    /// Show the balance
    Balance,
    /// Add funds
    Deposit {
        /// Amount in rupees
        amount: Price,
    },
    /// Take funds out
    Withdraw {
        /// Amount in rupees
        amount: Price,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(mut config) => {
            if let Some(dir) = cli.data_dir.clone() {
                config.data_dir = dir;
            }
            config
        }
        Err(e) => {
            init_tracing(LogFormat::Pretty);
            fail(&AppError::from(e));
        }
    };

    init_tracing(config.log_format);

    if let Err(e) = run(cli, &config) {
        fail(&e);
    }
}

/// Initialize tracing with `EnvFilter`, writing to stderr so command output
/// stays clean.
fn init_tracing(format: LogFormat) {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "palette_storefront=info,palette_cli=info".into());

    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Json => registry.with(fmt_layer.json()).init(),
        LogFormat::Pretty => registry.with(fmt_layer).init(),
    }
}

#[allow(clippy::print_stderr)]
fn fail(error: &AppError) -> ! {
    tracing::error!(error = %error, "Command failed");
    eprintln!("{}", error.user_message());
    std::process::exit(1);
}

fn run(cli: Cli, config: &StorefrontConfig) -> Result<(), AppError> {
    let mut shop = Storefront::from_config(config)?;

    match cli.command {
        Commands::Register {
            name,
            email,
            phone,
            country_code,
            address,
            password,
        } => {
            let password = commands::account::password_or_prompt(password)?;
            commands::account::register(
                &mut shop,
                &commands::account::RegisterArgs {
                    name,
                    email,
                    phone,
                    country_code,
                    address,
                },
                &password,
            )?;
        }
        Commands::Login { email, password } => {
            let password = commands::account::password_or_prompt(password)?;
            commands::account::login(&mut shop, &email, &password)?;
        }
        Commands::Logout => commands::account::logout(&mut shop)?,
        Commands::Whoami => commands::account::whoami(&shop),
        Commands::Profile { action } => match action {
            None => commands::account::show_profile(&shop)?,
            Some(ProfileAction::Edit {
                name,
                email,
                phone,
                country_code,
                address,
            }) => commands::account::edit_profile(
                &mut shop,
                commands::account::ProfileEdit {
                    name,
                    email,
                    phone,
                    country_code,
                    address,
                },
            )?,
        },
        Commands::Products { action } => match action {
            ProductsAction::List => commands::catalog::list(&shop),
            ProductsAction::Show { id } => commands::catalog::show(&mut shop, id)?,
            ProductsAction::Search { term } => commands::catalog::search(&shop, &term),
        },
        Commands::Wallet { action } => match action.unwrap_or(WalletAction::Balance) {
            WalletAction::Balance => commands::wallet::balance(&shop)?,
            WalletAction::Deposit { amount } => commands::wallet::deposit(&mut shop, amount)?,
            WalletAction::Withdraw { amount } => commands::wallet::withdraw(&mut shop, amount)?,
        },
        Commands::Orders => commands::orders::list(&shop)?,
        Commands::Review {
            product,
            rating,
            comment,
        } => commands::orders::review(&mut shop, product, rating, &comment)?,
        Commands::Shop => commands::shop::run(&mut shop)?,
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_password_help_warns_about_echo() {
        let command = Cli::command();
        for name in ["register", "login"] {
            let help = command
                .find_subcommand(name)
                .unwrap()
                .get_arguments()
                .find(|arg| arg.get_id() == "password")
                .unwrap()
                .get_help()
                .unwrap()
                .to_string();
            assert!(help.contains("PALETTE_PASSWORD"), "{name}: {help}");
            assert!(help.contains("as it is typed"), "{name}: {help}");
        }
    }
}
