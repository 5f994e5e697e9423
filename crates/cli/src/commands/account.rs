//! Account commands: register, login, logout, profile.

use std::io::{self, BufRead, Write};

use secrecy::{ExposeSecret, SecretString};

use palette_storefront::services::{ProfileForm, Registration};
use palette_storefront::{AppError, Storefront};

use crate::output::{self, say};

/// Registration details other than the password.
pub struct RegisterArgs {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub country_code: String,
    pub address: String,
}

/// Profile fields to change. `None` keeps the current value.
#[derive(Default)]
pub struct ProfileEdit {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub country_code: Option<String>,
    pub address: Option<String>,
}

/// Shown before reading a password from stdin, which echoes it.
const PASSWORD_PROMPT: &str = "Password (visible as you type; set PALETTE_PASSWORD to avoid this): ";

/// Use the given password or ask for one on stdin.
///
/// # Errors
///
/// Returns `AppError::Io` if stdin cannot be read.
pub fn password_or_prompt(given: Option<String>) -> Result<SecretString, AppError> {
    if let Some(password) = given {
        return Ok(SecretString::from(password));
    }

    print_prompt(PASSWORD_PROMPT)?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(SecretString::from(line.trim_end_matches(['\r', '\n']).to_owned()))
}

fn print_prompt(prompt: &str) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(prompt.as_bytes())?;
    stdout.flush()
}

/// Create an account and sign in.
///
/// # Errors
///
/// Returns `AppError::Auth` if the email is taken or invalid.
pub fn register(
    shop: &mut Storefront,
    args: &RegisterArgs,
    password: &SecretString,
) -> Result<(), AppError> {
    let user = shop.register(Registration {
        name: &args.name,
        email: &args.email,
        password: password.expose_secret(),
        phone: &args.phone,
        country_code: &args.country_code,
        address: &args.address,
    })?;
    say(format!("Welcome, {}! Your account is ready.", user.name));
    Ok(())
}

/// Sign in.
///
/// # Errors
///
/// Returns `AppError::Auth` for wrong credentials.
pub fn login(shop: &mut Storefront, email: &str, password: &SecretString) -> Result<(), AppError> {
    let user = shop.login(email, password.expose_secret())?;
    say(format!("Signed in as {}.", user.name));
    Ok(())
}

/// Sign out.
///
/// # Errors
///
/// Returns `AppError::Auth` if the session record cannot be removed.
pub fn logout(shop: &mut Storefront) -> Result<(), AppError> {
    if !shop.is_authenticated() {
        say("Not signed in.");
        return Ok(());
    }
    shop.logout()?;
    say("Signed out.");
    Ok(())
}

/// Show who is signed in.
pub fn whoami(shop: &Storefront) {
    match shop.auth().current_user() {
        Some(user) => say(format!("{} <{}>", user.name, user.email.as_str())),
        None => say("Not signed in."),
    }
}

/// Print the signed-in profile with history and recommendations.
///
/// # Errors
///
/// Returns `AppError::Auth` when nobody is signed in.
pub fn show_profile(shop: &Storefront) -> Result<(), AppError> {
    let user = shop.require_user()?;
    output::profile(user);

    if !user.history.is_empty() {
        say("Recently viewed:");
        for entry in &user.history {
            let name = shop
                .catalog()
                .find(entry.product_id)
                .map_or("(no longer sold)", |p| p.name.as_str());
            say(format!("  {}  {name}", entry.viewed_at.format("%Y-%m-%d %H:%M")));
        }
    }

    if !user.recommendations.is_empty() {
        say("Recommended for you:");
        for rec in &user.recommendations {
            if let Some(product) = shop.catalog().find(rec.product_id) {
                say(format!(
                    "  {}  ({})",
                    output::product_line(product),
                    rec.reason.as_deref().unwrap_or("suggested")
                ));
            }
        }
    }
    Ok(())
}

/// Apply profile changes.
///
/// # Errors
///
/// Returns `AppError::Profile` if the new values are invalid.
pub fn edit_profile(shop: &mut Storefront, edit: ProfileEdit) -> Result<(), AppError> {
    let mut form = ProfileForm::for_current_user(shop)?;
    if let Some(name) = edit.name {
        form.name = name;
    }
    if let Some(email) = edit.email {
        form.email = email;
    }
    if let Some(phone) = edit.phone {
        form.phone = phone;
    }
    if let Some(country_code) = edit.country_code {
        form.country_code = country_code;
    }
    if let Some(address) = edit.address {
        form.address = address;
    }

    form.apply(shop)?;
    say("Profile updated successfully.");
    Ok(())
}
