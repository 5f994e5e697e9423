//! Profile editing.

use thiserror::Error;

use palette_core::{Email, EmailError};

use crate::services::auth::AuthError;
use crate::state::Storefront;

/// Digits required in a phone number.
pub const PHONE_DIGITS: usize = 10;

/// Errors that can occur when saving a profile.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// Phone number is not exactly ten digits.
    #[error("phone must be {PHONE_DIGITS} digits")]
    InvalidPhone,

    /// Email is malformed.
    #[error("invalid email format: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Another user already has this email.
    #[error("email already registered")]
    EmailTaken,

    /// Name is blank.
    #[error("name cannot be empty")]
    EmptyName,

    /// Not signed in, or the user could not be saved.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Editable profile fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileForm {
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// Phone number, ten digits. Non-digits are ignored.
    pub phone: String,
    /// Dialling prefix, e.g. `+91`.
    pub country_code: String,
    /// Shipping address.
    pub address: String,
}

impl ProfileForm {
    /// Pre-fill the form from the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::Auth` when anonymous.
    pub fn for_current_user(ctx: &Storefront) -> Result<Self, ProfileError> {
        let user = ctx.require_user()?;
        Ok(Self {
            name: user.name.clone(),
            email: user.email.as_str().to_owned(),
            phone: user.phone.clone().unwrap_or_default(),
            country_code: user.country_code.clone().unwrap_or_default(),
            address: user.address.clone().unwrap_or_default(),
        })
    }

    /// Validate the form and save it onto the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::InvalidPhone`, `ProfileError::InvalidEmail`,
    /// `ProfileError::EmptyName` or `ProfileError::EmailTaken` for bad
    /// input and `ProfileError::Auth` when anonymous or if saving fails.
    pub fn apply(&self, ctx: &mut Storefront) -> Result<(), ProfileError> {
        let mut user = ctx.auth.require_user()?.clone();

        let name = self.name.trim();
        if name.is_empty() {
            return Err(ProfileError::EmptyName);
        }

        let phone: String = self.phone.chars().filter(char::is_ascii_digit).collect();
        if phone.len() != PHONE_DIGITS {
            return Err(ProfileError::InvalidPhone);
        }

        let email = Email::parse(self.email.trim())?;
        if ctx.auth.email_in_use(email.as_str(), Some(user.id)) {
            return Err(ProfileError::EmailTaken);
        }

        user.name = name.to_owned();
        user.email = email;
        user.phone = Some(phone);
        user.country_code = Some(self.country_code.trim().to_owned()).filter(|c| !c.is_empty());
        user.address = Some(self.address.trim().to_owned()).filter(|a| !a.is_empty());

        let user_id = user.id;
        ctx.auth.update_user(ctx.storage.as_ref(), user)?;
        tracing::info!(%user_id, "profile updated");
        Ok(())
    }
}
