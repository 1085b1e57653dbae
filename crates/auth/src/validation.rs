//! Input policies applied by callers before they reach the credential service.
//!
//! `register` and `change_password` only rely on these for their own
//! preconditions; uniqueness is enforced by the service and the store.

use chrono::NaiveDate;
use serde::Deserialize;

use authgate_core::{AuthError, AuthResult};

pub const MIN_USERNAME_LEN: usize = 7;
pub const MIN_PASSWORD_LEN: usize = 8;
pub const MIN_AGE_YEARS: i64 = 14;

/// At least seven characters, Latin letters only, first one uppercase.
pub fn validate_username(username: &str) -> AuthResult<()> {
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(AuthError::validation(format!(
            "username must be at least {MIN_USERNAME_LEN} characters"
        )));
    }
    if !username.chars().next().is_some_and(|c| c.is_uppercase()) {
        return Err(AuthError::validation(
            "username must start with an uppercase letter",
        ));
    }
    if !username.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(AuthError::validation(
            "username may only contain Latin letters",
        ));
    }
    Ok(())
}

/// Password composition policy; only ASCII digits count as digits.
/// Failures are [`AuthError::WeakPassword`].
pub fn validate_password(password: &str) -> AuthResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::weak_password(format!(
            "must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AuthError::weak_password("must contain a digit"));
    }
    if !password.chars().any(|c| c.is_alphabetic()) {
        return Err(AuthError::weak_password("must contain a letter"));
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        return Err(AuthError::weak_password("must contain an uppercase letter"));
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        return Err(AuthError::weak_password("must contain a lowercase letter"));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> AuthResult<()> {
    let mut parts = email.split('@');
    let valid = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && !domain.is_empty()
                && !email.chars().any(char::is_whitespace)
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(AuthError::validation("email address is malformed"))
    }
}

/// Whole years between `birthday` and `today`, as elapsed days divided by 365.
///
/// Leap days are ignored, so this can run a day or so ahead of the calendar
/// birthday near the cutoff.
pub fn age_in_years(birthday: NaiveDate, today: NaiveDate) -> i64 {
    (today - birthday).num_days().div_euclid(365)
}

pub fn validate_birthday(birthday: NaiveDate, today: NaiveDate) -> AuthResult<()> {
    if age_in_years(birthday, today) < MIN_AGE_YEARS {
        return Err(AuthError::validation(format!(
            "must be at least {MIN_AGE_YEARS} years old"
        )));
    }
    Ok(())
}

#[derive(Clone, Deserialize)]
pub struct RegistrationRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(alias = "c_password")]
    pub confirm_password: String,
    pub birthday: NaiveDate,
}

impl core::fmt::Debug for RegistrationRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RegistrationRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("birthday", &self.birthday)
            .finish_non_exhaustive()
    }
}

impl RegistrationRequest {
    pub fn validate(&self, today: NaiveDate) -> AuthResult<()> {
        validate_username(&self.username)?;
        validate_email(&self.email)?;
        validate_password(&self.password)?;
        if self.password != self.confirm_password {
            return Err(AuthError::validation("passwords do not match"));
        }
        validate_birthday(self.birthday, today)
    }
}

#[derive(Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl core::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl LoginRequest {
    pub fn validate(&self) -> AuthResult<()> {
        validate_username(&self.username)?;
        validate_password(&self.password)
    }
}
