use anyhow::Context;
use chrono::NaiveDateTime;
use rusqlite::Connection;

use crate::db::queries;
use crate::models::user::{normalize_phone, NewUser, DESCRIPTION_MAX_CHARS};
use crate::models::User;
use crate::services::verification;

#[derive(Debug, Clone)]
pub struct SignupRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    /// The number this browser proved it owns, read from its signed cookie.
    pub proven_phone: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SignupError {
    #[error("Please fill in every field.")]
    MissingFields,

    #[error("Oops, your email already exists")]
    EmailTaken,

    #[error("That number is already taken")]
    PhoneTaken,

    #[error("Please verify your phone number first.")]
    PhoneNotVerified,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("Please sign up.")]
    UnknownEmail,

    #[error("Incorrect password.")]
    WrongPassword,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("Your description must be 1000 characters or fewer.")]
    TooLong,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub fn hash_password(password: &str, cost: u32) -> anyhow::Result<String> {
    bcrypt::hash(password, cost).context("failed to hash password")
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// Creates the account for a verified phone number and consumes its code.
/// The number must be the one the requesting browser verified.
pub fn register(
    conn: &Connection,
    request: &SignupRequest,
    password_hash: String,
    now: NaiveDateTime,
) -> Result<User, SignupError> {
    let email = request.email.trim();
    let phone = normalize_phone(&request.phone_number);

    if request.first_name.trim().is_empty()
        || request.last_name.trim().is_empty()
        || email.is_empty()
        || phone.is_empty()
    {
        return Err(SignupError::MissingFields);
    }

    if queries::get_user_by_email(conn, email)?.is_some() {
        return Err(SignupError::EmailTaken);
    }
    if queries::get_user_by_phone(conn, &phone)?.is_some() {
        return Err(SignupError::PhoneTaken);
    }
    if request.proven_phone.as_deref() != Some(phone.as_str())
        || !verification::is_verified(conn, &phone, now)?
    {
        return Err(SignupError::PhoneNotVerified);
    }

    let id = queries::create_user(
        conn,
        &NewUser {
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            email: email.to_string(),
            password_hash,
            phone_number: phone.clone(),
            phone_verified: true,
        },
    )?;
    queries::delete_verification_code(conn, &phone)?;

    tracing::info!(user_id = id, "user signed up");

    queries::get_user(conn, id)?
        .ok_or_else(|| SignupError::Internal(anyhow::anyhow!("user {id} missing after insert")))
}

/// Looks up the account for a login attempt. The password is checked by the
/// caller with [`verify_password`] once the connection is released.
pub fn find_login_user(conn: &Connection, email: &str) -> Result<User, LoginError> {
    queries::get_user_by_email(conn, email.trim())?.ok_or(LoginError::UnknownEmail)
}

pub fn update_profile(
    conn: &Connection,
    user_id: i64,
    description: &str,
) -> Result<(), ProfileError> {
    let description = description.trim();
    if description.chars().count() > DESCRIPTION_MAX_CHARS {
        return Err(ProfileError::TooLong);
    }

    if !queries::update_description(conn, user_id, description)? {
        return Err(ProfileError::Internal(anyhow::anyhow!(
            "user {user_id} not found"
        )));
    }
    Ok(())
}
