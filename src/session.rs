//! Cookie-backed sessions and one-shot flash messages.
//!
//! Signed cookies carry a value, the time it was issued and an HMAC-SHA1
//! signature over both plus the cookie's purpose. A client can read but not
//! forge them, a stale one is rejected, and a value signed for one purpose
//! is never accepted for another.

use std::convert::Infallible;
use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::state::AppState;

pub const SESSION_COOKIE: &str = "session";
pub const FLASH_COOKIE: &str = "flash";
pub const PHONE_COOKIE: &str = "verified_phone";

/// Sessions older than this count as logged out.
pub const SESSION_MAX_AGE_SECS: i64 = 14 * 24 * 60 * 60;

/// How long a browser may claim the number it just verified.
pub const PHONE_PROOF_MAX_AGE_SECS: i64 = 30 * 60;

const CLOCK_SKEW_SECS: i64 = 60;

const SESSION_PURPOSE: &str = "session";
const PHONE_PURPOSE: &str = "phone";

type HmacSha1 = Hmac<Sha1>;

fn mac_for(secret: &str, purpose: &str, payload: &str) -> Option<HmacSha1> {
    let mut mac = HmacSha1::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(purpose.as_bytes());
    mac.update(b"|");
    mac.update(payload.as_bytes());
    Some(mac)
}

/// `{value}:{issued_at}.{signature}`
fn seal(value: &str, issued_at: i64, purpose: &str, secret: &str) -> String {
    let payload = format!("{value}:{issued_at}");
    let signature = mac_for(secret, purpose, &payload)
        .map(|mac| URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
        .unwrap_or_default();
    format!("{payload}.{signature}")
}

fn unseal<'a>(
    sealed: &'a str,
    purpose: &str,
    secret: &str,
    max_age_secs: i64,
    now: i64,
) -> Option<&'a str> {
    let (payload, signature) = sealed.rsplit_once('.')?;
    let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;

    mac_for(secret, purpose, payload)?
        .verify_slice(&signature)
        .ok()?;

    let (value, issued_at) = payload.rsplit_once(':')?;
    let issued_at: i64 = issued_at.parse().ok()?;
    if issued_at > now + CLOCK_SKEW_SECS || now - issued_at > max_age_secs {
        return None;
    }
    Some(value)
}

/// Produces the session cookie value for `user_id`.
pub fn sign(user_id: i64, secret: &str) -> String {
    sign_at(user_id, secret, Utc::now().timestamp())
}

pub fn sign_at(user_id: i64, secret: &str, issued_at: i64) -> String {
    seal(&user_id.to_string(), issued_at, SESSION_PURPOSE, secret)
}

/// Returns the user id if `value` is a valid, unexpired session.
pub fn verify(value: &str, secret: &str) -> Option<i64> {
    verify_at(value, secret, Utc::now().timestamp())
}

pub fn verify_at(value: &str, secret: &str, now: i64) -> Option<i64> {
    unseal(value, SESSION_PURPOSE, secret, SESSION_MAX_AGE_SECS, now)?
        .parse()
        .ok()
}

pub fn session_user_id(jar: &CookieJar, secret: &str) -> Option<i64> {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| verify(cookie.value(), secret))
}

pub fn log_in(jar: CookieJar, user_id: i64, secret: &str) -> CookieJar {
    let cookie = Cookie::build((SESSION_COOKIE, sign(user_id, secret)))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .build();
    jar.add(cookie)
}

pub fn log_out(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

/// Remembers that this browser proved ownership of `phone`.
pub fn prove_phone(jar: CookieJar, phone: &str, secret: &str) -> CookieJar {
    let value = seal(phone, Utc::now().timestamp(), PHONE_PURPOSE, secret);
    let cookie = Cookie::build((PHONE_COOKIE, value))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .build();
    jar.add(cookie)
}

/// The phone number this browser verified recently, if any.
pub fn proven_phone(jar: &CookieJar, secret: &str) -> Option<String> {
    let cookie = jar.get(PHONE_COOKIE)?;
    unseal(
        cookie.value(),
        PHONE_PURPOSE,
        secret,
        PHONE_PROOF_MAX_AGE_SECS,
        Utc::now().timestamp(),
    )
    .map(str::to_string)
}

pub fn clear_phone_proof(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(PHONE_COOKIE).path("/"))
}

pub fn set_flash(jar: CookieJar, message: &str) -> CookieJar {
    let cookie = Cookie::build((FLASH_COOKIE, URL_SAFE_NO_PAD.encode(message)))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .build();
    jar.add(cookie)
}

/// Reads the pending flash message, if any, and clears it.
pub fn take_flash(jar: CookieJar) -> (CookieJar, Option<String>) {
    let message = jar
        .get(FLASH_COOKIE)
        .and_then(|cookie| URL_SAFE_NO_PAD.decode(cookie.value()).ok())
        .and_then(|bytes| String::from_utf8(bytes).ok());

    match message {
        Some(message) => (jar.remove(Cookie::build(FLASH_COOKIE).path("/")), Some(message)),
        None => (jar, None),
    }
}

/// The logged-in user's id. Requests without a valid session are
/// redirected to the login page.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub i64);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        match session_user_id(&jar, &state.config.secret_key) {
            Some(id) => Ok(CurrentUser(id)),
            None => {
                tracing::debug!(path = %parts.uri.path(), "no valid session, redirecting to login");
                Err(Redirect::to("/login").into_response())
            }
        }
    }
}

/// The logged-in user's id when there is one.
#[derive(Debug, Clone, Copy)]
pub struct MaybeUser(pub Option<i64>);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for MaybeUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        Ok(MaybeUser(session_user_id(&jar, &state.config.secret_key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> i64 {
        Utc::now().timestamp()
    }

    #[test]
    fn test_sign_and_verify() {
        let value = sign(1234, "key");
        assert!(value.starts_with("1234:"));
        assert_eq!(verify(&value, "key"), Some(1234));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let value = sign(1234, "key");
        assert_eq!(verify(&value, "other-key"), None);
    }

    #[test]
    fn test_tampered_user_id_rejected() {
        let value = sign(1234, "key");
        let forged = value.replacen("1234", "4321", 1);
        assert_eq!(verify(&forged, "key"), None);
    }

    #[test]
    fn test_tampered_timestamp_rejected() {
        let issued_at = now() - SESSION_MAX_AGE_SECS - 10;
        let stale = sign_at(1234, "key", issued_at);
        let refreshed = stale.replacen(&issued_at.to_string(), &now().to_string(), 1);
        assert_eq!(verify(&refreshed, "key"), None);
    }

    #[test]
    fn test_session_expires() {
        let issued_at = now() - SESSION_MAX_AGE_SECS - 1;
        let value = sign_at(1234, "key", issued_at);
        assert_eq!(verify(&value, "key"), None);

        let recent = sign_at(1234, "key", now() - 60);
        assert_eq!(verify(&recent, "key"), Some(1234));
    }

    #[test]
    fn test_future_session_rejected() {
        let value = sign_at(1234, "key", now() + 3600);
        assert_eq!(verify(&value, "key"), None);
    }

    #[test]
    fn test_malformed_values_rejected() {
        assert_eq!(verify("", "key"), None);
        assert_eq!(verify("1234", "key"), None);
        assert_eq!(verify("abc.def", "key"), None);
        assert_eq!(verify("1234.!!!", "key"), None);
        assert_eq!(verify("1234:1.!!!", "key"), None);
    }

    #[test]
    fn test_phone_proof_round_trip() {
        let jar = prove_phone(CookieJar::new(), "1111111111", "key");
        assert_eq!(proven_phone(&jar, "key").as_deref(), Some("1111111111"));
        assert_eq!(proven_phone(&jar, "other-key"), None);

        let jar = clear_phone_proof(jar);
        assert_eq!(proven_phone(&jar, "key"), None);
    }

    #[test]
    fn test_phone_proof_is_not_a_session() {
        let jar = prove_phone(CookieJar::new(), "1234567", "key");
        let value = jar.get(PHONE_COOKIE).unwrap().value().to_string();
        assert_eq!(verify(&value, "key"), None);
    }

    #[test]
    fn test_flash_is_taken_once() {
        let jar = set_flash(CookieJar::new(), "You have a new meal plan!");
        let (jar, message) = take_flash(jar);
        assert_eq!(message.as_deref(), Some("You have a new meal plan!"));

        let (_, again) = take_flash(jar);
        assert!(again.is_none());
    }
}
