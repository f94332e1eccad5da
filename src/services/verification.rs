use chrono::{Duration, NaiveDateTime};
use rand::Rng;
use rusqlite::Connection;

use crate::db::queries;
use crate::models::user::normalize_phone;
use crate::models::VerificationCode;

const MIN_PHONE_DIGITS: usize = 7;
const MAX_PHONE_DIGITS: usize = 15;

/// Wrong submissions a code survives before it is thrown away.
pub const MAX_CODE_ATTEMPTS: i64 = 5;

/// How long a verified number stays claimable at signup.
pub const SIGNUP_WINDOW_MINUTES: i64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("Please enter a valid phone number.")]
    InvalidPhone,

    #[error("That number is already taken")]
    PhoneTaken,

    #[error("Invalid code.")]
    InvalidCode,

    #[error("Too many codes were sent to this number. Please try again later.")]
    TooManyCodes,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Normalizes a submitted phone number and checks its length.
pub fn parse_phone(raw: &str) -> Result<String, VerificationError> {
    let phone = normalize_phone(raw);
    if !(MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&phone.len()) {
        return Err(VerificationError::InvalidPhone);
    }
    Ok(phone)
}

pub fn generate_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..10_000);
    format!("{n:04}")
}

/// Issues a fresh code for `phone`, replacing any earlier one. Fails if a
/// user already owns the number or it already got `max_sends_per_hour`
/// codes this hour.
pub fn issue_code(
    conn: &Connection,
    raw_phone: &str,
    ttl_minutes: i64,
    max_sends_per_hour: i64,
    now: NaiveDateTime,
) -> Result<VerificationCode, VerificationError> {
    let phone = parse_phone(raw_phone)?;

    if queries::get_user_by_phone(conn, &phone)?.is_some() {
        return Err(VerificationError::PhoneTaken);
    }

    if queries::code_sends_this_hour(conn, &phone, &now)? >= max_sends_per_hour {
        tracing::warn!(phone = %phone, "verification code rate limit reached");
        return Err(VerificationError::TooManyCodes);
    }

    let code = VerificationCode {
        phone_number: phone,
        code: generate_code(),
        verified: false,
        created_at: now,
        expires_at: now + Duration::minutes(ttl_minutes),
    };
    queries::save_verification_code(conn, &code)?;
    queries::increment_code_sends(conn, &code.phone_number, &now)?;

    tracing::info!(phone = %code.phone_number, "issued verification code");
    Ok(code)
}

/// Marks `phone` verified when `submitted` matches its unexpired code. A code
/// is discarded once it expires or after [`MAX_CODE_ATTEMPTS`] wrong tries.
pub fn check_code(
    conn: &Connection,
    raw_phone: &str,
    submitted: &str,
    now: NaiveDateTime,
) -> Result<String, VerificationError> {
    let phone = normalize_phone(raw_phone);

    let Some(stored) = queries::get_verification_code(conn, &phone)? else {
        return Err(VerificationError::InvalidCode);
    };

    if stored.is_expired(&now) {
        queries::delete_verification_code(conn, &phone)?;
        return Err(VerificationError::InvalidCode);
    }

    if stored.code != submitted.trim() {
        let attempts = queries::record_failed_attempt(conn, &phone)?;
        if attempts >= MAX_CODE_ATTEMPTS {
            queries::delete_verification_code(conn, &phone)?;
            tracing::warn!(phone = %phone, attempts, "verification code discarded after repeated failures");
        } else {
            tracing::info!(phone = %phone, attempts, "verification code rejected");
        }
        return Err(VerificationError::InvalidCode);
    }

    queries::mark_phone_verified(
        conn,
        &phone,
        &(now + Duration::minutes(SIGNUP_WINDOW_MINUTES)),
    )?;
    Ok(phone)
}

/// Whether `phone` holds a verified code that has not yet expired.
pub fn is_verified(conn: &Connection, phone: &str, now: NaiveDateTime) -> anyhow::Result<bool> {
    Ok(queries::get_verification_code(conn, phone)?
        .map(|code| code.verified && !code.is_expired(&now))
        .unwrap_or(false))
}

pub fn sms_body(code: &str) -> String {
    format!("Your Fork&Spoon verification code is {code}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::db::seed::{self, PENDING_CODE, PENDING_PHONE};
    use chrono::Utc;

    fn setup_db() -> Connection {
        let conn = db::init_db(":memory:").unwrap();
        seed::example_data(&conn, 4).unwrap();
        conn
    }

    #[test]
    fn test_generate_code_is_four_digits() {
        for _ in 0..50 {
            let code = generate_code();
            assert_eq!(code.len(), 4);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_issue_code_for_taken_number() {
        let conn = setup_db();
        let result = issue_code(&conn, "1234567890", 10, 3, Utc::now().naive_utc());
        assert!(matches!(result, Err(VerificationError::PhoneTaken)));
    }

    #[test]
    fn test_issue_code_rejects_short_number() {
        let conn = setup_db();
        let result = issue_code(&conn, "12-34", 10, 3, Utc::now().naive_utc());
        assert!(matches!(result, Err(VerificationError::InvalidPhone)));
    }

    #[test]
    fn test_issue_then_check() {
        let conn = setup_db();
        let now = Utc::now().naive_utc();
        let issued = issue_code(&conn, "(246) 897-531", 10, 3, now).unwrap();
        assert_eq!(issued.phone_number, "246897531");

        let phone = check_code(&conn, "246897531", &issued.code, now).unwrap();
        assert_eq!(phone, "246897531");
        assert!(is_verified(&conn, "246897531", now).unwrap());
        let after_window = now + Duration::minutes(SIGNUP_WINDOW_MINUTES + 1);
        assert!(!is_verified(&conn, "246897531", after_window).unwrap());
    }

    #[test]
    fn test_wrong_code_is_invalid() {
        let conn = setup_db();
        let result = check_code(&conn, PENDING_PHONE, "1235", Utc::now().naive_utc());
        assert!(matches!(result, Err(VerificationError::InvalidCode)));
        assert!(!is_verified(&conn, PENDING_PHONE, Utc::now().naive_utc()).unwrap());
    }

    #[test]
    fn test_unknown_phone_is_invalid() {
        let conn = setup_db();
        let result = check_code(&conn, "2223334444", "1234", Utc::now().naive_utc());
        assert!(matches!(result, Err(VerificationError::InvalidCode)));
    }

    #[test]
    fn test_expired_code_is_invalid() {
        let conn = setup_db();
        let issued_at = Utc::now().naive_utc() - Duration::minutes(30);
        let issued = issue_code(&conn, "2223334444", 10, 3, issued_at).unwrap();

        let result = check_code(&conn, "2223334444", &issued.code, Utc::now().naive_utc());
        assert!(matches!(result, Err(VerificationError::InvalidCode)));
    }

    #[test]
    fn test_code_discarded_after_too_many_wrong_tries() {
        let conn = setup_db();
        let now = Utc::now().naive_utc();
        for _ in 0..MAX_CODE_ATTEMPTS {
            let result = check_code(&conn, PENDING_PHONE, "0000", now);
            assert!(matches!(result, Err(VerificationError::InvalidCode)));
        }

        // even the right code is refused now
        let result = check_code(&conn, PENDING_PHONE, PENDING_CODE, now);
        assert!(matches!(result, Err(VerificationError::InvalidCode)));
        assert!(queries::get_verification_code(&conn, PENDING_PHONE)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_right_code_still_works_below_the_limit() {
        let conn = setup_db();
        let now = Utc::now().naive_utc();
        for _ in 0..MAX_CODE_ATTEMPTS - 1 {
            assert!(check_code(&conn, PENDING_PHONE, "0000", now).is_err());
        }
        assert!(check_code(&conn, PENDING_PHONE, PENDING_CODE, now).is_ok());
    }

    #[test]
    fn test_issue_code_is_rate_limited() {
        let conn = setup_db();
        let now = Utc::now().naive_utc();
        for _ in 0..3 {
            issue_code(&conn, "2223334444", 10, 3, now).unwrap();
        }
        let result = issue_code(&conn, "2223334444", 10, 3, now);
        assert!(matches!(result, Err(VerificationError::TooManyCodes)));

        // other numbers are unaffected
        assert!(issue_code(&conn, "2223335555", 10, 3, now).is_ok());
        // and the next hour starts fresh
        assert!(issue_code(&conn, "2223334444", 10, 3, now + Duration::hours(1)).is_ok());
    }

    #[test]
    fn test_seeded_code_matches() {
        let conn = setup_db();
        assert!(check_code(&conn, PENDING_PHONE, PENDING_CODE, Utc::now().naive_utc()).is_ok());
    }
}
