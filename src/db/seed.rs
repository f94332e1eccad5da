//! Fixture data for local development and the test suites.

use anyhow::Context;
use chrono::{Duration, NaiveTime, Utc};
use rusqlite::{params, Connection};

use crate::db::queries::{self, DATETIME_FMT, DATE_FMT, TIME_FMT};
use crate::models::user::NewUser;
use crate::models::{Business, EventStatus, VerificationCode};

pub const FAKE_BUSINESS_URL: &str = "http://www.afakeurllink.com";

/// Phone number with an outstanding verification code of `1234`.
pub const PENDING_PHONE: &str = "1111111111";
pub const PENDING_CODE: &str = "1234";

/// Seeds users, a business, categories, one matched event and a pending
/// verification code. Every seeded user's password is `123`.
pub fn example_data(conn: &Connection, bcrypt_cost: u32) -> anyhow::Result<()> {
    let password_hash =
        bcrypt::hash("123", bcrypt_cost).context("failed to hash fixture password")?;

    let users = [
        (1234, "Gordon", "Ramsay", "gramsay@gmail.com", "1234567890"),
        (4321, "Joe", "Bastianich", "joeb@gmail.com", "9876543210"),
        (5678, "Giada", "De Laurentiis", "giada@gmail.com", "5555555555"),
    ];
    for (id, first_name, last_name, email, phone_number) in users {
        queries::create_user_with_id(
            conn,
            id,
            &NewUser {
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                email: email.to_string(),
                password_hash: password_hash.clone(),
                phone_number: phone_number.to_string(),
                phone_verified: true,
            },
        )?;
    }
    queries::update_description(conn, 4321, "Restaurateur. Will travel for pasta.")?;

    let american = queries::upsert_category(conn, "American", "newamerican")?;
    queries::upsert_category(conn, "French", "french")?;
    queries::upsert_category(conn, "Italian", "italian")?;

    let business_id = queries::upsert_business(
        conn,
        &Business {
            id: 0,
            external_id: "good-eats-paris".to_string(),
            url: FAKE_BUSINESS_URL.to_string(),
            name: "Good Eats".to_string(),
            phone: Some("+33100000000".to_string()),
            display_phone: Some("+33 1 00 00 00 00".to_string()),
            rating: Some(4.5),
            review_count: 42,
            image_url: None,
            address: "1 Rue de Rivoli, 75001 Paris".to_string(),
            city: "Paris".to_string(),
            state_code: Some("75".to_string()),
            postal_code: Some("75001".to_string()),
            country_code: Some("FR".to_string()),
            latitude: Some(48.856614),
            longitude: Some(2.3522219),
            categories: "American".to_string(),
        },
    )?;

    let now = Utc::now().naive_utc();
    let date = now.date() + Duration::days(7);
    let start = NaiveTime::from_hms_opt(19, 0, 0).context("invalid fixture time")?;
    let end = NaiveTime::from_hms_opt(21, 0, 0).context("invalid fixture time")?;
    conn.execute(
        "INSERT INTO events (id, creator_id, partner_id, business_id, category_id, date, start_time, end_time, status, created_at)
         VALUES (1, 4321, 1234, ?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            business_id,
            american,
            date.format(DATE_FMT).to_string(),
            start.format(TIME_FMT).to_string(),
            end.format(TIME_FMT).to_string(),
            EventStatus::Matched.as_str(),
            now.format(DATETIME_FMT).to_string(),
        ],
    )?;

    queries::save_verification_code(
        conn,
        &VerificationCode {
            phone_number: PENDING_PHONE.to_string(),
            code: PENDING_CODE.to_string(),
            verified: false,
            created_at: now,
            expires_at: now + Duration::days(365),
        },
    )?;

    tracing::info!("seeded example data");
    Ok(())
}
