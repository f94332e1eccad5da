use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::event::NewEvent;
use crate::models::user::{public_name, NewUser};
use crate::models::{
    Business, Category, Event, EventListing, EventStatus, User, VerificationCode,
};

pub const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FMT: &str = "%Y-%m-%d";
pub const TIME_FMT: &str = "%H:%M";

// ── Users ──

const USER_COLUMNS: &str =
    "id, first_name, last_name, email, password_hash, phone_number, phone_verified, description, created_at";

pub fn create_user(conn: &Connection, user: &NewUser) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO users (first_name, last_name, email, password_hash, phone_number, phone_verified)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            user.first_name,
            user.last_name,
            user.email,
            user.password_hash,
            user.phone_number,
            user.phone_verified as i32,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Inserts a user with a fixed id. Used by the fixture seeder.
pub fn create_user_with_id(conn: &Connection, id: i64, user: &NewUser) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO users (id, first_name, last_name, email, password_hash, phone_number, phone_verified)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            id,
            user.first_name,
            user.last_name,
            user.email,
            user.password_hash,
            user.phone_number,
            user.phone_verified as i32,
        ],
    )?;
    Ok(())
}

pub fn get_user(conn: &Connection, id: i64) -> anyhow::Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    conn.query_row(&sql, params![id], |row| Ok(parse_user_row(row)))
        .optional()?
        .transpose()
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> anyhow::Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower(?1)");
    conn.query_row(&sql, params![email], |row| Ok(parse_user_row(row)))
        .optional()?
        .transpose()
}

pub fn get_user_by_phone(conn: &Connection, phone: &str) -> anyhow::Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE phone_number = ?1");
    conn.query_row(&sql, params![phone], |row| Ok(parse_user_row(row)))
        .optional()?
        .transpose()
}

pub fn update_description(conn: &Connection, id: i64, description: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE users SET description = ?1 WHERE id = ?2",
        params![description, id],
    )?;
    Ok(count > 0)
}

fn parse_user_row(row: &rusqlite::Row) -> anyhow::Result<User> {
    let created_at_str: String = row.get(8)?;

    Ok(User {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        password_hash: row.get(4)?,
        phone_number: row.get(5)?,
        phone_verified: row.get::<_, i32>(6)? != 0,
        description: row.get(7)?,
        created_at: parse_datetime(&created_at_str)?,
    })
}

// ── Categories ──

pub fn upsert_category(conn: &Connection, title: &str, alias: &str) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO categories (title, alias) VALUES (?1, ?2)
         ON CONFLICT(alias) DO UPDATE SET title = excluded.title",
        params![title, alias],
    )?;
    let id = conn.query_row(
        "SELECT id FROM categories WHERE alias = ?1",
        params![alias],
        |row| row.get(0),
    )?;
    Ok(id)
}

pub fn get_category(conn: &Connection, id: i64) -> anyhow::Result<Option<Category>> {
    let category = conn
        .query_row(
            "SELECT id, title, alias FROM categories WHERE id = ?1",
            params![id],
            |row| {
                Ok(Category {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    alias: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(category)
}

pub fn list_categories(conn: &Connection) -> anyhow::Result<Vec<Category>> {
    let mut stmt = conn.prepare("SELECT id, title, alias FROM categories ORDER BY title ASC")?;
    let rows = stmt.query_map([], |row| {
        Ok(Category {
            id: row.get(0)?,
            title: row.get(1)?,
            alias: row.get(2)?,
        })
    })?;

    let mut categories = vec![];
    for row in rows {
        categories.push(row?);
    }
    Ok(categories)
}

// ── Businesses ──

const BUSINESS_COLUMNS: &str = "id, external_id, url, name, phone, display_phone, rating, review_count, image_url, \
     address, city, state_code, postal_code, country_code, latitude, longitude, categories";

/// Inserts or refreshes a business snapshot keyed by url. `business.id` is
/// ignored; the stored row id is returned.
pub fn upsert_business(conn: &Connection, business: &Business) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO businesses (external_id, url, name, phone, display_phone, rating, review_count, image_url,
                                 address, city, state_code, postal_code, country_code, latitude, longitude, categories)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
         ON CONFLICT(url) DO UPDATE SET
           external_id = excluded.external_id,
           name = excluded.name,
           phone = excluded.phone,
           display_phone = excluded.display_phone,
           rating = excluded.rating,
           review_count = excluded.review_count,
           image_url = excluded.image_url,
           address = excluded.address,
           city = excluded.city,
           state_code = excluded.state_code,
           postal_code = excluded.postal_code,
           country_code = excluded.country_code,
           latitude = excluded.latitude,
           longitude = excluded.longitude,
           categories = excluded.categories,
           updated_at = datetime('now')",
        params![
            business.external_id,
            business.url,
            business.name,
            business.phone,
            business.display_phone,
            business.rating,
            business.review_count,
            business.image_url,
            business.address,
            business.city,
            business.state_code,
            business.postal_code,
            business.country_code,
            business.latitude,
            business.longitude,
            business.categories,
        ],
    )?;

    let id = conn.query_row(
        "SELECT id FROM businesses WHERE url = ?1",
        params![business.url],
        |row| row.get(0),
    )?;
    Ok(id)
}

pub fn get_business(conn: &Connection, id: i64) -> anyhow::Result<Option<Business>> {
    let sql = format!("SELECT {BUSINESS_COLUMNS} FROM businesses WHERE id = ?1");
    let business = conn.query_row(&sql, params![id], parse_business_row).optional()?;
    Ok(business)
}

pub fn get_business_by_url(conn: &Connection, url: &str) -> anyhow::Result<Option<Business>> {
    let sql = format!("SELECT {BUSINESS_COLUMNS} FROM businesses WHERE url = ?1");
    let business = conn.query_row(&sql, params![url], parse_business_row).optional()?;
    Ok(business)
}

pub fn list_cities(conn: &Connection) -> anyhow::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT city FROM businesses WHERE city != '' ORDER BY city ASC",
    )?;
    let rows = stmt.query_map([], |row| row.get(0))?;

    let mut cities = vec![];
    for row in rows {
        cities.push(row?);
    }
    Ok(cities)
}

fn parse_business_row(row: &rusqlite::Row) -> rusqlite::Result<Business> {
    Ok(Business {
        id: row.get(0)?,
        external_id: row.get(1)?,
        url: row.get(2)?,
        name: row.get(3)?,
        phone: row.get(4)?,
        display_phone: row.get(5)?,
        rating: row.get(6)?,
        review_count: row.get(7)?,
        image_url: row.get(8)?,
        address: row.get(9)?,
        city: row.get(10)?,
        state_code: row.get(11)?,
        postal_code: row.get(12)?,
        country_code: row.get(13)?,
        latitude: row.get(14)?,
        longitude: row.get(15)?,
        categories: row.get(16)?,
    })
}

// ── Events ──

const EVENT_COLUMNS: &str =
    "id, creator_id, partner_id, business_id, category_id, date, start_time, end_time, status, created_at";

const LISTING_SELECT: &str = "SELECT e.id, e.creator_id, e.partner_id, e.business_id, e.category_id, e.date,
            e.start_time, e.end_time, e.status, e.created_at,
            b.name, b.url, b.address, c.title,
            cu.first_name, cu.last_name, pu.first_name, pu.last_name
     FROM events e
     JOIN businesses b ON b.id = e.business_id
     JOIN users cu ON cu.id = e.creator_id
     LEFT JOIN users pu ON pu.id = e.partner_id
     LEFT JOIN categories c ON c.id = e.category_id";

pub fn create_event(conn: &Connection, event: &NewEvent) -> anyhow::Result<i64> {
    let now = Utc::now().naive_utc().format(DATETIME_FMT).to_string();

    conn.execute(
        "INSERT INTO events (creator_id, business_id, category_id, date, start_time, end_time, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            event.creator_id,
            event.business_id,
            event.category_id,
            event.date.format(DATE_FMT).to_string(),
            event.start_time.format(TIME_FMT).to_string(),
            event.end_time.format(TIME_FMT).to_string(),
            EventStatus::Unmatched.as_str(),
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_event(conn: &Connection, id: i64) -> anyhow::Result<Option<Event>> {
    let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1");
    conn.query_row(&sql, params![id], |row| Ok(parse_event_row(row)))
        .optional()?
        .transpose()
}

pub fn get_events_for_business(conn: &Connection, business_id: i64) -> anyhow::Result<Vec<Event>> {
    let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE business_id = ?1 ORDER BY id ASC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![business_id], |row| Ok(parse_event_row(row)))?;

    let mut events = vec![];
    for row in rows {
        events.push(row??);
    }
    Ok(events)
}

/// Sets `partner_id` and flips the event to matched, but only while it is
/// still unmatched and the joiner is not its creator. Returns whether this
/// call made the match.
pub fn match_event(conn: &Connection, event_id: i64, partner_id: i64) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE events SET status = ?1, partner_id = ?2
         WHERE id = ?3 AND status = ?4 AND creator_id != ?2",
        params![
            EventStatus::Matched.as_str(),
            partner_id,
            event_id,
            EventStatus::Unmatched.as_str(),
        ],
    )?;
    Ok(count > 0)
}

/// Unmatched events on or after `today` that `viewer_id` did not create.
pub fn get_available_events(
    conn: &Connection,
    viewer_id: i64,
    today: &NaiveDate,
) -> anyhow::Result<Vec<EventListing>> {
    let sql = format!(
        "{LISTING_SELECT}
         WHERE e.status = ?1 AND e.date >= ?2 AND e.creator_id != ?3
         ORDER BY e.date ASC, e.start_time ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params![
            EventStatus::Unmatched.as_str(),
            today.format(DATE_FMT).to_string(),
            viewer_id,
        ],
        |row| Ok(parse_listing_row(row)),
    )?;

    let mut listings = vec![];
    for row in rows {
        listings.push(row??);
    }
    Ok(listings)
}

/// Events on or after `today` that `user_id` created or joined.
pub fn get_upcoming_events_for_user(
    conn: &Connection,
    user_id: i64,
    today: &NaiveDate,
) -> anyhow::Result<Vec<EventListing>> {
    let sql = format!(
        "{LISTING_SELECT}
         WHERE (e.creator_id = ?1 OR e.partner_id = ?1) AND e.date >= ?2
         ORDER BY e.date ASC, e.start_time ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params![user_id, today.format(DATE_FMT).to_string()],
        |row| Ok(parse_listing_row(row)),
    )?;

    let mut listings = vec![];
    for row in rows {
        listings.push(row??);
    }
    Ok(listings)
}

fn parse_event_row(row: &rusqlite::Row) -> anyhow::Result<Event> {
    let date_str: String = row.get(5)?;
    let start_str: String = row.get(6)?;
    let end_str: String = row.get(7)?;
    let status_str: String = row.get(8)?;
    let created_at_str: String = row.get(9)?;

    Ok(Event {
        id: row.get(0)?,
        creator_id: row.get(1)?,
        partner_id: row.get(2)?,
        business_id: row.get(3)?,
        category_id: row.get(4)?,
        date: NaiveDate::parse_from_str(&date_str, DATE_FMT)
            .with_context(|| format!("bad event date: {date_str}"))?,
        start_time: NaiveTime::parse_from_str(&start_str, TIME_FMT)
            .with_context(|| format!("bad event start time: {start_str}"))?,
        end_time: NaiveTime::parse_from_str(&end_str, TIME_FMT)
            .with_context(|| format!("bad event end time: {end_str}"))?,
        status: EventStatus::parse(&status_str),
        created_at: parse_datetime(&created_at_str)?,
    })
}

fn parse_listing_row(row: &rusqlite::Row) -> anyhow::Result<EventListing> {
    let event = parse_event_row(row)?;
    let creator_first: String = row.get(14)?;
    let creator_last: String = row.get(15)?;
    let partner_first: Option<String> = row.get(16)?;
    let partner_last: Option<String> = row.get(17)?;

    Ok(EventListing {
        event,
        business_name: row.get(10)?,
        business_url: row.get(11)?,
        business_address: row.get(12)?,
        category: row.get(13)?,
        creator_name: public_name(&creator_first, &creator_last),
        partner_name: partner_first
            .map(|first| public_name(&first, partner_last.as_deref().unwrap_or(""))),
    })
}

// ── Verification Codes ──

pub fn save_verification_code(conn: &Connection, code: &VerificationCode) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO verification_codes (phone_number, code, verified, created_at, expires_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(phone_number) DO UPDATE SET
           code = excluded.code,
           verified = excluded.verified,
           attempts = 0,
           created_at = excluded.created_at,
           expires_at = excluded.expires_at",
        params![
            code.phone_number,
            code.code,
            code.verified as i32,
            code.created_at.format(DATETIME_FMT).to_string(),
            code.expires_at.format(DATETIME_FMT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_verification_code(
    conn: &Connection,
    phone: &str,
) -> anyhow::Result<Option<VerificationCode>> {
    conn.query_row(
        "SELECT phone_number, code, verified, created_at, expires_at
         FROM verification_codes WHERE phone_number = ?1",
        params![phone],
        |row| {
            let created_at_str: String = row.get(3)?;
            let expires_at_str: String = row.get(4)?;
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i32>(2)? != 0,
                created_at_str,
                expires_at_str,
            ))
        },
    )
    .optional()?
    .map(|(phone_number, code, verified, created_at, expires_at)| {
        Ok(VerificationCode {
            phone_number,
            code,
            verified,
            created_at: parse_datetime(&created_at)?,
            expires_at: parse_datetime(&expires_at)?,
        })
    })
    .transpose()
}

/// Marks the code verified and moves its expiry to `expires_at`, the end of
/// the window in which the number can be claimed at signup.
pub fn mark_phone_verified(
    conn: &Connection,
    phone: &str,
    expires_at: &NaiveDateTime,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE verification_codes SET verified = 1, expires_at = ?2 WHERE phone_number = ?1",
        params![phone, expires_at.format(DATETIME_FMT).to_string()],
    )?;
    Ok(count > 0)
}

/// Counts a wrong submission against the phone's code and returns the new
/// total. Returns 0 when there is no code.
pub fn record_failed_attempt(conn: &Connection, phone: &str) -> anyhow::Result<i64> {
    conn.execute(
        "UPDATE verification_codes SET attempts = attempts + 1 WHERE phone_number = ?1",
        params![phone],
    )?;
    let attempts = conn
        .query_row(
            "SELECT attempts FROM verification_codes WHERE phone_number = ?1",
            params![phone],
            |row| row.get(0),
        )
        .optional()?
        .unwrap_or(0);
    Ok(attempts)
}

pub fn delete_verification_code(conn: &Connection, phone: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "DELETE FROM verification_codes WHERE phone_number = ?1",
        params![phone],
    )?;
    Ok(count > 0)
}

/// Drops every code, verified or not, that expired before `now`.
pub fn cleanup_expired_codes(conn: &Connection, now: &NaiveDateTime) -> anyhow::Result<usize> {
    let count = conn.execute(
        "DELETE FROM verification_codes WHERE expires_at <= ?1",
        params![now.format(DATETIME_FMT).to_string()],
    )?;
    Ok(count)
}

// ── Rate Limits ──

fn hour_window(now: &NaiveDateTime) -> String {
    now.format("%Y-%m-%d %H:00:00").to_string()
}

/// Records one code sent to `phone` in the current hour and returns the
/// hour's total.
pub fn increment_code_sends(
    conn: &Connection,
    phone: &str,
    now: &NaiveDateTime,
) -> anyhow::Result<i64> {
    let window = hour_window(now);

    conn.execute(
        "INSERT INTO rate_limits (phone_number, message_count, window_start)
         VALUES (?1, 1, ?2)
         ON CONFLICT(phone_number, window_start) DO UPDATE SET message_count = message_count + 1",
        params![phone, window],
    )?;

    let count: i64 = conn.query_row(
        "SELECT message_count FROM rate_limits WHERE phone_number = ?1 AND window_start = ?2",
        params![phone, window],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn code_sends_this_hour(
    conn: &Connection,
    phone: &str,
    now: &NaiveDateTime,
) -> anyhow::Result<i64> {
    let count = conn
        .query_row(
            "SELECT message_count FROM rate_limits WHERE phone_number = ?1 AND window_start = ?2",
            params![phone, hour_window(now)],
            |row| row.get(0),
        )
        .optional()?
        .unwrap_or(0);
    Ok(count)
}

pub fn cleanup_old_windows(conn: &Connection, now: &NaiveDateTime) -> anyhow::Result<usize> {
    let cutoff = hour_window(&(*now - chrono::Duration::hours(2)));
    let count = conn.execute(
        "DELETE FROM rate_limits WHERE window_start < ?1",
        params![cutoff],
    )?;
    Ok(count)
}

fn parse_datetime(s: &str) -> anyhow::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, DATETIME_FMT).with_context(|| format!("bad timestamp: {s}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::db::seed;
    use chrono::Duration;

    fn setup_db() -> Connection {
        let conn = db::init_db(":memory:").unwrap();
        seed::example_data(&conn, 4).unwrap();
        conn
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    fn new_event(creator_id: i64, days_ahead: i64) -> NewEvent {
        NewEvent {
            creator_id,
            business_id: 1,
            category_id: Some(1),
            date: today() + Duration::days(days_ahead),
            start_time: NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(21, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_get_user_by_email() {
        let conn = setup_db();
        let user = get_user_by_email(&conn, "gramsay@gmail.com").unwrap().unwrap();
        assert_eq!(user.first_name, "Gordon");
        assert_eq!(user.id, 1234);

        let upper = get_user_by_email(&conn, "GRamsay@Gmail.com").unwrap();
        assert!(upper.is_some());

        assert!(get_user_by_email(&conn, "nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_rejected_by_schema() {
        let conn = setup_db();
        let dup = NewUser {
            first_name: "Other".to_string(),
            last_name: "Person".to_string(),
            email: "gramsay@gmail.com".to_string(),
            password_hash: "x".to_string(),
            phone_number: "5550001111".to_string(),
            phone_verified: true,
        };
        assert!(create_user(&conn, &dup).is_err());
    }

    #[test]
    fn test_get_event_by_business() {
        let conn = setup_db();
        let events = get_events_for_business(&conn, 1).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, 1);
        assert!(events[0].is_matched());
    }

    #[test]
    fn test_get_business_by_url() {
        let conn = setup_db();
        let business = get_business_by_url(&conn, "http://www.afakeurllink.com")
            .unwrap()
            .unwrap();
        assert_eq!(business.url, "http://www.afakeurllink.com");
        assert_eq!(business.name, "Good Eats");
    }

    #[test]
    fn test_upsert_business_keeps_one_row_per_url() {
        let conn = setup_db();
        let mut business = get_business_by_url(&conn, "http://www.afakeurllink.com")
            .unwrap()
            .unwrap();
        business.name = "Better Eats".to_string();

        let id = upsert_business(&conn, &business).unwrap();
        assert_eq!(id, business.id);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM businesses", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(get_business(&conn, id).unwrap().unwrap().name, "Better Eats");
    }

    #[test]
    fn test_upsert_category_is_keyed_by_alias() {
        let conn = setup_db();
        let first = upsert_category(&conn, "Burgers", "burgers").unwrap();
        let second = upsert_category(&conn, "Burgers", "burgers").unwrap();
        assert_eq!(first, second);
        assert_eq!(get_category(&conn, first).unwrap().unwrap().alias, "burgers");
    }

    #[test]
    fn test_available_events_exclude_matched_and_own() {
        let conn = setup_db();
        assert!(get_available_events(&conn, 1234, &today()).unwrap().is_empty());

        let id = create_event(&conn, &new_event(4321, 3)).unwrap();
        let for_gordon = get_available_events(&conn, 1234, &today()).unwrap();
        assert_eq!(for_gordon.len(), 1);
        assert_eq!(for_gordon[0].event.id, id);
        assert_eq!(for_gordon[0].creator_name, "Joe B");
        assert_eq!(for_gordon[0].business_name, "Good Eats");

        assert!(get_available_events(&conn, 4321, &today()).unwrap().is_empty());
    }

    #[test]
    fn test_available_events_exclude_past() {
        let conn = setup_db();
        create_event(&conn, &new_event(4321, -2)).unwrap();
        assert!(get_available_events(&conn, 1234, &today()).unwrap().is_empty());
    }

    #[test]
    fn test_match_event_only_once() {
        let conn = setup_db();
        let id = create_event(&conn, &new_event(4321, 3)).unwrap();

        assert!(!match_event(&conn, id, 4321).unwrap());
        assert!(match_event(&conn, id, 1234).unwrap());
        assert!(!match_event(&conn, id, 5678).unwrap());

        let event = get_event(&conn, id).unwrap().unwrap();
        assert_eq!(event.status, EventStatus::Matched);
        assert_eq!(event.partner_id, Some(1234));
    }

    #[test]
    fn test_upcoming_events_for_user() {
        let conn = setup_db();
        let upcoming = get_upcoming_events_for_user(&conn, 1234, &today()).unwrap();
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].partner_name.as_deref(), Some("Gordon R"));

        assert!(get_upcoming_events_for_user(&conn, 5678, &today())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_list_cities_and_categories() {
        let conn = setup_db();
        assert_eq!(list_cities(&conn).unwrap(), vec!["Paris".to_string()]);
        let titles: Vec<String> = list_categories(&conn)
            .unwrap()
            .into_iter()
            .map(|c| c.title)
            .collect();
        assert!(titles.contains(&"American".to_string()));
    }

    #[test]
    fn test_verification_code_lifecycle() {
        let conn = setup_db();
        let now = Utc::now().naive_utc();
        let code = VerificationCode {
            phone_number: "5551234567".to_string(),
            code: "4321".to_string(),
            verified: false,
            created_at: now,
            expires_at: now + Duration::minutes(10),
        };
        save_verification_code(&conn, &code).unwrap();

        let stored = get_verification_code(&conn, "5551234567").unwrap().unwrap();
        assert_eq!(stored.code, "4321");
        assert!(!stored.verified);

        let window_end = now + Duration::minutes(30);
        assert!(mark_phone_verified(&conn, "5551234567", &window_end).unwrap());
        let stored = get_verification_code(&conn, "5551234567").unwrap().unwrap();
        assert!(stored.verified);
        assert_eq!(
            stored.expires_at.format(DATETIME_FMT).to_string(),
            window_end.format(DATETIME_FMT).to_string()
        );

        assert!(delete_verification_code(&conn, "5551234567").unwrap());
        assert!(get_verification_code(&conn, "5551234567").unwrap().is_none());
    }

    #[test]
    fn test_cleanup_expired_codes_removes_verified_too() {
        let conn = setup_db();
        let past = Utc::now().naive_utc() - Duration::hours(1);
        for (phone, verified) in [("5550000001", false), ("5550000002", true)] {
            save_verification_code(
                &conn,
                &VerificationCode {
                    phone_number: phone.to_string(),
                    code: "0000".to_string(),
                    verified,
                    created_at: past,
                    expires_at: past,
                },
            )
            .unwrap();
        }

        let removed = cleanup_expired_codes(&conn, &Utc::now().naive_utc()).unwrap();
        assert_eq!(removed, 2);
        assert!(get_verification_code(&conn, "5550000002").unwrap().is_none());
        // the seeded pending code has a year left
        assert!(get_verification_code(&conn, seed::PENDING_PHONE)
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_failed_attempts_reset_on_new_code() {
        let conn = setup_db();
        assert_eq!(record_failed_attempt(&conn, seed::PENDING_PHONE).unwrap(), 1);
        assert_eq!(record_failed_attempt(&conn, seed::PENDING_PHONE).unwrap(), 2);
        assert_eq!(record_failed_attempt(&conn, "5559999999").unwrap(), 0);

        let now = Utc::now().naive_utc();
        save_verification_code(
            &conn,
            &VerificationCode {
                phone_number: seed::PENDING_PHONE.to_string(),
                code: "9876".to_string(),
                verified: false,
                created_at: now,
                expires_at: now + Duration::minutes(10),
            },
        )
        .unwrap();
        assert_eq!(record_failed_attempt(&conn, seed::PENDING_PHONE).unwrap(), 1);
    }

    #[test]
    fn test_code_sends_are_counted_per_hour() {
        let conn = setup_db();
        let now = Utc::now().naive_utc();
        assert_eq!(code_sends_this_hour(&conn, "5551234567", &now).unwrap(), 0);
        assert_eq!(increment_code_sends(&conn, "5551234567", &now).unwrap(), 1);
        assert_eq!(increment_code_sends(&conn, "5551234567", &now).unwrap(), 2);
        assert_eq!(code_sends_this_hour(&conn, "5551234567", &now).unwrap(), 2);
        assert_eq!(code_sends_this_hour(&conn, "5550000000", &now).unwrap(), 0);

        let later = now + Duration::hours(3);
        assert_eq!(code_sends_this_hour(&conn, "5551234567", &later).unwrap(), 0);
        assert_eq!(cleanup_old_windows(&conn, &later).unwrap(), 1);
    }
}
