use chrono::{NaiveDate, NaiveTime};
use rusqlite::Connection;

use crate::db::queries;
use crate::models::event::NewEvent;
use crate::models::{Business, Event};

const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%Y-%m-%d"];
const TIME_FORMATS: &[&str] = &["%H:%M", "%H:%M:%S", "%I:%M %p"];

/// What the confirmation form submits.
#[derive(Debug, Clone)]
pub struct EventRequest {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub business_url: String,
    pub category_id: Option<i64>,
}

#[derive(Debug, thiserror::Error)]
pub enum CreateEventError {
    #[error("Please enter a valid date.")]
    InvalidDate,

    #[error("Please enter valid start and end times.")]
    InvalidTime,

    #[error("The end time must be after the start time.")]
    EndBeforeStart,

    #[error("That restaurant is no longer available.")]
    UnknownBusiness,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum JoinError {
    #[error("That event doesn't exist.")]
    NotFound,

    #[error("You can't join your own event.")]
    OwnEvent,

    #[error("Sorry, that event has already been matched.")]
    AlreadyMatched,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

pub fn parse_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
}

/// Creates an unmatched event at the business the form refers to.
pub fn create_event(
    conn: &Connection,
    creator_id: i64,
    request: &EventRequest,
) -> Result<(i64, Business), CreateEventError> {
    let date = parse_date(&request.date).ok_or(CreateEventError::InvalidDate)?;
    let start_time = parse_time(&request.start_time).ok_or(CreateEventError::InvalidTime)?;
    let end_time = parse_time(&request.end_time).ok_or(CreateEventError::InvalidTime)?;
    if end_time <= start_time {
        return Err(CreateEventError::EndBeforeStart);
    }

    let business = queries::get_business_by_url(conn, &request.business_url)?
        .ok_or(CreateEventError::UnknownBusiness)?;

    let category_id = match request.category_id {
        Some(id) => queries::get_category(conn, id)?.map(|c| c.id),
        None => None,
    };

    let id = queries::create_event(
        conn,
        &NewEvent {
            creator_id,
            business_id: business.id,
            category_id,
            date,
            start_time,
            end_time,
        },
    )?;

    tracing::info!(event_id = id, creator_id, business = %business.name, "event created");
    Ok((id, business))
}

/// Joins `user_id` to an open event, closing it. Only the first joiner wins.
pub fn join_event(conn: &Connection, event_id: i64, user_id: i64) -> Result<Event, JoinError> {
    if !queries::match_event(conn, event_id, user_id)? {
        let event = queries::get_event(conn, event_id)?.ok_or(JoinError::NotFound)?;
        return Err(if event.creator_id == user_id {
            JoinError::OwnEvent
        } else {
            JoinError::AlreadyMatched
        });
    }

    let event = queries::get_event(conn, event_id)?.ok_or(JoinError::NotFound)?;
    tracing::info!(event_id, partner_id = user_id, creator_id = event.creator_id, "event matched");
    Ok(event)
}

pub fn match_notification(partner_name: &str, business_name: &str, event: &Event) -> String {
    format!(
        "You have a new meal plan! {partner_name} is joining you at {business_name} on {} at {}.",
        event.date.format("%m/%d/%Y"),
        event.start_time.format("%H:%M"),
    )
}
