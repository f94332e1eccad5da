use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub creator_id: i64,
    pub partner_id: Option<i64>,
    pub business_id: i64,
    pub category_id: Option<i64>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: EventStatus,
    pub created_at: NaiveDateTime,
}

impl Event {
    pub fn is_matched(&self) -> bool {
        self.status == EventStatus::Matched
    }

    /// The other participant from `user_id`'s point of view.
    pub fn other_participant(&self, user_id: i64) -> Option<i64> {
        if self.creator_id == user_id {
            self.partner_id
        } else {
            Some(self.creator_id)
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Unmatched,
    Matched,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Unmatched => "unmatched",
            EventStatus::Matched => "matched",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "matched" => EventStatus::Matched,
            _ => EventStatus::Unmatched,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub creator_id: i64,
    pub business_id: i64,
    pub category_id: Option<i64>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// An event joined with what the listing pages show next to it.
#[derive(Debug, Clone)]
pub struct EventListing {
    pub event: Event,
    pub business_name: String,
    pub business_url: String,
    pub business_address: String,
    pub category: Option<String>,
    pub creator_name: String,
    pub partner_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_text() {
        assert_eq!(EventStatus::parse(EventStatus::Matched.as_str()), EventStatus::Matched);
        assert_eq!(EventStatus::parse("anything else"), EventStatus::Unmatched);
    }

    #[test]
    fn test_other_participant() {
        let event = Event {
            id: 1,
            creator_id: 10,
            partner_id: Some(20),
            business_id: 1,
            category_id: None,
            date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            start_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
            status: EventStatus::Matched,
            created_at: chrono::Utc::now().naive_utc(),
        };
        assert_eq!(event.other_participant(10), Some(20));
        assert_eq!(event.other_participant(20), Some(10));
    }
}
