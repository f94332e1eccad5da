use serde::{Deserialize, Serialize};

/// Snapshot of a restaurant as returned by the search API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Business {
    pub id: i64,
    pub external_id: String,
    pub url: String,
    pub name: String,
    pub phone: Option<String>,
    pub display_phone: Option<String>,
    pub rating: Option<f64>,
    pub review_count: i64,
    pub image_url: Option<String>,
    pub address: String,
    pub city: String,
    pub state_code: Option<String>,
    pub postal_code: Option<String>,
    pub country_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub categories: String,
}
