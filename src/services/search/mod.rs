pub mod yelp;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::Business;

const METERS_PER_MILE: f64 = 1609.344;

/// Largest radius the directory API accepts.
pub const MAX_RADIUS_METERS: u32 = 40_000;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub term: String,
    pub location: String,
    pub radius_meters: Option<u32>,
    pub limit: u32,
}

#[async_trait]
pub trait BusinessSearch: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> anyhow::Result<SearchResponse>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub businesses: Vec<SearchBusiness>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchBusiness {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub review_count: Option<i64>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub display_phone: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    /// `[title, alias]` pairs, e.g. `["Fast Food", "hotdogs"]`.
    #[serde(default)]
    pub categories: Vec<(String, String)>,
    #[serde(default)]
    pub location: SearchLocation,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchLocation {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub display_address: Vec<String>,
    #[serde(default)]
    pub address: Vec<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub state_code: Option<String>,
    #[serde(default)]
    pub coordinate: Option<Coordinate>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl SearchBusiness {
    /// Snapshot for storage; the row id is assigned on insert.
    pub fn to_business(&self) -> Business {
        let address = if self.location.display_address.is_empty() {
            self.location.address.join(", ")
        } else {
            self.location.display_address.join(", ")
        };

        Business {
            id: 0,
            external_id: self.id.clone(),
            url: self.url.clone(),
            name: self.name.clone(),
            phone: self.phone.clone(),
            display_phone: self.display_phone.clone(),
            rating: self.rating,
            review_count: self.review_count.unwrap_or(0),
            image_url: self.image_url.clone(),
            address,
            city: self.location.city.clone().unwrap_or_default(),
            state_code: self.location.state_code.clone(),
            postal_code: self.location.postal_code.clone(),
            country_code: self.location.country_code.clone(),
            latitude: self.location.coordinate.map(|c| c.latitude),
            longitude: self.location.coordinate.map(|c| c.longitude),
            categories: self
                .categories
                .iter()
                .map(|(title, _)| title.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// Converts the form's distance in miles to an API radius. Non-positive or
/// unparseable distances mean "no radius filter".
pub fn miles_to_radius(miles: f64) -> Option<u32> {
    if !miles.is_finite() || miles <= 0.0 {
        return None;
    }
    let meters = (miles * METERS_PER_MILE).round().max(1.0);
    Some((meters as u32).min(MAX_RADIUS_METERS))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "total": 2,
        "businesses": [
            {
                "id": "quick-paris-20",
                "name": "Quick",
                "url": "http://www.yelp.com/biz/quick-paris-20",
                "rating": 2.5,
                "review_count": 6,
                "phone": "+33147737654",
                "display_phone": "+33 1 47 73 76 54",
                "is_claimed": false,
                "categories": [["Fast Food", "hotdogs"], ["American (Traditional)", "tradamerican"]],
                "location": {
                    "city": "Paris",
                    "display_address": ["2 Le Parvis de la Défense", "92800 Paris", "France"],
                    "address": ["2 Le Parvis de la Défense"],
                    "postal_code": "92800",
                    "country_code": "FR",
                    "state_code": "75",
                    "coordinate": {"latitude": 48.856614, "longitude": 2.3522219}
                }
            },
            {
                "id": "le-camion-qui-fume-paris",
                "name": "Le Camion Qui Fume",
                "url": "http://www.yelp.com/biz/le-camion-qui-fume-paris"
            }
        ]
    }"#;

    #[test]
    fn test_parse_search_response() {
        let response: SearchResponse = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(response.total, Some(2));
        assert_eq!(response.businesses.len(), 2);

        let quick = response.businesses[0].to_business();
        assert_eq!(quick.name, "Quick");
        assert_eq!(quick.city, "Paris");
        assert_eq!(quick.categories, "Fast Food, American (Traditional)");
        assert_eq!(quick.address, "2 Le Parvis de la Défense, 92800 Paris, France");
        assert_eq!(quick.latitude, Some(48.856614));
    }

    #[test]
    fn test_sparse_business_uses_defaults() {
        let response: SearchResponse = serde_json::from_str(SAMPLE).unwrap();
        let camion = response.businesses[1].to_business();
        assert_eq!(camion.review_count, 0);
        assert_eq!(camion.city, "");
        assert_eq!(camion.categories, "");
        assert!(camion.latitude.is_none());
    }

    #[test]
    fn test_miles_to_radius() {
        assert_eq!(miles_to_radius(0.000621371), Some(1));
        assert_eq!(miles_to_radius(1.0), Some(1609));
        assert_eq!(miles_to_radius(100.0), Some(MAX_RADIUS_METERS));
        assert_eq!(miles_to_radius(0.0), None);
        assert_eq!(miles_to_radius(f64::NAN), None);
    }
}
