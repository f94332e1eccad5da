use anyhow::Context;
use async_trait::async_trait;

use super::{BusinessSearch, SearchQuery, SearchResponse};

pub struct YelpSearch {
    api_key: String,
    api_url: String,
    client: reqwest::Client,
}

impl YelpSearch {
    pub fn new(api_key: String, api_url: String) -> Self {
        Self {
            api_key,
            api_url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl BusinessSearch for YelpSearch {
    async fn search(&self, query: &SearchQuery) -> anyhow::Result<SearchResponse> {
        let mut params = vec![
            ("term", query.term.clone()),
            ("location", query.location.clone()),
            ("limit", query.limit.to_string()),
        ];
        if let Some(radius) = query.radius_meters {
            params.push(("radius_filter", radius.to_string()));
        }

        let resp = self
            .client
            .get(&self.api_url)
            .bearer_auth(&self.api_key)
            .query(&params)
            .send()
            .await
            .context("failed to call Yelp API")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Yelp API error ({}): {}", status, body);
        }

        let data: SearchResponse = resp
            .json()
            .await
            .context("failed to parse Yelp response")?;

        tracing::debug!(
            term = %query.term,
            location = %query.location,
            results = data.businesses.len(),
            "Yelp search completed"
        );
        Ok(data)
    }
}
