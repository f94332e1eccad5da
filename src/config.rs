use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub secret_key: String,
    pub yelp_api_key: String,
    pub yelp_api_url: String,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_phone_number: String,
    pub verification_ttl_minutes: i64,
    pub verification_sends_per_hour: i64,
    pub bcrypt_cost: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "forkspoon.db".to_string()),
            secret_key: env::var("SECRET_KEY").unwrap_or_else(|_| "changeme".to_string()),
            yelp_api_key: env::var("YELP_API_KEY").unwrap_or_default(),
            yelp_api_url: env::var("YELP_API_URL")
                .unwrap_or_else(|_| "https://api.yelp.com/v2/search".to_string()),
            twilio_account_sid: env::var("TWILIO_ACCOUNT_SID").unwrap_or_default(),
            twilio_auth_token: env::var("TWILIO_AUTH_TOKEN").unwrap_or_default(),
            twilio_phone_number: env::var("TWILIO_PHONE_NUMBER").unwrap_or_default(),
            verification_ttl_minutes: env::var("VERIFICATION_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            verification_sends_per_hour: env::var("VERIFICATION_SENDS_PER_HOUR")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
            bcrypt_cost: env::var("BCRYPT_COST")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(bcrypt::DEFAULT_COST),
        }
    }

    pub fn twilio_configured(&self) -> bool {
        !self.twilio_account_sid.is_empty() && !self.twilio_auth_token.is_empty()
    }
}
