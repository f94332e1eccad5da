use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;

use forkspoon::config::AppConfig;
use forkspoon::db;
use forkspoon::handlers;
use forkspoon::services::messaging::twilio::TwilioSmsProvider;
use forkspoon::services::messaging::{LogOnlyProvider, MessagingProvider};
use forkspoon::services::search::yelp::YelpSearch;
use forkspoon::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    // `forkspoon seed` loads the example fixtures and exits.
    if std::env::args().nth(1).as_deref() == Some("seed") {
        db::seed::example_data(&conn, config.bcrypt_cost)?;
        return Ok(());
    }

    if config.secret_key == "changeme" {
        tracing::warn!("SECRET_KEY is not set, sessions are signed with the default key");
    }
    if config.yelp_api_key.is_empty() {
        tracing::warn!("YELP_API_KEY is not set, restaurant search will fail");
    }

    let messaging: Box<dyn MessagingProvider> = if config.twilio_configured() {
        tracing::info!("using Twilio SMS provider");
        Box::new(TwilioSmsProvider::new(
            config.twilio_account_sid.clone(),
            config.twilio_auth_token.clone(),
            config.twilio_phone_number.clone(),
        ))
    } else {
        tracing::info!("Twilio not configured, verification codes will only be logged");
        Box::new(LogOnlyProvider)
    };
    let search = YelpSearch::new(config.yelp_api_key.clone(), config.yelp_api_url.clone());

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        search: Box::new(search),
        messaging,
    });

    let app = handlers::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
