pub mod auth;
pub mod events;
pub mod health;
pub mod home;
pub mod profile;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(home::index))
        .route("/health", get(health::health))
        .route("/logout", get(home::logout))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/signup", get(auth::signup_page).post(auth::signup))
        .route("/submit_phone", post(auth::submit_phone))
        .route(
            "/submit_confirmation_code",
            post(auth::submit_confirmation_code),
        )
        .route("/create_event", get(events::create_event))
        .route("/restaurant_query", post(events::restaurant_query))
        .route("/confirmation", post(events::confirmation))
        .route("/find_events", get(events::find_events))
        .route("/matched", post(events::matched))
        .route("/upcoming_events", get(events::upcoming_events))
        .route("/profile/:id", get(profile::profile))
        .route("/other_profile/:id", get(profile::other_profile))
        .route("/profile-edit", post(profile::profile_edit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
