use std::sync::Arc;

use axum::extract::State;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use axum_extra::extract::CookieJar;
use chrono::Utc;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::services::events::{self, CreateEventError, EventRequest, JoinError};
use crate::services::search::{self, SearchQuery};
use crate::session::{self, CurrentUser};
use crate::state::AppState;
use crate::views;

const SEARCH_LIMIT: u32 = 20;

// GET /create_event
pub async fn create_event(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Html<String>, AppError> {
    let (categories, cities) = {
        let db = state.conn()?;
        (queries::list_categories(&db)?, queries::list_cities(&db)?)
    };

    Ok(Html(views::create_event_page(user_id, &categories, &cities)))
}

// POST /restaurant_query
#[derive(Deserialize)]
pub struct RestaurantQueryForm {
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub zipcode: String,
    #[serde(default)]
    pub term: String,
    #[serde(default)]
    pub distance: String,
}

pub async fn restaurant_query(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Form(form): Form<RestaurantQueryForm>,
) -> Result<Html<String>, AppError> {
    let location = match (form.zipcode.trim(), form.city.trim()) {
        (zip, _) if !zip.is_empty() => zip.to_string(),
        (_, city) if !city.is_empty() => city.to_string(),
        _ => {
            return Ok(Html(views::event_form_error(
                user_id,
                "Please enter a city or a zipcode.",
            )))
        }
    };

    let query = SearchQuery {
        term: form.term.trim().to_string(),
        location,
        radius_meters: form
            .distance
            .trim()
            .parse()
            .ok()
            .and_then(search::miles_to_radius),
        limit: SEARCH_LIMIT,
    };

    let response = state.search.search(&query).await.map_err(|e| {
        tracing::warn!(error = %e, location = %query.location, "restaurant search failed");
        AppError::Search(e.to_string())
    })?;

    let (businesses, categories) = {
        let db = state.conn()?;
        let mut businesses = Vec::with_capacity(response.businesses.len());
        for found in &response.businesses {
            for (title, alias) in &found.categories {
                queries::upsert_category(&db, title, alias)?;
            }
            let mut business = found.to_business();
            business.id = queries::upsert_business(&db, &business)?;
            businesses.push(business);
        }
        (businesses, queries::list_categories(&db)?)
    };

    tracing::info!(
        user_id,
        term = %query.term,
        location = %query.location,
        results = businesses.len(),
        "restaurant query"
    );

    Ok(Html(views::search_results(
        user_id,
        &businesses,
        &categories,
        &query.term,
        &query.location,
    )))
}

// POST /confirmation
#[derive(Deserialize)]
pub struct ConfirmationForm {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
    pub business_url: String,
    pub category_id: Option<String>,
}

pub async fn confirmation(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Form(form): Form<ConfirmationForm>,
) -> Result<Html<String>, AppError> {
    let request = EventRequest {
        date: form.date,
        start_time: form.start_time,
        end_time: form.end_time,
        business_url: form.business_url,
        category_id: form
            .category_id
            .as_deref()
            .and_then(|s| s.trim().parse().ok()),
    };

    let created = {
        let db = state.conn()?;
        events::create_event(&db, user_id, &request)
    };

    match created {
        Ok((_, business)) => Ok(Html(views::confirmation_page(
            user_id,
            &business,
            &request.date,
            &request.start_time,
            &request.end_time,
        ))),
        Err(CreateEventError::UnknownBusiness) => Err(AppError::NotFound("Restaurant".to_string())),
        Err(CreateEventError::Internal(e)) => Err(e.into()),
        Err(e) => Ok(Html(views::event_form_error(user_id, &e.to_string()))),
    }
}

// GET /find_events
pub async fn find_events(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Html<String>, AppError> {
    let today = Utc::now().date_naive();
    let listings = {
        let db = state.conn()?;
        queries::get_available_events(&db, user_id, &today)?
    };

    Ok(Html(views::find_events_page(user_id, &listings, None)))
}

// POST /matched
#[derive(Deserialize)]
pub struct MatchForm {
    pub event_id: String,
}

pub async fn matched(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    jar: CookieJar,
    Form(form): Form<MatchForm>,
) -> Result<Response, AppError> {
    let today = Utc::now().date_naive();

    let outcome = {
        let db = state.conn()?;
        let joined = match form.event_id.trim().parse::<i64>() {
            Ok(event_id) => events::join_event(&db, event_id, user_id),
            Err(_) => Err(JoinError::NotFound),
        };

        match joined {
            Ok(event) => {
                let creator = queries::get_user(&db, event.creator_id)?;
                let partner = queries::get_user(&db, user_id)?;
                let business = queries::get_business(&db, event.business_id)?;
                Ok((event, creator, partner, business))
            }
            Err(JoinError::Internal(e)) => return Err(e.into()),
            Err(e) => {
                let listings = queries::get_available_events(&db, user_id, &today)?;
                Err(views::find_events_page(user_id, &listings, Some(&e.to_string())))
            }
        }
    };

    let (event, creator, partner, business) = match outcome {
        Ok(matched) => matched,
        Err(page) => return Ok(Html(page).into_response()),
    };

    if let (Some(creator), Some(partner), Some(business)) = (creator, partner, business) {
        let body = events::match_notification(&partner.public_name(), &business.name, &event);
        if let Err(e) = state
            .messaging
            .send_message(&creator.phone_number, &body)
            .await
        {
            tracing::error!(error = %e, event_id = event.id, "failed to notify event creator");
        }
    }

    let jar = session::set_flash(jar, "You have a new meal plan!");
    Ok((jar, Redirect::to("/upcoming_events")).into_response())
}

// GET /upcoming_events
pub async fn upcoming_events(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    jar: CookieJar,
) -> Result<(CookieJar, Html<String>), AppError> {
    let (jar, flash) = session::take_flash(jar);
    let today = Utc::now().date_naive();
    let listings = {
        let db = state.conn()?;
        queries::get_upcoming_events_for_user(&db, user_id, &today)?
    };

    Ok((
        jar,
        Html(views::upcoming_events_page(user_id, &listings, flash.as_deref())),
    ))
}
