use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::services::accounts::{self, ProfileError};
use crate::session::{self, CurrentUser};
use crate::state::AppState;
use crate::views;

// GET /profile/:id
pub async fn profile(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<i64>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    if id != user_id {
        return Ok(Redirect::to(&format!("/other_profile/{id}")).into_response());
    }

    let user = {
        let db = state.conn()?;
        queries::get_user(&db, user_id)?
    }
    .ok_or_else(|| AppError::NotFound("User".to_string()))?;

    let (jar, flash) = session::take_flash(jar);
    Ok((jar, Html(views::own_profile(&user, None, flash.as_deref()))).into_response())
}

// GET /other_profile/:id
pub async fn other_profile(
    State(state): State<Arc<AppState>>,
    CurrentUser(viewer_id): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Html<String>, AppError> {
    let user = {
        let db = state.conn()?;
        queries::get_user(&db, id)?
    }
    .ok_or_else(|| AppError::NotFound("User".to_string()))?;

    Ok(Html(views::other_profile(Some(viewer_id), &user)))
}

// POST /profile-edit
#[derive(Deserialize)]
pub struct ProfileEditForm {
    #[serde(default)]
    pub description: String,
}

pub async fn profile_edit(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    jar: CookieJar,
    Form(form): Form<ProfileEditForm>,
) -> Result<Response, AppError> {
    let db = state.conn()?;

    match accounts::update_profile(&db, user_id, &form.description) {
        Ok(()) => {
            tracing::info!(user_id, "profile updated");
            let jar = session::set_flash(jar, "You have successfully updated your profile.");
            Ok((jar, Redirect::to(&format!("/profile/{user_id}"))).into_response())
        }
        Err(ProfileError::Internal(e)) => Err(e.into()),
        Err(e) => {
            let mut user = queries::get_user(&db, user_id)?
                .ok_or_else(|| AppError::NotFound("User".to_string()))?;
            // keep what they typed so it can be trimmed down
            user.description = form.description;
            Ok(Html(views::own_profile(&user, Some(&e.to_string()), None)).into_response())
        }
    }
}
