use std::sync::Arc;

use axum::extract::State;
use axum::response::{Html, Redirect};
use axum_extra::extract::CookieJar;

use crate::db::queries;
use crate::errors::AppError;
use crate::session::{self, MaybeUser};
use crate::state::AppState;
use crate::views;

// GET /
pub async fn index(
    State(state): State<Arc<AppState>>,
    MaybeUser(user_id): MaybeUser,
    jar: CookieJar,
) -> Result<(CookieJar, Html<String>), AppError> {
    let (jar, flash) = session::take_flash(jar);

    let user = match user_id {
        Some(id) => {
            let db = state.conn()?;
            queries::get_user(&db, id)?
        }
        None => None,
    };

    Ok((jar, Html(views::home(user.as_ref(), flash.as_deref()))))
}

// GET /logout
pub async fn logout(jar: CookieJar) -> (CookieJar, Redirect) {
    let jar = session::log_out(jar);
    let jar = session::set_flash(jar, "You have successfully logged out");
    (jar, Redirect::to("/login"))
}
