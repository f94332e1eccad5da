use std::sync::Arc;

use axum::extract::State;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use axum_extra::extract::CookieJar;
use chrono::Utc;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::services::accounts::{self, LoginError, SignupError, SignupRequest};
use crate::services::verification::{self, VerificationError};
use crate::session;
use crate::state::AppState;
use crate::views;

// GET /login
pub async fn login_page(jar: CookieJar) -> (CookieJar, Html<String>) {
    let (jar, flash) = session::take_flash(jar);
    (jar, Html(views::login_page(None, flash.as_deref())))
}

// POST /login
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let found = {
        let db = state.conn()?;
        accounts::find_login_user(&db, &form.email)
    };

    let user = match found {
        Ok(user) => user,
        Err(LoginError::Internal(e)) => return Err(e.into()),
        Err(e) => {
            tracing::info!(email = %form.email, "login for unknown email");
            return Ok(Html(views::login_page(Some(&e.to_string()), None)).into_response());
        }
    };

    if !accounts::verify_password(&form.password, &user.password_hash) {
        tracing::info!(user_id = user.id, "login with wrong password");
        let message = LoginError::WrongPassword.to_string();
        return Ok(Html(views::login_page(Some(&message), None)).into_response());
    }

    tracing::info!(user_id = user.id, "user logged in");
    let jar = session::log_in(jar, user.id, &state.config.secret_key);
    let jar = session::set_flash(jar, &format!("Welcome back, {}!", user.first_name));
    Ok((jar, Redirect::to("/")).into_response())
}

// GET /signup
pub async fn signup_page() -> Html<String> {
    Html(views::phone_page(None))
}

// POST /submit_phone
#[derive(Deserialize)]
pub struct PhoneForm {
    pub phone_number: String,
}

pub async fn submit_phone(
    State(state): State<Arc<AppState>>,
    Form(form): Form<PhoneForm>,
) -> Result<Html<String>, AppError> {
    let now = Utc::now().naive_utc();

    let issued = {
        let db = state.conn()?;
        if let Err(e) = queries::cleanup_expired_codes(&db, &now) {
            tracing::warn!(error = %e, "failed to clean up expired verification codes");
        }
        if let Err(e) = queries::cleanup_old_windows(&db, &now) {
            tracing::warn!(error = %e, "failed to clean up old rate limit windows");
        }
        verification::issue_code(
            &db,
            &form.phone_number,
            state.config.verification_ttl_minutes,
            state.config.verification_sends_per_hour,
            now,
        )
    };

    let code = match issued {
        Ok(code) => code,
        Err(VerificationError::Internal(e)) => return Err(e.into()),
        Err(e) => return Ok(Html(views::phone_page(Some(&e.to_string())))),
    };

    state
        .messaging
        .send_message(&code.phone_number, &verification::sms_body(&code.code))
        .await
        .map_err(|e| AppError::Messaging(e.to_string()))?;

    Ok(Html(views::code_page(&code.phone_number, None)))
}

// POST /submit_confirmation_code
#[derive(Deserialize)]
pub struct ConfirmationCodeForm {
    pub phone_number: String,
    pub verification_code: String,
}

pub async fn submit_confirmation_code(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<ConfirmationCodeForm>,
) -> Result<Response, AppError> {
    let checked = {
        let db = state.conn()?;
        verification::check_code(
            &db,
            &form.phone_number,
            &form.verification_code,
            Utc::now().naive_utc(),
        )
    };

    match checked {
        Ok(phone) => {
            let jar = session::prove_phone(jar, &phone, &state.config.secret_key);
            Ok((jar, Html(views::signup_form(&phone, None))).into_response())
        }
        Err(VerificationError::Internal(e)) => Err(e.into()),
        Err(e) => Ok(Html(views::code_page(
            &form.phone_number,
            Some(&e.to_string()),
        ))
        .into_response()),
    }
}

// POST /signup
#[derive(Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub phone_number: String,
}

pub async fn signup(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<SignupForm>,
) -> Result<Response, AppError> {
    if form.password.is_empty() {
        let message = SignupError::MissingFields.to_string();
        return Ok(Html(views::signup_form(&form.phone_number, Some(&message))).into_response());
    }

    let password_hash = accounts::hash_password(&form.password, state.config.bcrypt_cost)?;
    let request = SignupRequest {
        first_name: form.first_name,
        last_name: form.last_name,
        email: form.email,
        phone_number: form.phone_number,
        proven_phone: session::proven_phone(&jar, &state.config.secret_key),
    };

    let registered = {
        let db = state.conn()?;
        accounts::register(&db, &request, password_hash, Utc::now().naive_utc())
    };

    let user = match registered {
        Ok(user) => user,
        Err(SignupError::Internal(e)) => return Err(e.into()),
        Err(e) => {
            return Ok(
                Html(views::signup_form(&request.phone_number, Some(&e.to_string())))
                    .into_response(),
            );
        }
    };

    let jar = session::clear_phone_proof(jar);
    let jar = session::log_in(jar, user.id, &state.config.secret_key);
    let jar = session::set_flash(jar, &format!("Welcome to Fork&Spoon, {}!", user.first_name));
    Ok((jar, Redirect::to("/")).into_response())
}
