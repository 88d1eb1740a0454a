use askama::Template;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::{AppendHeaders, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::extractors::session_token;
use crate::routes::Html;
use crate::state::AppState;

// -- Templates --

#[derive(Template)]
#[template(path = "pages/login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "pages/register.html")]
pub struct RegisterTemplate {
    pub error: Option<String>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CredentialsForm {
    pub username: String,
    pub password: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", get(register_page).post(register))
        .route("/login", get(login_page).post(login))
        .route("/logout", post(logout))
}

// -- Cookie helpers --

fn session_cookie(name: &str, token: &str, max_age_hours: u64) -> String {
    let max_age_secs = max_age_hours.saturating_mul(3600);
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        name, token, max_age_secs
    )
}

fn clear_session_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0", name)
}

// -- Handlers --

async fn register_page() -> Html<RegisterTemplate> {
    Html(RegisterTemplate { error: None })
}

/// POST /register: create the account and log straight in.
async fn register(
    State(state): State<AppState>,
    Form(form): Form<CredentialsForm>,
) -> AppResult<Response> {
    match state
        .social
        .register_and_login(&form.username, &form.password)
    {
        Ok((_, token)) => {
            let cookie = session_cookie(
                &state.config.auth.cookie_name,
                token.as_str(),
                state.config.auth.session_hours,
            );
            Ok((AppendHeaders([(header::SET_COOKIE, cookie)]), Redirect::to("/")).into_response())
        }
        Err(AppError::DuplicateUsername) => Ok(Html(RegisterTemplate {
            error: Some("Username already exists.".to_string()),
        })
        .into_response()),
        Err(AppError::InvalidInput(msg)) => {
            Ok(Html(RegisterTemplate { error: Some(msg) }).into_response())
        }
        Err(e) => Err(e),
    }
}

async fn login_page() -> Html<LoginTemplate> {
    Html(LoginTemplate { error: None })
}

/// POST /login: verify credentials and set the session cookie.
async fn login(
    State(state): State<AppState>,
    Form(form): Form<CredentialsForm>,
) -> AppResult<Response> {
    match state.social.login(&form.username, &form.password) {
        Ok((_, token)) => {
            let cookie = session_cookie(
                &state.config.auth.cookie_name,
                token.as_str(),
                state.config.auth.session_hours,
            );
            Ok((AppendHeaders([(header::SET_COOKIE, cookie)]), Redirect::to("/")).into_response())
        }
        // Do not reveal which half of the pair was wrong
        Err(AppError::NotFound | AppError::Unauthorized | AppError::InvalidInput(_)) => {
            Ok(Html(LoginTemplate {
                error: Some("Invalid credentials".to_string()),
            })
            .into_response())
        }
        Err(e) => Err(e),
    }
}

/// POST /logout: revoke the session and clear the cookie.
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    let cookie_name = &state.config.auth.cookie_name;
    if let Some(token) = session_token(&headers, cookie_name) {
        state.social.logout(token)?;
    }

    Ok((
        AppendHeaders([(header::SET_COOKIE, clear_session_cookie(cookie_name))]),
        Redirect::to("/"),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_sets_max_age() {
        let cookie = session_cookie("minifeed_session", "tok", 2);
        assert!(cookie.starts_with("minifeed_session=tok;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=7200"));
    }

    #[test]
    fn session_cookie_max_age_saturates() {
        let cookie = session_cookie("c", "tok", u64::MAX);
        assert!(cookie.ends_with(&format!("Max-Age={}", u64::MAX)));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        assert!(clear_session_cookie("c").contains("Max-Age=0"));
    }
}
