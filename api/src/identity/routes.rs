use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::Deserialize;
use sqlx::SqlitePool;
use time::Duration;

use crate::{
    App,
    error::AppError,
    identity::models::{
        session::Session,
        user::{User, UserResponse},
    },
};

use super::{AuthUser, AuthenticationError, COOKIE_NAME, password};

pub fn route() -> Router<App> {
    // TODO rate limit these public endpoints
    Router::<App>::new()
        .route("/me", get(whoami))
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

async fn whoami(AuthUser(user): AuthUser) -> Json<UserResponse> {
    Json(UserResponse::from(&user))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupSubmission {
    username: String,
    password: String,
    display_name: Option<String>,
}

#[axum::debug_handler]
async fn signup(
    State(ctx): State<App>,
    crate::json::Json(submission): crate::json::Json<SignupSubmission>,
) -> Result<impl IntoResponse, AppError> {
    let username = submission.username.trim().to_owned();
    let password = submission.password;

    if username.is_empty() || password.is_empty() {
        return Err(AppError::BadRequest(
            "Username and password required".into(),
        ));
    }

    let display_name = submission
        .display_name
        .map(|d| d.trim().to_owned())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| username.clone());

    let existing = sqlx::query("SELECT 1 FROM users WHERE username = ?1;")
        .bind(&username)
        .fetch_optional(&ctx.pool)
        .await?;

    if existing.is_some() {
        return Err(AppError::Conflict("Username already exists"));
    }

    let user = User::new(username, password::hash(&password)?, display_name);

    insert_user(&ctx.pool, &user).await?;

    let jar = start_session(&ctx, &user.username).await?;

    Ok((StatusCode::CREATED, jar, Json(UserResponse::from(&user))))
}

#[derive(Deserialize)]
pub struct LoginSubmission {
    username: String,
    password: String,
}

#[axum::debug_handler]
async fn login(
    State(ctx): State<App>,
    crate::json::Json(submission): crate::json::Json<LoginSubmission>,
) -> Result<impl IntoResponse, AppError> {
    let username = submission.username.trim().to_owned();

    let user = sqlx::query_as::<_, User>(
        "
        SELECT id, username, password_hash, display_name, created_at
        FROM users WHERE username = ?1;
        ",
    )
    .bind(&username)
    .fetch_optional(&ctx.pool)
    .await?;

    let Some(user) = user else {
        return Err(AuthenticationError::InvalidCredentials.into());
    };

    if !password::verify(&submission.password, &user.password_hash) {
        return Err(AuthenticationError::InvalidCredentials.into());
    }

    let jar = start_session(&ctx, &user.username).await?;

    Ok((jar, Json(UserResponse::from(&user))))
}

#[axum::debug_handler]
async fn logout(State(ctx): State<App>, jar: CookieJar) -> Result<impl IntoResponse, AppError> {
    if let Some(cookie) = jar.get(COOKIE_NAME) {
        sqlx::query("DELETE FROM sessions WHERE token = ?1;")
            .bind(cookie.value())
            .execute(&ctx.pool)
            .await?;
    }

    let expired = Cookie::build(COOKIE_NAME)
        .secure(ctx.config.secure_cookies)
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::ZERO)
        .path("/");

    Ok((StatusCode::NO_CONTENT, CookieJar::new().add(expired)))
}

/// Inserts a user row; a concurrent signup winning the race on the
/// username unique index surfaces as a conflict, not a server error.
async fn insert_user(pool: &SqlitePool, user: &User) -> Result<(), AppError> {
    sqlx::query(
        "
        INSERT INTO users (id, username, password_hash, display_name, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5);
        ",
    )
    .bind(&user.id)
    .bind(&user.username)
    .bind(&user.password_hash)
    .bind(&user.display_name)
    .bind(user.created_at)
    .execute(pool)
    .await
    .map_err(|e| {
        if e.as_database_error()
            .is_some_and(|db| db.is_unique_violation())
        {
            AppError::Conflict("Username already exists")
        } else {
            e.into()
        }
    })?;

    Ok(())
}

/// Persists a fresh session row and returns a jar carrying the auth cookie.
async fn start_session(ctx: &App, username: &str) -> Result<CookieJar, AppError> {
    let session = Session::new_for_user(username);

    sqlx::query(
        "
        INSERT INTO sessions (token, username, issued_at, expires_at)
        VALUES (?1, ?2, ?3, ?4);
        ",
    )
    .bind(&session.token)
    .bind(&session.username)
    .bind(session.issued_at)
    .bind(session.expires_at)
    .execute(&ctx.pool)
    .await?;

    let auth_cookie = Cookie::build((COOKIE_NAME, session.token))
        .secure(ctx.config.secure_cookies)
        .http_only(true)
        .same_site(SameSite::Lax)
        .expires(
            time::OffsetDateTime::now_utc()
                + (session.expires_at - session.issued_at)
                    .to_std()
                    .unwrap_or_default(),
        )
        .path("/");

    Ok(CookieJar::new().add(auth_cookie))
}
