use axum::http::request::Parts;

use crate::{App, error::AppError};

use self::models::user::User;

pub mod models;
pub mod password;
pub mod routes;

pub const COOKIE_NAME: &str = "auth_token";

#[derive(thiserror::Error, Debug)]
pub enum AuthenticationError {
    #[error("Login required")]
    NoCookie,

    #[error(
        "Unauthorized, please check if you're logged in by refreshing the \
         page. This could be due to an expired session or token has became invalid."
    )]
    Unauthorized,

    #[error("Invalid credentials")]
    InvalidCredentials,
}

pub struct MaybeAuthUser(pub Result<User, AuthenticationError>);

impl axum::extract::FromRequestParts<App> for MaybeAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &App) -> Result<Self, Self::Rejection> {
        let jar = axum_extra::extract::cookie::CookieJar::from_headers(&parts.headers);

        let session_token: String = if let Some(t) = jar.get(COOKIE_NAME) {
            t.value().to_owned()
        } else {
            return Ok(MaybeAuthUser(Err(AuthenticationError::NoCookie)));
        };

        let user = sqlx::query_as::<_, User>(
            "
            SELECT u.id, u.username, u.password_hash, u.display_name, u.created_at
            FROM sessions s JOIN users u
            ON s.username = u.username
            WHERE s.token = ?1
            AND s.expires_at > ?2;
            ",
        )
        .bind(&session_token)
        .bind(chrono::Utc::now())
        .fetch_optional(&state.pool)
        .await?;

        Ok(MaybeAuthUser(
            user.ok_or(AuthenticationError::Unauthorized),
        ))
    }
}

pub struct AuthUser(pub User);

impl axum::extract::FromRequestParts<App> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &App) -> Result<Self, Self::Rejection> {
        let MaybeAuthUser(auth_user) = MaybeAuthUser::from_request_parts(parts, state).await?;

        Ok(AuthUser(auth_user?))
    }
}
