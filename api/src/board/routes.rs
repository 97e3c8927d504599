use axum::{
    Router,
    routing::{get, post},
};

use crate::App;

use super::{
    comment::{create::create_comment, get::get_comments, rate::rate_comment},
    topics::list_topics,
};

pub fn route() -> Router<App> {
    Router::<App>::new()
        .route("/topics", get(list_topics))
        .route("/comments", get(get_comments))
        .route("/comments", post(create_comment))
        .route("/comments/{id}/rate", post(rate_comment))
}
