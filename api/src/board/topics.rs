use axum::{Json, extract::State};

use crate::{App, board::models::topic::Topic, error::AppError};

#[axum::debug_handler]
pub async fn list_topics(State(ctx): State<App>) -> Result<Json<Vec<Topic>>, AppError> {
    let topics = sqlx::query_as::<_, Topic>("SELECT slug, name FROM topics ORDER BY name;")
        .fetch_all(&ctx.pool)
        .await?;

    Ok(Json(topics))
}
