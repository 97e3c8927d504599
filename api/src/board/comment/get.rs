use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{App, board::models::comment::CommentRow, error::AppError};

use super::Comment;

#[derive(Deserialize)]
pub struct Queries {
    topic: Option<String>,
}

#[axum::debug_handler]
pub async fn get_comments(
    State(ctx): State<App>,
    q: Query<Queries>,
) -> Result<Json<Vec<Comment>>, AppError> {
    let topic = q.topic.as_deref().map(str::trim).filter(|t| !t.is_empty());

    let rows = list_comments(&ctx.pool, topic).await?;

    Ok(Json(rows.into_iter().map(Comment::from).collect()))
}

pub async fn list_comments(
    pool: &SqlitePool,
    topic: Option<&str>,
) -> Result<Vec<CommentRow>, AppError> {
    let rows = match topic {
        Some(topic) => {
            sqlx::query_as::<_, CommentRow>(
                "
                SELECT c.id, c.text, c.author_name, c.score, c.created_at,
                       c.topic_slug, t.name AS topic_name
                FROM comments c JOIN topics t ON c.topic_slug = t.slug
                WHERE c.topic_slug = ?1
                ORDER BY c.created_at DESC;
                ",
            )
            .bind(topic)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, CommentRow>(
                "
                SELECT c.id, c.text, c.author_name, c.score, c.created_at,
                       c.topic_slug, t.name AS topic_name
                FROM comments c JOIN topics t ON c.topic_slug = t.slug
                ORDER BY c.created_at DESC;
                ",
            )
            .fetch_all(pool)
            .await?
        }
    };

    Ok(rows)
}
