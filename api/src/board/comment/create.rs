use axum::{Json, extract::State};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    App,
    board::models::{comment::NewComment, topic::Topic},
    error::AppError,
    identity::AuthUser,
};

use super::Comment;

#[derive(Deserialize)]
pub struct CommentSubmission {
    text: String,
    topic: String,
}

impl CommentSubmission {
    fn validate(&mut self) -> Result<(), &'static str> {
        self.text = self.text.trim().to_string();
        if self.text.is_empty() {
            return Err("Comment text required");
        }

        self.topic = self.topic.trim().to_string();
        if self.topic.is_empty() {
            return Err("Topic is required");
        }

        Ok(())
    }
}

#[axum::debug_handler]
pub async fn create_comment(
    State(ctx): State<App>,
    AuthUser(user): AuthUser,
    crate::json::Json(mut submission): crate::json::Json<CommentSubmission>,
) -> Result<Json<Comment>, AppError> {
    submission
        .validate()
        .map_err(|e| AppError::BadRequest(e.into()))?;

    let comment =
        insert_comment(&ctx.pool, submission.text, user.display_name, submission.topic).await?;

    Ok(Json(comment))
}

/// Inserts a fresh comment (score 0, no votes) after checking the topic
/// actually exists. The author's display name is denormalized into the row
/// so later profile renames don't rewrite history.
pub async fn insert_comment(
    pool: &SqlitePool,
    text: String,
    author_name: String,
    topic_slug: String,
) -> Result<Comment, AppError> {
    let topic = sqlx::query_as::<_, Topic>("SELECT slug, name FROM topics WHERE slug = ?1;")
        .bind(&topic_slug)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::BadRequest("Invalid topic".into()))?;

    let comment = NewComment::new(text, author_name, topic.slug.clone());

    sqlx::query(
        "
        INSERT INTO comments (id, text, author_name, score, created_at, topic_slug)
        VALUES (?1, ?2, ?3, 0, ?4, ?5);
        ",
    )
    .bind(&comment.id)
    .bind(&comment.text)
    .bind(&comment.author_name)
    .bind(comment.created_at)
    .bind(&comment.topic_slug)
    .execute(pool)
    .await?;

    Ok(Comment {
        id: comment.id,
        text: comment.text,
        author: comment.author_name,
        score: 0,
        created_at: comment.created_at,
        topic,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::board::testing::test_pool;

    #[tokio::test]
    async fn new_comments_start_with_zero_score() {
        let (pool, _dir) = test_pool().await;

        let comment = insert_comment(&pool, "First!".into(), "Alice".into(), "general".into())
            .await
            .unwrap();

        assert_eq!(comment.score, 0);
        assert_eq!(comment.author, "Alice");
        assert_eq!(comment.topic.name, "General");
    }

    #[test]
    fn long_comment_bodies_are_accepted() {
        let mut submission = CommentSubmission {
            text: "x".repeat(20_000),
            topic: "general".into(),
        };
        assert!(submission.validate().is_ok());
    }

    #[test]
    fn blank_comment_bodies_are_rejected() {
        let mut submission = CommentSubmission {
            text: "   ".into(),
            topic: "general".into(),
        };
        assert!(submission.validate().is_err());
    }

    #[tokio::test]
    async fn unknown_topics_are_rejected() {
        let (pool, _dir) = test_pool().await;

        let err = insert_comment(&pool, "First!".into(), "Alice".into(), "nope".into())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::BadRequest(_)));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments;")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
