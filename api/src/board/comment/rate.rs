use std::time::Duration;

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    App,
    board::models::{comment::CommentRow, vote::Vote},
    error::AppError,
    identity::AuthUser,
};

use super::Comment;

// A busy database from a competing voter is transient, so it is retried
// here instead of bubbling straight to the client.
const MAX_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(20);

#[derive(Deserialize)]
pub struct RateSubmission {
    delta: i64,
}

#[axum::debug_handler]
pub async fn rate_comment(
    State(ctx): State<App>,
    Path(id): Path<String>,
    AuthUser(user): AuthUser,
    crate::json::Json(submission): crate::json::Json<RateSubmission>,
) -> Result<Json<Comment>, AppError> {
    let comment = apply_vote(&ctx.pool, &id, &user.username, submission.delta).await?;

    Ok(Json(comment))
}

/// Applies one vote from `username` to a comment, keeping the cached score
/// equal to the sum of surviving vote values.
///
/// Re-submitting the caller's current vote value retracts it; submitting
/// the opposite value flips it (a net change of 2). The read-modify-write
/// runs in a single IMMEDIATE transaction so the score read below cannot
/// be changed by a competing voter before it is written back; a busy
/// database aborts the attempt and is retried a bounded number of times
/// before surfacing as a conflict.
pub async fn apply_vote(
    pool: &SqlitePool,
    comment_id: &str,
    username: &str,
    delta: i64,
) -> Result<Comment, AppError> {
    if delta != 1 && delta != -1 {
        return Err(AppError::BadRequest("delta must be 1 or -1".into()));
    }

    let mut attempts = 0;
    loop {
        attempts += 1;

        match apply_vote_once(pool, comment_id, username, delta).await {
            Err(AppError::Database(e)) if is_busy(&e) => {
                if attempts >= MAX_ATTEMPTS {
                    tracing::warn!(
                        comment_id,
                        attempts,
                        "vote transaction kept hitting a busy database"
                    );
                    return Err(AppError::Conflict(
                        "Comment is being rated by someone else, try again",
                    ));
                }
                tokio::time::sleep(RETRY_BACKOFF).await;
            }
            result => return result,
        }
    }
}

async fn apply_vote_once(
    pool: &SqlitePool,
    comment_id: &str,
    username: &str,
    delta: i64,
) -> Result<Comment, AppError> {
    let mut tx = pool.begin_with("BEGIN IMMEDIATE").await?;

    let comment = sqlx::query_as::<_, CommentRow>(
        "
        SELECT c.id, c.text, c.author_name, c.score, c.created_at,
               c.topic_slug, t.name AS topic_name
        FROM comments c JOIN topics t ON c.topic_slug = t.slug
        WHERE c.id = ?1;
        ",
    )
    .bind(comment_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("Comment not found"))?;

    let vote = sqlx::query_as::<_, Vote>(
        "
        SELECT id, comment_id, username, value
        FROM votes WHERE comment_id = ?1 AND username = ?2;
        ",
    )
    .bind(comment_id)
    .bind(username)
    .fetch_optional(&mut *tx)
    .await?;

    let previous = vote.as_ref().map(|v| v.value).unwrap_or(0);

    let new_score = match vote {
        // Same value again retracts the vote
        Some(vote) if vote.value == delta => {
            sqlx::query("DELETE FROM votes WHERE id = ?1;")
                .bind(&vote.id)
                .execute(&mut *tx)
                .await?;

            comment.score - previous
        }
        Some(vote) => {
            sqlx::query("UPDATE votes SET value = ?1 WHERE id = ?2;")
                .bind(delta)
                .bind(&vote.id)
                .execute(&mut *tx)
                .await?;

            comment.score + (delta - previous)
        }
        None => {
            sqlx::query(
                "
                INSERT INTO votes (id, comment_id, username, value)
                VALUES (?1, ?2, ?3, ?4);
                ",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(comment_id)
            .bind(username)
            .bind(delta)
            .execute(&mut *tx)
            .await?;

            comment.score + delta
        }
    };

    sqlx::query("UPDATE comments SET score = ?1 WHERE id = ?2;")
        .bind(new_score)
        .bind(comment_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(Comment {
        score: new_score,
        ..Comment::from(comment)
    })
}

fn is_busy(e: &sqlx::Error) -> bool {
    match e.as_database_error() {
        // 5 = SQLITE_BUSY, 6 = SQLITE_LOCKED, 517 = SQLITE_BUSY_SNAPSHOT
        Some(db) => matches!(db.code().as_deref(), Some("5") | Some("6") | Some("517")),
        None => false,
    }
}

#[cfg(test)]
mod test {
    use sqlx::SqlitePool;

    use super::*;
    use crate::board::comment::create::insert_comment;
    use crate::board::testing::test_pool;

    async fn seed_comment(pool: &SqlitePool) -> String {
        insert_comment(pool, "First!".into(), "Alice".into(), "general".into())
            .await
            .expect("insert comment")
            .id
    }

    async fn stored_score(pool: &SqlitePool, comment_id: &str) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT score FROM comments WHERE id = ?1;")
            .bind(comment_id)
            .fetch_one(pool)
            .await
            .expect("fetch score")
    }

    async fn vote_sum(pool: &SqlitePool, comment_id: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(value), 0) FROM votes WHERE comment_id = ?1;",
        )
        .bind(comment_id)
        .fetch_one(pool)
        .await
        .expect("sum votes")
    }

    async fn vote_count(pool: &SqlitePool, comment_id: &str) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM votes WHERE comment_id = ?1;")
            .bind(comment_id)
            .fetch_one(pool)
            .await
            .expect("count votes")
    }

    #[tokio::test]
    async fn first_vote_adds_its_value() {
        let (pool, _dir) = test_pool().await;
        let id = seed_comment(&pool).await;

        let comment = apply_vote(&pool, &id, "alice", 1).await.unwrap();

        assert_eq!(comment.score, 1);
        assert_eq!(stored_score(&pool, &id).await, 1);
        assert_eq!(vote_sum(&pool, &id).await, 1);
    }

    #[tokio::test]
    async fn repeating_a_vote_retracts_it() {
        let (pool, _dir) = test_pool().await;
        let id = seed_comment(&pool).await;

        apply_vote(&pool, &id, "alice", -1).await.unwrap();
        let comment = apply_vote(&pool, &id, "alice", -1).await.unwrap();

        assert_eq!(comment.score, 0);
        assert_eq!(vote_count(&pool, &id).await, 0);
        assert_eq!(stored_score(&pool, &id).await, 0);
    }

    #[tokio::test]
    async fn opposite_vote_flips_by_two() {
        let (pool, _dir) = test_pool().await;
        let id = seed_comment(&pool).await;

        let up = apply_vote(&pool, &id, "alice", 1).await.unwrap();
        assert_eq!(up.score, 1);

        let down = apply_vote(&pool, &id, "alice", -1).await.unwrap();
        assert_eq!(down.score, -1);

        // One vote survives, holding the latest requested value
        assert_eq!(vote_count(&pool, &id).await, 1);
        let value = sqlx::query_scalar::<_, i64>(
            "SELECT value FROM votes WHERE comment_id = ?1 AND username = 'alice';",
        )
        .bind(&id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(value, -1);
    }

    #[tokio::test]
    async fn score_tracks_vote_sum_through_a_session() {
        let (pool, _dir) = test_pool().await;
        let id = seed_comment(&pool).await;

        assert_eq!(apply_vote(&pool, &id, "alice", 1).await.unwrap().score, 1);
        assert_eq!(apply_vote(&pool, &id, "bob", 1).await.unwrap().score, 2);
        // alice flips, flips back, then retracts
        assert_eq!(apply_vote(&pool, &id, "alice", -1).await.unwrap().score, 0);
        assert_eq!(apply_vote(&pool, &id, "alice", 1).await.unwrap().score, 1);
        assert_eq!(apply_vote(&pool, &id, "alice", 1).await.unwrap().score, 0);

        assert_eq!(stored_score(&pool, &id).await, vote_sum(&pool, &id).await);
        assert_eq!(vote_count(&pool, &id).await, 1); // only bob's vote remains
    }

    #[tokio::test]
    async fn unknown_comment_is_not_found_and_leaves_storage_alone() {
        let (pool, _dir) = test_pool().await;
        let id = seed_comment(&pool).await;
        apply_vote(&pool, &id, "alice", 1).await.unwrap();

        let err = apply_vote(&pool, "nope", "alice", 1).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        assert_eq!(stored_score(&pool, &id).await, 1);
        assert_eq!(vote_count(&pool, &id).await, 1);
    }

    #[tokio::test]
    async fn out_of_range_delta_is_rejected_before_storage() {
        let (pool, _dir) = test_pool().await;
        let id = seed_comment(&pool).await;

        for delta in [0, 2, -2, 42] {
            let err = apply_vote(&pool, &id, "alice", delta).await.unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)));
        }

        assert_eq!(vote_count(&pool, &id).await, 0);
        assert_eq!(stored_score(&pool, &id).await, 0);
    }

    #[tokio::test]
    async fn concurrent_votes_from_two_users_both_land() {
        let (pool, _dir) = test_pool().await;
        let id = seed_comment(&pool).await;

        let alice = {
            let pool = pool.clone();
            let id = id.clone();
            tokio::spawn(async move { apply_vote(&pool, &id, "alice", 1).await })
        };
        let bob = {
            let pool = pool.clone();
            let id = id.clone();
            tokio::spawn(async move { apply_vote(&pool, &id, "bob", 1).await })
        };

        alice.await.unwrap().unwrap();
        bob.await.unwrap().unwrap();

        assert_eq!(stored_score(&pool, &id).await, 2);
        assert_eq!(vote_sum(&pool, &id).await, 2);
    }
}
