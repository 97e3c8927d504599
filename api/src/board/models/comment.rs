use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

// The flat row shape produced by the comments-to-topics join
#[derive(FromRow, Debug, Clone)]
pub struct CommentRow {
    pub id: String,
    pub text: String,
    pub author_name: String,
    pub score: i64,
    pub created_at: DateTime<Utc>,
    pub topic_slug: String,
    pub topic_name: String,
}

#[derive(Debug)]
pub struct NewComment {
    pub id: String,
    pub text: String,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
    pub topic_slug: String,
}

impl NewComment {
    pub fn new(text: String, author_name: String, topic_slug: String) -> Self {
        NewComment {
            id: Uuid::new_v4().to_string(),
            text,
            author_name,
            created_at: Utc::now(),
            topic_slug,
        }
    }
}
