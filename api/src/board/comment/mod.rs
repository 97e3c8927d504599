pub mod create;
pub mod get;
pub mod rate;

use serde::Serialize;

use crate::board::models::{comment::CommentRow, topic::Topic};

// The shape returned to the client
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub text: String,
    pub author: String,
    pub score: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub topic: Topic,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            text: row.text,
            author: row.author_name,
            score: row.score,
            created_at: row.created_at,
            topic: Topic {
                slug: row.topic_slug,
                name: row.topic_name,
            },
        }
    }
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn wire_shape_matches_what_the_frontend_expects() {
        let comment = Comment {
            id: "c1".into(),
            text: "First!".into(),
            author: "Alice".into(),
            score: 3,
            created_at: chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            topic: Topic {
                slug: "general".into(),
                name: "General".into(),
            },
        };

        let value = serde_json::to_value(&comment).unwrap();

        let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            ["author", "createdAt", "id", "score", "text", "topic"]
        );

        assert_eq!(value["author"], "Alice");
        assert_eq!(value["score"], 3);
        assert_eq!(value["topic"]["slug"], "general");
        assert_eq!(value["topic"]["name"], "General");
        assert!(
            value["createdAt"]
                .as_str()
                .unwrap()
                .starts_with("2024-01-01T00:00:00")
        );
    }
}
