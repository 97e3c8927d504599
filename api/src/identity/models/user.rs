use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(FromRow, Debug, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: String, password_hash: String, display_name: String) -> Self {
        User {
            id: Uuid::new_v4().to_string(),
            username,
            password_hash,
            display_name,
            created_at: Utc::now(),
        }
    }
}

// The shape returned to the client; the password hash never leaves the server
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub username: String,
    pub display_name: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        UserResponse {
            username: user.username.clone(),
            display_name: user.display_name.clone(),
        }
    }
}
