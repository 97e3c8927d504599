use serde::Serialize;
use sqlx::FromRow;

#[derive(FromRow, Debug, Serialize, Clone)]
pub struct Topic {
    pub slug: String,
    pub name: String,
}
