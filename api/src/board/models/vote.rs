use sqlx::FromRow;

#[derive(FromRow, Debug)]
pub struct Vote {
    pub id: String,
    pub comment_id: String,
    pub username: String,
    pub value: i64,
}
