pub mod comment;
pub mod models;
pub mod routes;
pub mod topics;

#[cfg(test)]
pub(crate) mod testing {
    use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
    use tempfile::TempDir;

    /// A throwaway file-backed database with the full schema applied. The
    /// TempDir must be kept alive for the duration of the test.
    pub async fn test_pool() -> (SqlitePool, TempDir) {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .expect("connect to test db");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("run migrations");

        (pool, dir)
    }
}
