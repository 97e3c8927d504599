use std::{str::FromStr, sync::Arc, time::Duration};

use axum::{Router, http::header};
use dotenv::dotenv;
use mimalloc::MiMalloc;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;

mod board;
mod config;
mod error;
mod identity;
mod json;

use config::ServerConfig;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Clone)]
pub struct App {
    pub pool: SqlitePool,
    pub config: Arc<ServerConfig>,
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Arc::new(ServerConfig::new_from_env());
    tracing::info!(env = ?config.env, "starting api");

    let pool = connect(&config.database_url)
        .await
        .expect("couldn't connect to db");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("couldn't run migrations");

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(
            config
                .cors_origins
                .iter()
                .filter_map(|o| o.parse::<axum::http::HeaderValue>().ok()),
        ))
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    // Built frontend, with an index.html fallback for SPA routes
    let frontend = ServeDir::new(&config.dist_dir)
        .fallback(ServeFile::new(config.dist_dir.join("index.html")));

    let state = App {
        pool,
        config: config.clone(),
    };

    let app = Router::new()
        .nest(
            "/api",
            identity::routes::route().merge(board::routes::route()),
        )
        .fallback_service(frontend)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("couldn't bind to address");
    tracing::info!("listening on {}", config.bind_addr);
    axum::serve(listener, app).await.unwrap();
}

async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(5)
        .idle_timeout(Duration::from_secs(120))
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
}
