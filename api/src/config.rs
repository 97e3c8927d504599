use std::{net::SocketAddr, path::PathBuf};

#[derive(Clone, Debug)]
pub enum Env {
    Dev,
    Staging,
    Production,
}

pub struct ServerConfig {
    pub env: Env,
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub cors_origins: Vec<String>,
    pub secure_cookies: bool,
    pub dist_dir: PathBuf,
}

fn var(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(val) => Some(val),
        Err(std::env::VarError::NotPresent) => None,
        Err(std::env::VarError::NotUnicode(_)) => {
            tracing::error!("Environment variable `{key}` is not valid unicode");
            std::process::exit(1)
        }
    }
}

impl ServerConfig {
    pub fn new_from_env() -> Self {
        let env = match var("ENVIRONMENT").as_deref() {
            Some("staging") => Env::Staging,
            Some("production") => Env::Production,
            _ => Env::Dev,
        };

        let bind_addr = match var("BIND_ADDR") {
            Some(addr) => addr.parse().unwrap_or_else(|e| {
                tracing::error!("Could not parse `BIND_ADDR` as a socket address: {e}");
                std::process::exit(1)
            }),
            None => SocketAddr::from(([0, 0, 0, 0], 3000)),
        };

        let database_url = var("DATABASE_URL").unwrap_or_else(|| {
            if let Err(e) = std::fs::create_dir_all("data") {
                tracing::warn!("Could not create the default data directory: {e}");
            }
            "sqlite://data/board.db".into()
        });

        let cors_origins = var("CORS_ORIGINS")
            .map(|val| {
                val.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| {
                vec![
                    "http://localhost:5173".into(),
                    "http://127.0.0.1:5173".into(),
                ]
            });

        let secure_cookies = var("SECURE_COOKIES")
            .map(|val| val == "true")
            .unwrap_or(matches!(env, Env::Production));

        let dist_dir = var("DIST_DIR").map(PathBuf::from).unwrap_or_else(|| "dist".into());

        ServerConfig {
            env,
            bind_addr,
            database_url,
            cors_origins,
            secure_cookies,
            dist_dir,
        }
    }
}
