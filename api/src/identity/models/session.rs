use std::ops::Add;

use base64::Engine;
use chrono::{DateTime, Utc};
use rand::RngCore;
use sqlx::FromRow;

#[derive(FromRow, Debug)]
pub struct Session {
    pub token: String,
    pub username: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new_for_user(username: &str) -> Session {
        let mut token_bytes = [0u8; 48];
        rand::thread_rng().fill_bytes(&mut token_bytes);

        // URL-safe so the token survives cookie encoding untouched
        let token = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(token_bytes);

        let now = Utc::now();

        Session {
            token,
            username: username.to_owned(),
            issued_at: now,
            expires_at: now.add(chrono::Duration::try_days(365).unwrap_or_else(|| {
                tracing::error!("Could not convert 365 to days, using default");
                chrono::Duration::default()
            })),
        }
    }
}
