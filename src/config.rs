use std::env;
use std::path::PathBuf;

use crate::auth::AuthSettings;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
const DEFAULT_TOKEN_TTL_DAYS: i64 = 7;

/// Process configuration, read once at startup.
///
/// Secrets are optional here: a missing `JWT_SECRET` makes every token operation fail
/// with 401/500 instead of aborting the process, and a missing `ADMIN_INVITE_TOKEN`
/// means no registration can ever be elevated to admin.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_port: u16,
    pub server_host: String,
    pub jwt_secret: Option<String>,
    pub admin_invite_token: Option<String>,
    pub client_url: Option<String>,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub token_ttl_days: i64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .expect("SERVER_PORT must be a number"),
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            jwt_secret: non_empty_var("JWT_SECRET"),
            admin_invite_token: non_empty_var("ADMIN_INVITE_TOKEN"),
            client_url: non_empty_var("CLIENT_URL"),
            upload_dir: env::var("UPLOAD_DIR")
                .unwrap_or_else(|_| "uploads".to_string())
                .into(),
            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            token_ttl_days: env::var("TOKEN_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|days| *days > 0 && chrono::Duration::try_days(*days).is_some())
                .unwrap_or(DEFAULT_TOKEN_TTL_DAYS),
        }
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }

    pub fn auth_settings(&self) -> AuthSettings {
        AuthSettings {
            jwt_secret: self.jwt_secret.clone(),
            admin_invite_token: self.admin_invite_token.clone(),
            token_ttl: chrono::Duration::try_days(self.token_ttl_days)
                .unwrap_or_else(|| chrono::Duration::days(DEFAULT_TOKEN_TTL_DAYS)),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
