use std::{path::PathBuf, str::FromStr, time::Duration};

use anyhow::Context;
use jsonwebtoken::Algorithm;

pub const DEFAULT_WEBHOOK_URL: &str = "https://hooks.example.com/notify";

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub algorithm: Algorithm,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub webhook_url: String,
    pub webhook_timeout: Duration,
    pub dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `None` runs the service on in-memory stores.
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub export: ExportConfig,
    pub seed_users: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());

        let algorithm = std::env::var("JWT_ALGORITHM").unwrap_or_else(|_| "HS256".into());
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            algorithm: parse_hmac_algorithm(&algorithm)?,
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(30),
        };

        let export = ExportConfig {
            webhook_url: std::env::var("EXPORT_WEBHOOK_URL")
                .unwrap_or_else(|_| DEFAULT_WEBHOOK_URL.into()),
            webhook_timeout: Duration::from_secs(
                std::env::var("EXPORT_WEBHOOK_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(5),
            ),
            dir: std::env::var("EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| std::env::temp_dir()),
        };

        let seed_users = std::env::var("SEED_USERS")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        Ok(Self {
            database_url,
            jwt,
            export,
            seed_users,
        })
    }
}

/// Tokens are signed with a shared secret, so only the HMAC family applies.
fn parse_hmac_algorithm(name: &str) -> anyhow::Result<Algorithm> {
    let algorithm = Algorithm::from_str(name)
        .map_err(|e| anyhow::anyhow!("unknown JWT_ALGORITHM {name}: {e}"))?;
    match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(algorithm),
        other => anyhow::bail!("JWT_ALGORITHM {other:?} is not an HMAC algorithm"),
    }
}
