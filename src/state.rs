use std::sync::Arc;

use anyhow::Context;

use crate::{
    auth::{
        jwt::JwtKeys,
        repo::{MemoryUserStore, PgUserStore, UserStore},
    },
    config::AppConfig,
    db,
    insights::{
        export::{ExportNotifier, WebhookNotifier},
        memory::MemoryInsightStore,
        repo::{InsightStore, PgInsightStore},
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub jwt: JwtKeys,
    pub users: Arc<dyn UserStore>,
    pub insights: Arc<dyn InsightStore>,
    pub notifier: Arc<dyn ExportNotifier>,
}

impl AppState {
    /// Postgres-backed when `DATABASE_URL` is set, in-memory otherwise.
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        let notifier = Arc::new(
            WebhookNotifier::new(
                config.export.webhook_url.clone(),
                config.export.webhook_timeout,
            )
            .context("build export notifier")?,
        ) as Arc<dyn ExportNotifier>;

        let Some(url) = config.database_url.as_deref() else {
            tracing::warn!("DATABASE_URL not set; using in-memory stores");
            return Ok(Self::in_memory(config, notifier));
        };

        let pool = db::connect(url).await?;
        Ok(Self::from_parts(
            Arc::new(config),
            Arc::new(PgUserStore::new(pool.clone())),
            Arc::new(PgInsightStore::new(pool)),
            notifier,
        ))
    }

    pub fn in_memory(config: AppConfig, notifier: Arc<dyn ExportNotifier>) -> Self {
        Self::from_parts(
            Arc::new(config),
            Arc::new(MemoryUserStore::new()),
            Arc::new(MemoryInsightStore::new()),
            notifier,
        )
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        insights: Arc<dyn InsightStore>,
        notifier: Arc<dyn ExportNotifier>,
    ) -> Self {
        Self {
            jwt: JwtKeys::new(&config.jwt),
            config,
            users,
            insights,
            notifier,
        }
    }
}
