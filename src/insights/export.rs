//! CSV export with a best-effort webhook notification.

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use tracing::{info, warn};
use uuid::Uuid;

use super::{repo::InsightStore, repo_types::Insight};
use crate::{
    auth::repo_types::User,
    config::ExportConfig,
    error::AppResult,
    middleware::correlation::{current_correlation_id, CORRELATION_ID_HEADER},
};

pub const EXPORT_SUCCESS: &str = "Insights exported successfully";
const CSV_HEADER: &str = "id,title,description,source,author_id,created_at";

#[derive(Debug, Serialize)]
pub struct ExportEvent {
    pub event: &'static str,
    pub count: usize,
    pub user_id: Uuid,
}

#[async_trait]
pub trait ExportNotifier: Send + Sync {
    async fn notify(&self, event: &ExportEvent) -> anyhow::Result<()>;
}

/// Posts export events to a fixed URL with a per-request timeout.
pub struct WebhookNotifier {
    url: String,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build webhook client")?;
        Ok(Self { url, client })
    }
}

#[async_trait]
impl ExportNotifier for WebhookNotifier {
    async fn notify(&self, event: &ExportEvent) -> anyhow::Result<()> {
        let mut req = self.client.post(&self.url).json(event);
        if let Some(correlation_id) = current_correlation_id() {
            req = req.header(CORRELATION_ID_HEADER, correlation_id);
        }
        req.send()
            .await
            .with_context(|| format!("POST {}", self.url))?
            .error_for_status()
            .context("webhook rejected export event")?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub exported_count: usize,
    pub path: PathBuf,
}

pub struct ExportJob {
    store: Arc<dyn InsightStore>,
    notifier: Arc<dyn ExportNotifier>,
    dir: PathBuf,
}

impl ExportJob {
    pub fn new(
        store: Arc<dyn InsightStore>,
        notifier: Arc<dyn ExportNotifier>,
        cfg: &ExportConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            dir: cfg.dir.clone(),
        }
    }

    /// Writes the CSV, then notifies. A failed notification is logged and
    /// does not fail the export.
    pub async fn run(&self, acting: &User) -> AppResult<ExportSummary> {
        let insights = self.store.list_all_for_export().await?;
        let csv = render_csv(&insights)?;

        let path = self.dir.join(format!("insights-export-{}.csv", Uuid::new_v4()));
        tokio::fs::write(&path, csv)
            .await
            .with_context(|| format!("write export to {}", path.display()))?;

        let event = ExportEvent {
            event: "insights_exported",
            count: insights.len(),
            user_id: acting.id,
        };
        match self.notifier.notify(&event).await {
            Ok(()) => info!(count = event.count, user_id = %acting.id, "export notification sent"),
            Err(e) => warn!(error = %format!("{e:#}"), "failed to send export notification"),
        }

        info!(
            count = insights.len(),
            user_id = %acting.id,
            path = %path.display(),
            "insights exported"
        );
        Ok(ExportSummary {
            exported_count: insights.len(),
            path,
        })
    }
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Header row unquoted, every data field quoted.
pub fn render_csv(insights: &[Insight]) -> anyhow::Result<String> {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for i in insights {
        let created_at = i.created_at.format(&Rfc3339).context("format created_at")?;
        let row = [
            i.id.to_string(),
            i.title.clone(),
            i.description.clone(),
            i.source.map(|s| s.as_str().to_string()).unwrap_or_default(),
            i.author_id.to_string(),
            created_at,
        ];
        let line: Vec<String> = row.iter().map(|f| quote(f)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    Ok(out)
}
