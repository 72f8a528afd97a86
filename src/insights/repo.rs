use std::collections::BTreeMap;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{
    week_windows, Analytics, Insight, InsightPatch, InsightRow, NewInsight,
    Source, WeeklyCount,
};

/// Insight persistence. Listing order is `created_at` descending with ties in
/// insertion order.
#[async_trait]
pub trait InsightStore: Send + Sync {
    /// Returns the page and the unfiltered total.
    async fn list(&self, limit: i64, offset: i64) -> anyhow::Result<(Vec<Insight>, i64)>;
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Insight>>;
    async fn create(&self, new: NewInsight) -> anyhow::Result<Insight>;
    /// `None` if `id` is unknown.
    async fn update(&self, id: Uuid, patch: &InsightPatch) -> anyhow::Result<Option<Insight>>;
    /// `false` if nothing was removed.
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
    async fn analytics(&self, now: OffsetDateTime) -> anyhow::Result<Analytics>;
    async fn list_all_for_export(&self) -> anyhow::Result<Vec<Insight>>;
}

const INSIGHT_COLUMNS: &str =
    "id, author_id, title, description, source, created_at, updated_at";

#[derive(Clone)]
pub struct PgInsightStore {
    db: PgPool,
}

impl PgInsightStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn into_insights(rows: Vec<InsightRow>) -> anyhow::Result<Vec<Insight>> {
    rows.into_iter().map(Insight::try_from).collect()
}

#[async_trait]
impl InsightStore for PgInsightStore {
    async fn list(&self, limit: i64, offset: i64) -> anyhow::Result<(Vec<Insight>, i64)> {
        tracing::debug!(limit, offset, "list insights");
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM insights")
            .fetch_one(&self.db)
            .await
            .context("count insights")?;

        let rows = sqlx::query_as::<_, InsightRow>(&format!(
            r#"
            SELECT {INSIGHT_COLUMNS}
            FROM insights
            ORDER BY created_at DESC, seq ASC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await
        .context("list insights")?;

        Ok((into_insights(rows)?, total))
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Insight>> {
        tracing::debug!(insight_id = %id, "get insight");
        let row = sqlx::query_as::<_, InsightRow>(&format!(
            "SELECT {INSIGHT_COLUMNS} FROM insights WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("select insight")?;
        row.map(Insight::try_from).transpose()
    }

    async fn create(&self, new: NewInsight) -> anyhow::Result<Insight> {
        tracing::debug!(insight_id = %new.id, "create insight");
        let insight = new.into_insight(OffsetDateTime::now_utc());
        let row = sqlx::query_as::<_, InsightRow>(&format!(
            r#"
            INSERT INTO insights (id, author_id, title, description, source, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {INSIGHT_COLUMNS}
            "#
        ))
        .bind(insight.id)
        .bind(insight.author_id)
        .bind(&insight.title)
        .bind(&insight.description)
        .bind(insight.source.map(|s| s.as_str()))
        .bind(insight.created_at)
        .bind(insight.updated_at)
        .fetch_one(&self.db)
        .await
        .context("insert insight")?;
        row.try_into()
    }

    async fn update(&self, id: Uuid, patch: &InsightPatch) -> anyhow::Result<Option<Insight>> {
        tracing::debug!(insight_id = %id, "update insight");
        let mut tx = self.db.begin().await.context("begin tx")?;

        let current = sqlx::query_as::<_, InsightRow>(&format!(
            "SELECT {INSIGHT_COLUMNS} FROM insights WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .context("select insight for update")?;

        let Some(current) = current else {
            return Ok(None);
        };
        let mut insight = Insight::try_from(current)?;
        patch.apply(&mut insight, OffsetDateTime::now_utc());

        let row = sqlx::query_as::<_, InsightRow>(&format!(
            r#"
            UPDATE insights
               SET title = $2, description = $3, source = $4, updated_at = $5
             WHERE id = $1
            RETURNING {INSIGHT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&insight.title)
        .bind(&insight.description)
        .bind(insight.source.map(|s| s.as_str()))
        .bind(insight.updated_at)
        .fetch_one(&mut *tx)
        .await
        .context("update insight")?;

        tx.commit().await.context("commit tx")?;
        Ok(Some(row.try_into()?))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        tracing::debug!(insight_id = %id, "delete insight");
        let res = sqlx::query("DELETE FROM insights WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete insight")?;
        Ok(res.rows_affected() > 0)
    }

    async fn analytics(&self, now: OffsetDateTime) -> anyhow::Result<Analytics> {
        tracing::debug!("insight analytics");
        let total_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM insights")
            .fetch_one(&self.db)
            .await
            .context("count insights")?;

        let by_source = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT source, COUNT(*)
              FROM insights
             WHERE source IS NOT NULL
             GROUP BY source
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("count insights by source")?;
        let count_by_source = by_source
            .into_iter()
            .map(|(source, n)| Ok((source.parse::<Source>()?, n)))
            .collect::<anyhow::Result<BTreeMap<_, _>>>()?;

        let by_author = sqlx::query_as::<_, (Uuid, i64)>(
            "SELECT author_id, COUNT(*) FROM insights GROUP BY author_id",
        )
        .fetch_all(&self.db)
        .await
        .context("count insights by author")?;

        let mut insights_per_week = Vec::with_capacity(super::repo_types::WEEKS);
        for (week_start, week_end) in week_windows(now) {
            let count: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM insights WHERE created_at >= $1 AND created_at < $2",
            )
            .bind(week_start)
            .bind(week_end)
            .fetch_one(&self.db)
            .await
            .context("count insights per week")?;
            insights_per_week.push(WeeklyCount { week_start, count });
        }

        Ok(Analytics {
            total_count,
            count_by_source,
            count_by_author: by_author.into_iter().collect(),
            insights_per_week,
        })
    }

    async fn list_all_for_export(&self) -> anyhow::Result<Vec<Insight>> {
        tracing::debug!("list insights for export");
        let rows = sqlx::query_as::<_, InsightRow>(&format!(
            "SELECT {INSIGHT_COLUMNS} FROM insights ORDER BY created_at DESC, seq ASC"
        ))
        .fetch_all(&self.db)
        .await
        .context("list insights for export")?;
        into_insights(rows)
    }
}

