use std::collections::BTreeMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    repo::InsightStore,
    repo_types::{week_windows, Analytics, Insight, InsightPatch, NewInsight, WeeklyCount},
};

/// In-memory insight store. The vector keeps insertion order, which the
/// stable sort uses to break `created_at` ties.
#[derive(Default)]
pub struct MemoryInsightStore {
    insights: RwLock<Vec<Insight>>,
}

impl MemoryInsightStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn newest_first(&self) -> Vec<Insight> {
        let mut all = self.insights.read().await.clone();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all
    }
}

#[async_trait]
impl InsightStore for MemoryInsightStore {
    async fn list(&self, limit: i64, offset: i64) -> anyhow::Result<(Vec<Insight>, i64)> {
        let all = self.newest_first().await;
        let total = all.len() as i64;
        let page = all
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .collect();
        Ok((page, total))
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Insight>> {
        let insights = self.insights.read().await;
        Ok(insights.iter().find(|i| i.id == id).cloned())
    }

    async fn create(&self, new: NewInsight) -> anyhow::Result<Insight> {
        let insight = new.into_insight(OffsetDateTime::now_utc());
        let mut insights = self.insights.write().await;
        anyhow::ensure!(
            insights.iter().all(|i| i.id != insight.id),
            "insight {} already exists",
            insight.id
        );
        insights.push(insight.clone());
        Ok(insight)
    }

    async fn update(&self, id: Uuid, patch: &InsightPatch) -> anyhow::Result<Option<Insight>> {
        let mut insights = self.insights.write().await;
        let Some(insight) = insights.iter_mut().find(|i| i.id == id) else {
            return Ok(None);
        };
        patch.apply(insight, OffsetDateTime::now_utc());
        Ok(Some(insight.clone()))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut insights = self.insights.write().await;
        let before = insights.len();
        insights.retain(|i| i.id != id);
        Ok(insights.len() < before)
    }

    async fn analytics(&self, now: OffsetDateTime) -> anyhow::Result<Analytics> {
        let insights = self.insights.read().await;

        let mut count_by_source = BTreeMap::new();
        let mut count_by_author = BTreeMap::new();
        for insight in insights.iter() {
            if let Some(source) = insight.source {
                *count_by_source.entry(source).or_insert(0) += 1;
            }
            *count_by_author.entry(insight.author_id).or_insert(0) += 1;
        }

        let insights_per_week = week_windows(now)
            .into_iter()
            .map(|(week_start, week_end)| WeeklyCount {
                week_start,
                count: insights
                    .iter()
                    .filter(|i| i.created_at >= week_start && i.created_at < week_end)
                    .count() as i64,
            })
            .collect();

        Ok(Analytics {
            total_count: insights.len() as i64,
            count_by_source,
            count_by_author,
            insights_per_week,
        })
    }

    async fn list_all_for_export(&self) -> anyhow::Result<Vec<Insight>> {
        Ok(self.newest_first().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::repo_types::{Source, WEEKS};
    use time::Duration;

    fn new_insight(author_id: Uuid, title: &str) -> NewInsight {
        NewInsight {
            id: Uuid::new_v4(),
            author_id,
            title: title.into(),
            description: "description".into(),
            source: None,
            created_at: None,
        }
    }

    #[tokio::test]
    async fn create_stamps_equal_timestamps() {
        let store = MemoryInsightStore::new();
        let created = store.create(new_insight(Uuid::new_v4(), "a")).await.unwrap();
        assert_eq!(created.created_at, created.updated_at);
        assert_eq!(store.get(created.id).await.unwrap(), Some(created));
    }

    #[tokio::test]
    async fn create_keeps_given_created_at() {
        let store = MemoryInsightStore::new();
        let at = OffsetDateTime::now_utc() - Duration::days(3);
        let mut new = new_insight(Uuid::new_v4(), "old");
        new.created_at = Some(at);
        let created = store.create(new).await.unwrap();
        assert_eq!(created.created_at, at);
        assert_eq!(created.updated_at, at);
    }

    #[tokio::test]
    async fn list_is_newest_first_with_insertion_order_ties() {
        let store = MemoryInsightStore::new();
        let author = Uuid::new_v4();
        let t = OffsetDateTime::now_utc();

        let mut a = new_insight(author, "a");
        a.created_at = Some(t - Duration::minutes(2));
        let mut b = new_insight(author, "b");
        b.created_at = Some(t);
        let mut c = new_insight(author, "c");
        c.created_at = Some(t);
        for n in [a, b, c] {
            store.create(n).await.unwrap();
        }

        let (items, total) = store.list(20, 0).await.unwrap();
        assert_eq!(total, 3);
        let titles: Vec<_> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["b", "c", "a"]);

        let (page, total) = store.list(1, 1).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].title, "c");

        let export: Vec<_> = store.list_all_for_export().await.unwrap();
        assert_eq!(export, items);
    }

    #[tokio::test]
    async fn update_applies_patch_and_unknown_id_is_none() {
        let store = MemoryInsightStore::new();
        let mut new = new_insight(Uuid::new_v4(), "a");
        new.source = Some(Source::Meetup);
        let created = store.create(new).await.unwrap();

        let patch = InsightPatch {
            title: Some("renamed".into()),
            ..Default::default()
        };
        let updated = store.update(created.id, &patch).await.unwrap().unwrap();
        assert_eq!(updated.title, "renamed");
        assert_eq!(updated.description, created.description);
        assert_eq!(updated.source, Some(Source::Meetup));
        assert_eq!(updated.author_id, created.author_id);
        assert!(updated.updated_at > created.updated_at);

        assert!(store.update(Uuid::new_v4(), &patch).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_reports_whether_removed() {
        let store = MemoryInsightStore::new();
        let created = store.create(new_insight(Uuid::new_v4(), "a")).await.unwrap();
        assert!(store.delete(created.id).await.unwrap());
        assert!(!store.delete(created.id).await.unwrap());
        assert!(store.get(created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn analytics_on_empty_store() {
        let store = MemoryInsightStore::new();
        let analytics = store.analytics(OffsetDateTime::now_utc()).await.unwrap();
        assert_eq!(analytics.total_count, 0);
        assert!(analytics.count_by_source.is_empty());
        assert!(analytics.count_by_author.is_empty());
        assert_eq!(analytics.insights_per_week.len(), WEEKS);
        assert!(analytics.insights_per_week.iter().all(|w| w.count == 0));
    }

    #[tokio::test]
    async fn analytics_groups_and_buckets() {
        let store = MemoryInsightStore::new();
        let now = OffsetDateTime::now_utc();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let cases = [
            (alice, Some(Source::CommunityForum), now - Duration::days(1)),
            (alice, Some(Source::Conference), now - Duration::days(8)),
            (bob, Some(Source::CommunityForum), now - Duration::days(9)),
            (bob, None, now - Duration::weeks(9)),
        ];
        for (author, source, at) in cases {
            let mut new = new_insight(author, "t");
            new.source = source;
            new.created_at = Some(at);
            store.create(new).await.unwrap();
        }

        let analytics = store.analytics(now).await.unwrap();
        assert_eq!(analytics.total_count, 4);
        assert_eq!(
            analytics.count_by_source,
            BTreeMap::from([(Source::CommunityForum, 2), (Source::Conference, 1)])
        );
        assert_eq!(analytics.count_by_author, BTreeMap::from([(alice, 2), (bob, 2)]));

        let counts: Vec<i64> = analytics.insights_per_week.iter().map(|w| w.count).collect();
        assert_eq!(counts, [0, 0, 0, 0, 0, 0, 2, 1]);
        assert_eq!(analytics.insights_per_week[7].week_start, now - Duration::weeks(1));
    }
}
