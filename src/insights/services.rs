use std::sync::Arc;

use axum::extract::FromRef;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::InsightCreate,
    repo::InsightStore,
    repo_types::{Analytics, Insight, InsightPatch, NewInsight},
};
use crate::{
    auth::repo_types::User,
    error::{AppError, AppResult},
    state::AppState,
};

/// CRUD over the insight store with the ownership rule: only the author may
/// update or delete an insight.
#[derive(Clone)]
pub struct InsightService {
    store: Arc<dyn InsightStore>,
}

impl FromRef<AppState> for InsightService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.insights.clone())
    }
}

impl InsightService {
    pub fn new(store: Arc<dyn InsightStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, limit: i64, offset: i64) -> AppResult<(Vec<Insight>, i64)> {
        Ok(self.store.list(limit, offset).await?)
    }

    pub async fn create(&self, data: InsightCreate, acting: &User) -> AppResult<Insight> {
        data.validate()?;
        let created = self
            .store
            .create(NewInsight {
                id: Uuid::new_v4(),
                author_id: acting.id,
                title: data.title,
                description: data.description,
                source: data.source,
                created_at: None,
            })
            .await?;
        info!(operation = "create", insight_id = %created.id, user_id = %acting.id, "insight created");
        Ok(created)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Insight> {
        self.store.get(id).await?.ok_or(AppError::NotFound)
    }

    /// Loads the insight and checks that `acting` wrote it.
    async fn owned(&self, id: Uuid, acting: &User, operation: &'static str) -> AppResult<Insight> {
        let insight = self.get(id).await?;
        if insight.author_id != acting.id {
            warn!(
                operation,
                user_id = %acting.id,
                insight_id = %id,
                owner_id = %insight.author_id,
                "authorization denied"
            );
            return Err(AppError::Forbidden);
        }
        Ok(insight)
    }

    pub async fn update(&self, id: Uuid, patch: InsightPatch, acting: &User) -> AppResult<Insight> {
        self.owned(id, acting, "update").await?;
        // A concurrent delete between the ownership check and the write is a 404.
        let updated = self.store.update(id, &patch).await?.ok_or(AppError::NotFound)?;
        info!(operation = "update", insight_id = %id, user_id = %acting.id, "insight updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid, acting: &User) -> AppResult<()> {
        self.owned(id, acting, "delete").await?;
        if !self.store.delete(id).await? {
            return Err(AppError::NotFound);
        }
        info!(operation = "delete", insight_id = %id, user_id = %acting.id, "insight deleted");
        Ok(())
    }

    pub async fn analytics(&self) -> AppResult<Analytics> {
        Ok(self.store.analytics(OffsetDateTime::now_utc()).await?)
    }
}
