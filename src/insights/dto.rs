use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Insight, InsightPatch, Source};
use crate::error::AppError;

pub const TITLE_MAX_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
pub struct InsightCreate {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub source: Option<Source>,
}

/// PUT body. Absent and `null` fields both mean "leave unchanged".
#[derive(Debug, Default, Deserialize)]
pub struct InsightUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source: Option<Source>,
}

fn check_title(title: &str) -> Result<(), AppError> {
    if title.trim().is_empty() {
        return Err(AppError::Validation("title: Title cannot be empty".into()));
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err(AppError::Validation(format!(
            "title: String should have at most {TITLE_MAX_CHARS} characters"
        )));
    }
    Ok(())
}

fn check_description(description: &str) -> Result<(), AppError> {
    if description.trim().is_empty() {
        return Err(AppError::Validation(
            "description: Description cannot be empty".into(),
        ));
    }
    Ok(())
}

impl InsightCreate {
    pub fn validate(&self) -> Result<(), AppError> {
        check_title(&self.title)?;
        check_description(&self.description)
    }
}

impl InsightUpdate {
    pub fn into_patch(self) -> Result<InsightPatch, AppError> {
        if let Some(title) = &self.title {
            check_title(title)?;
        }
        if let Some(description) = &self.description {
            check_description(description)?;
        }
        Ok(InsightPatch {
            title: self.title,
            description: self.description,
            source: self.source,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct InsightResponse {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub description: String,
    pub source: Option<Source>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Insight> for InsightResponse {
    fn from(i: Insight) -> Self {
        Self {
            id: i.id,
            author_id: i.author_id,
            title: i.title,
            description: i.description,
            source: i.source,
            created_at: i.created_at,
            updated_at: i.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InsightListResponse {
    pub items: Vec<InsightResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}
fn default_limit() -> i64 { 20 }

impl Pagination {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.limit < 0 || self.offset < 0 {
            return Err(AppError::Validation(
                "limit and offset must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub message: &'static str,
    pub exported_count: usize,
}
