use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// Number of weekly buckets reported by analytics.
pub const WEEKS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    CommunityForum,
    Conference,
    SocialMedia,
    Meetup,
    Other,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::CommunityForum => "community_forum",
            Source::Conference => "conference",
            Source::SocialMedia => "social_media",
            Source::Meetup => "meetup",
            Source::Other => "other",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "community_forum" => Ok(Source::CommunityForum),
            "conference" => Ok(Source::Conference),
            "social_media" => Ok(Source::SocialMedia),
            "meetup" => Ok(Source::Meetup),
            "other" => Ok(Source::Other),
            other => anyhow::bail!("unknown insight source {other:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insight {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub description: String,
    pub source: Option<Source>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Insight record in the database.
#[derive(Debug, FromRow)]
pub struct InsightRow {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub description: String,
    pub source: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<InsightRow> for Insight {
    type Error = anyhow::Error;

    fn try_from(r: InsightRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            author_id: r.author_id,
            title: r.title,
            description: r.description,
            source: r.source.as_deref().map(str::parse).transpose()?,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// Input to `InsightStore::create`. Timestamps default to now.
#[derive(Debug, Clone)]
pub struct NewInsight {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub description: String,
    pub source: Option<Source>,
    pub created_at: Option<OffsetDateTime>,
}

impl NewInsight {
    pub fn into_insight(self, now: OffsetDateTime) -> Insight {
        let created_at = self.created_at.unwrap_or(now);
        Insight {
            id: self.id,
            author_id: self.author_id,
            title: self.title,
            description: self.description,
            source: self.source,
            created_at,
            updated_at: created_at,
        }
    }
}

/// Partial update. `None` leaves the field unchanged, so a field can't be
/// cleared through a patch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsightPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub source: Option<Source>,
}

impl InsightPatch {
    pub fn apply(&self, insight: &mut Insight, now: OffsetDateTime) {
        if let Some(title) = &self.title {
            insight.title = title.clone();
        }
        if let Some(description) = &self.description {
            insight.description = description.clone();
        }
        if let Some(source) = self.source {
            insight.source = Some(source);
        }
        insight.updated_at = next_updated_at(insight.updated_at, now);
    }
}

/// `updated_at` must move forward on every update, even within one clock tick.
/// One microsecond is the database's timestamp resolution.
pub fn next_updated_at(previous: OffsetDateTime, now: OffsetDateTime) -> OffsetDateTime {
    let floor = previous + Duration::microseconds(1);
    if now < floor {
        floor
    } else {
        now
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeeklyCount {
    #[serde(with = "time::serde::rfc3339")]
    pub week_start: OffsetDateTime,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Analytics {
    pub total_count: i64,
    /// Sources with no insights are absent.
    pub count_by_source: BTreeMap<Source, i64>,
    pub count_by_author: BTreeMap<Uuid, i64>,
    /// Oldest week first.
    pub insights_per_week: Vec<WeeklyCount>,
}

/// Half-open `[start, end)` windows of seven days ending at `now`, oldest first.
pub fn week_windows(now: OffsetDateTime) -> Vec<(OffsetDateTime, OffsetDateTime)> {
    (0..WEEKS as i64)
        .rev()
        .map(|k| (now - Duration::weeks(k + 1), now - Duration::weeks(k)))
        .collect()
}
