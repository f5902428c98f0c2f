use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WorkStatus {
    #[default]
    Private,
    Public,
    Draft,
}

impl WorkStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkStatus::Private => "private",
            WorkStatus::Public => "public",
            WorkStatus::Draft => "draft",
        }
    }
}

impl fmt::Display for WorkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(WorkStatus::Private),
            "public" => Ok(WorkStatus::Public),
            "draft" => Ok(WorkStatus::Draft),
            other => Err(format!("unknown work status: {other}")),
        }
    }
}

/// Work record in the database; `content` is the collage layout as JSON.
#[derive(Debug, Clone, FromRow)]
pub struct Work {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: Json<serde_json::Value>,
    pub cover: Option<String>,
    pub status: String,
    pub published_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Work {
    pub fn status(&self) -> WorkStatus {
        self.status.parse().unwrap_or_default()
    }

    /// Stored values as write fields, ready to be partially overridden.
    pub fn into_fields(self) -> WorkFields {
        WorkFields {
            status: self.status(),
            title: self.title,
            content: self.content.0,
            cover: self.cover,
            published_at: self.published_at,
        }
    }
}

/// Public work joined with its author's card.
#[derive(Debug, Clone, FromRow)]
pub struct PublicWork {
    #[sqlx(flatten)]
    pub work: Work,
    pub author_username: String,
    pub author_nickname: Option<String>,
    pub author_avatar: Option<String>,
}

/// Values written by create/update.
#[derive(Debug, Clone)]
pub struct WorkFields {
    pub title: String,
    pub content: serde_json::Value,
    pub cover: Option<String>,
    pub status: WorkStatus,
    pub published_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Default)]
pub struct WorkFilter {
    pub status: Option<WorkStatus>,
    pub search: Option<String>,
}
