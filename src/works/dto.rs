use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo_types::{PublicWork, Work, WorkFilter, WorkStatus};
use crate::response::Pagination;

#[derive(Debug, Deserialize)]
pub struct ListWorksQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub search: Option<String>,
    pub status: Option<String>,
}

impl ListWorksQuery {
    pub fn pagination(&self) -> Pagination {
        let d = Pagination::default();
        Pagination {
            page: self.page.unwrap_or(d.page),
            page_size: self.page_size.unwrap_or(d.page_size),
        }
    }

    /// Unknown statuses and blank searches are ignored rather than rejected.
    pub fn filter(&self) -> WorkFilter {
        WorkFilter {
            status: self
                .status
                .as_deref()
                .and_then(|s| s.trim().parse::<WorkStatus>().ok()),
            search: self
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateWorkRequest {
    pub title: String,
    #[serde(default)]
    pub content: Option<serde_json::Value>,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateWorkRequest {
    pub title: Option<String>,
    pub content: Option<serde_json::Value>,
    pub cover: Option<String>,
    pub status: Option<String>,
}

/// Content-only save from the editor.
#[derive(Debug, Deserialize)]
pub struct AutosaveRequest {
    pub content: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct WorkListItem {
    pub id: String,
    pub title: String,
    pub cover: Option<String>,
    pub status: WorkStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Work> for WorkListItem {
    fn from(w: Work) -> Self {
        Self {
            id: w.id.to_string(),
            status: w.status(),
            title: w.title,
            cover: w.cover,
            created_at: w.created_at,
            updated_at: w.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WorkDetails {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub content: serde_json::Value,
    pub cover: Option<String>,
    pub status: WorkStatus,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Work> for WorkDetails {
    fn from(w: Work) -> Self {
        Self {
            id: w.id.to_string(),
            user_id: w.user_id.to_string(),
            status: w.status(),
            title: w.title,
            content: w.content.0,
            cover: w.cover,
            published_at: w.published_at,
            created_at: w.created_at,
            updated_at: w.updated_at,
        }
    }
}

/// Author card shown on public works; nickname falls back to the username.
#[derive(Debug, Serialize)]
pub struct Author {
    pub id: String,
    pub nickname: String,
    pub avatar: Option<String>,
}

impl From<&PublicWork> for Author {
    fn from(p: &PublicWork) -> Self {
        Self {
            id: p.work.user_id.to_string(),
            nickname: p
                .author_nickname
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| p.author_username.clone()),
            avatar: p.author_avatar.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PublicWorkItem {
    pub id: String,
    pub title: String,
    pub cover: Option<String>,
    pub author: Author,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<PublicWork> for PublicWorkItem {
    fn from(p: PublicWork) -> Self {
        Self {
            author: Author::from(&p),
            id: p.work.id.to_string(),
            title: p.work.title,
            cover: p.work.cover,
            published_at: p.work.published_at,
            created_at: p.work.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PublicWorkDetails {
    #[serde(flatten)]
    pub work: WorkDetails,
    pub author: Author,
}

impl From<PublicWork> for PublicWorkDetails {
    fn from(p: PublicWork) -> Self {
        Self {
            author: Author::from(&p),
            work: p.work.into(),
        }
    }
}
