use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo_types::{ConsumptionRecord, KindRow};
use crate::response::Pagination;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub kind: Option<String>,
}

impl HistoryQuery {
    pub fn pagination(&self) -> Pagination {
        let d = Pagination::default();
        Pagination {
            page: self.page.unwrap_or(d.page),
            page_size: self.page_size.unwrap_or(d.page_size),
        }
    }

    /// Blank `kind` means no filter.
    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryItem {
    pub id: String,
    pub work_id: Option<String>,
    pub kind: String,
    pub amount: i64,
    pub description: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<ConsumptionRecord> for HistoryItem {
    fn from(r: ConsumptionRecord) -> Self {
        Self {
            id: r.id.to_string(),
            work_id: r.work_id.map(|id| id.to_string()),
            kind: r.kind,
            amount: r.amount,
            description: r.description,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct KindStats {
    pub kind: String,
    pub count: i64,
    pub amount: i64,
}

impl From<KindRow> for KindStats {
    fn from(r: KindRow) -> Self {
        Self {
            kind: r.kind,
            count: r.count,
            amount: r.amount,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConsumptionStats {
    pub total_count: i64,
    pub total_amount: i64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub first_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_at: Option<OffsetDateTime>,
    pub by_kind: Vec<KindStats>,
}
