use sqlx::FromRow;
use time::OffsetDateTime;

/// Kind recorded when a work is created.
pub const KIND_WORK_CREATE: &str = "work_create";

#[derive(Debug, Clone, FromRow)]
pub struct ConsumptionRecord {
    pub id: i64,
    pub user_id: i64,
    pub work_id: Option<i64>,
    pub kind: String,
    pub amount: i64,
    pub description: Option<String>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewConsumption<'a> {
    pub user_id: i64,
    pub work_id: Option<i64>,
    pub kind: &'a str,
    pub amount: i64,
    pub description: Option<&'a str>,
}

#[derive(Debug, Clone, FromRow)]
pub struct TotalsRow {
    pub total_count: i64,
    pub total_amount: i64,
    pub first_at: Option<OffsetDateTime>,
    pub last_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, FromRow)]
pub struct KindRow {
    pub kind: String,
    pub count: i64,
    pub amount: i64,
}
