use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct UsageRecord {
    pub user_id: Uuid,
    pub metric: String,
    pub count: i64,
    pub period_reset_at: DateTime<Utc>,
}
