use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "block_source", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BlockSource {
    /// Entered by an admin
    Manual,
    /// Imported from an external calendar feed
    External,
}

/// Dates a room cannot be booked, `[start_date, end_date)`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BlockedDate {
    pub id: Uuid,
    pub room_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: Option<String>,
    pub source: BlockSource,
    pub external_uid: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBlockedDateRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SyncResult {
    pub room_id: Uuid,
    pub imported: usize,
    pub error: Option<String>,
}
