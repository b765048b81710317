use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// フードカタログのアイテム
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Food {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub cuisine: String,
    pub calories: i32,
    pub image: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
