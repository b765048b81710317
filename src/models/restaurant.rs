use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// レストラン
///
/// ローカル登録と外部プレイスAPI由来の両方を1テーブルで持つ。
/// 外部由来の行は place_id で一意（ローカル登録ではNULL）。
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Restaurant {
    pub id: Uuid,
    pub name: String,
    pub cuisine: String,
    pub address: String,
    pub description: Option<String>,
    pub price_range: String,
    pub rating: f64,
    pub image: String,
    pub latitude: f64,
    pub longitude: f64,
    pub place_id: Option<String>,
    pub vicinity: Option<String>,
    /// 近傍検索時のみ埋まる距離（メートル）
    #[sqlx(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// レストラン新規登録の入力（DB挿入用）
#[derive(Debug, Clone)]
pub struct NewRestaurant {
    pub name: String,
    pub cuisine: String,
    pub address: String,
    pub description: Option<String>,
    pub price_range: String,
    pub rating: f64,
    pub image: String,
    pub latitude: f64,
    pub longitude: f64,
    pub place_id: Option<String>,
    pub vicinity: Option<String>,
}
