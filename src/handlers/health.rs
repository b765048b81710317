use axum::{Json, extract::State};
use serde::Serialize;
use time::OffsetDateTime;

use crate::state::AppState;

/// ヘルスチェックレスポンス
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub database: &'static str,
}

/// ヘルスチェックハンドラー
///
/// GET /api/healthcheck
///
/// サービスの稼働状況とDB接続状態を返す。
/// ロードバランサーやモニタリングツールから呼び出される。
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match sqlx::query("SELECT 1").execute(&state.db_pool).await {
        Ok(_) => "connected",
        Err(e) => {
            tracing::warn!(error = ?e, "ヘルスチェック: DB接続失敗");
            "disconnected"
        }
    };

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: OffsetDateTime::now_utc(),
        database,
    })
}
