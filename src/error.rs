use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("認証エラー: {0}")]
    Authentication(String),

    #[error("バリデーションエラー: {0}")]
    Validation(String),

    #[error("データベースエラー")]
    Database(#[from] sqlx::Error),

    #[error("プレイスAPI エラー")]
    Places(#[from] reqwest::Error),

    #[error("内部エラー")]
    Internal(#[from] anyhow::Error),

    #[error("このメールアドレスは既に使用されています")]
    EmailAlreadyExists,

    #[error("{0} が見つかりません")]
    NotFound(&'static str),

    #[error("確認コードが無効または期限切れです")]
    InvalidOrExpiredChallenge,

    #[error("メール送信に失敗しました")]
    DeliveryFailed,

    #[error("プレイスAPI が設定されていません")]
    PlacesUnconfigured,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Authentication(_) => (
                StatusCode::UNAUTHORIZED,
                "メールアドレスまたはパスワードが正しくありません".to_string(),
            ),
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Database(e) => {
                tracing::error!(error = ?e, "データベースエラー");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "内部エラーが発生しました".to_string(),
                )
            }
            Self::Internal(e) => {
                tracing::error!(error = ?e, "内部エラー");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "内部エラーが発生しました".to_string(),
                )
            }
            Self::Places(e) => {
                tracing::error!(error = ?e, "プレイスAPI通信エラー");
                (
                    StatusCode::BAD_GATEWAY,
                    "外部プレイスサービスとの通信に失敗しました".to_string(),
                )
            }
            Self::EmailAlreadyExists => (
                StatusCode::CONFLICT,
                "このメールアドレスは既に使用されています".to_string(),
            ),
            Self::NotFound(what) => (
                StatusCode::NOT_FOUND,
                format!("{} が見つかりません", what),
            ),
            Self::InvalidOrExpiredChallenge => (
                StatusCode::BAD_REQUEST,
                "確認コードが無効または期限切れです".to_string(),
            ),
            // 永続化失敗とは区別して返す（呼び出し側が再送UIを出せるように）
            Self::DeliveryFailed => (
                StatusCode::BAD_GATEWAY,
                "確認メールの送信に失敗しました。しばらくしてから再試行してください".to_string(),
            ),
            Self::PlacesUnconfigured => (
                StatusCode::SERVICE_UNAVAILABLE,
                "外部プレイスサービスが利用できません".to_string(),
            ),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
