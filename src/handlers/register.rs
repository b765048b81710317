use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;
use crate::services::auth::hash_password;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String, // SecretBox不要（Deserialize後すぐハッシュ化）
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// ユーザー登録ハンドラー
///
/// POST /api/auth/register
///
/// # Security
/// - パスワードはログに出力しない
/// - パスワードは即座にハッシュ化
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, AppError> {
    validate_register_request(&request, state.config.password_min_len)?;

    let password_hash = hash_password(&request.password)?;

    let user = state
        .user_repo
        .create_user(&request.name, &request.email, &password_hash)
        .await
        .map_err(|e| {
            // UNIQUE制約違反チェック
            if let sqlx::Error::Database(db_err) = &e
                && db_err.constraint() == Some("users_email_key")
            {
                return AppError::EmailAlreadyExists;
            }
            AppError::Database(e)
        })?;

    tracing::info!(email = %request.email, "ユーザー登録成功");

    Ok(Json(RegisterResponse {
        id: user.id,
        name: user.name,
        email: user.email,
        created_at: user.created_at,
    }))
}

/// 登録リクエストのバリデーション
fn validate_register_request(
    request: &RegisterRequest,
    password_min_len: usize,
) -> Result<(), AppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("名前は必須です".to_string()));
    }
    if request.email.trim().is_empty() {
        return Err(AppError::Validation("メールアドレスは必須です".to_string()));
    }
    if !request.email.contains('@') {
        return Err(AppError::Validation(
            "有効なメールアドレスを入力してください".to_string(),
        ));
    }
    if request.password.len() < password_min_len {
        return Err(AppError::Validation(format!(
            "パスワードは{}文字以上で入力してください",
            password_min_len
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_validate_empty_name() {
        let result = validate_register_request(&request("", "test@example.com", "password123"), 8);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_empty_email() {
        let result = validate_register_request(&request("太郎", "", "password123"), 8);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_invalid_email() {
        let result =
            validate_register_request(&request("太郎", "invalid-email", "password123"), 8);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_short_password() {
        let result = validate_register_request(&request("太郎", "test@example.com", "short"), 8);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_valid_request() {
        let result =
            validate_register_request(&request("太郎", "test@example.com", "password123"), 8);
        assert!(result.is_ok());
    }
}
