use std::path::Path as FsPath;

use axum::{
    Json,
    extract::{Multipart, State},
    http::HeaderMap,
};
use rand::Rng;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::User;
use crate::services::token::verify_session_token;
use crate::state::AppState;

/// アップロード画像の最大サイズ（5MB）
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Authorization ヘッダーのBearerトークンを検証してユーザーIDを得る
fn bearer_user_id(state: &AppState, headers: &HeaderMap) -> Result<Uuid, AppError> {
    let token = headers
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Authentication("missing_token".to_string()))?;

    verify_session_token(token, state.config.jwt_secret.expose_secret())
}

// === プロフィール更新 ===

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdateProfileResponse {
    pub message: String,
    pub user: User,
}

/// プロフィール更新ハンドラー
///
/// POST /api/users/update-profile
///
/// 対象ユーザーはBearerトークンのsubで決まる（ボディのIDは信用しない）。
/// None のフィールドは変更しない部分更新
pub async fn update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<UpdateProfileResponse>, AppError> {
    let user_id = bearer_user_id(&state, &headers)?;
    validate_update_profile_request(&request)?;

    let user = state
        .user_repo
        .update_profile(
            user_id,
            request.name.as_deref(),
            request.username.as_deref(),
            request.email.as_deref(),
            request.phone_number.as_deref(),
            request.bio.as_deref(),
            request.profile_image.as_deref(),
        )
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("users_email_key") {
                    return AppError::EmailAlreadyExists;
                }
                if db_err.constraint() == Some("users_username_key") {
                    return AppError::Validation(
                        "このユーザー名は既に使用されています".to_string(),
                    );
                }
            }
            AppError::Database(e)
        })?
        .ok_or(AppError::NotFound("ユーザー"))?;

    tracing::info!(user_id = %user_id, "プロフィール更新成功");

    Ok(Json(UpdateProfileResponse {
        message: "プロフィールを更新しました".to_string(),
        user,
    }))
}

/// プロフィール更新リクエストのバリデーション
fn validate_update_profile_request(request: &UpdateProfileRequest) -> Result<(), AppError> {
    if let Some(email) = &request.email
        && (email.trim().is_empty() || !email.contains('@'))
    {
        return Err(AppError::Validation(
            "有効なメールアドレスを入力してください".to_string(),
        ));
    }
    if let Some(name) = &request.name
        && name.trim().is_empty()
    {
        return Err(AppError::Validation("名前は空にできません".to_string()));
    }
    Ok(())
}

// === プロフィール画像アップロード ===

#[derive(Debug, Serialize)]
pub struct UploadImageResponse {
    pub success: bool,
    pub image_url: String,
    pub message: String,
}

/// プロフィール画像アップロードハンドラー
///
/// POST /api/users/upload-image (multipart/form-data, フィールド名 "image")
///
/// image/* のみ受け付け、uploads ディレクトリに保存して
/// 公開URLをユーザー行に記録する。サイズ上限はルーター側の
/// DefaultBodyLimit とここでの長さチェックの両方で守る
pub async fn upload_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<UploadImageResponse>, AppError> {
    let user_id = bearer_user_id(&state, &headers)?;

    // 先にユーザーの存在を確認し、孤児ファイルを作らない
    state
        .user_repo
        .find_by_id(user_id)
        .await?
        .ok_or(AppError::NotFound("ユーザー"))?;

    let mut saved: Option<(String, usize)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!(error = ?e, "multipart読み取りエラー");
        AppError::Validation("アップロードデータが不正です".to_string())
    })? {
        if field.name() != Some("image") {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !content_type.starts_with("image/") {
            return Err(AppError::Validation(
                "画像ファイルのみアップロードできます".to_string(),
            ));
        }

        let extension = field
            .file_name()
            .and_then(|name| FsPath::new(name).extension())
            .and_then(|ext| ext.to_str())
            .unwrap_or("jpg")
            .to_string();

        let bytes = field.bytes().await.map_err(|e| {
            tracing::warn!(error = ?e, "アップロード本文の読み取りエラー");
            AppError::Validation("アップロードデータが不正です".to_string())
        })?;

        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(AppError::Validation(
                "画像サイズは5MB以下にしてください".to_string(),
            ));
        }

        let filename = build_image_filename(user_id, &extension);
        let file_path = FsPath::new(&state.config.uploads_dir).join(&filename);

        tokio::fs::write(&file_path, &bytes).await.map_err(|e| {
            tracing::error!(error = ?e, path = %file_path.display(), "画像の保存に失敗");
            AppError::Internal(anyhow::anyhow!("failed to write uploaded image"))
        })?;

        saved = Some((filename, bytes.len()));
        break;
    }

    let (filename, size) = saved.ok_or_else(|| {
        AppError::Validation("画像ファイルが含まれていません".to_string())
    })?;

    let image_url = format!("{}/uploads/{}", public_base_url(&state), filename);

    state
        .user_repo
        .set_profile_image(user_id, &image_url)
        .await?
        .ok_or(AppError::NotFound("ユーザー"))?;

    tracing::info!(user_id = %user_id, bytes = size, "プロフィール画像アップロード成功");

    Ok(Json(UploadImageResponse {
        success: true,
        image_url,
        message: "プロフィール画像をアップロードしました".to_string(),
    }))
}

/// 公開URLのベースを返す（設定がなければ host:port から組み立て）
fn public_base_url(state: &AppState) -> String {
    match &state.config.public_base_url {
        Some(base) => base.trim_end_matches('/').to_string(),
        None => format!("http://{}:{}", state.config.host, state.config.port),
    }
}

/// 衝突しない画像ファイル名を組み立てる
fn build_image_filename(user_id: Uuid, extension: &str) -> String {
    let suffix: u32 = rand::thread_rng().r#gen();
    format!(
        "profile_{}_{}-{}.{}",
        user_id,
        OffsetDateTime::now_utc().unix_timestamp(),
        suffix,
        extension
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_update_profile_rejects_bad_email() {
        let request = UpdateProfileRequest {
            name: None,
            username: None,
            email: Some("invalid-email".to_string()),
            phone_number: None,
            bio: None,
            profile_image: None,
        };
        assert!(validate_update_profile_request(&request).is_err());
    }

    #[test]
    fn test_validate_update_profile_allows_partial() {
        let request = UpdateProfileRequest {
            name: None,
            username: Some("foodie".to_string()),
            email: None,
            phone_number: None,
            bio: Some("ラーメン好き".to_string()),
            profile_image: None,
        };
        assert!(validate_update_profile_request(&request).is_ok());
    }

    #[test]
    fn test_build_image_filename_shape() {
        let user_id = Uuid::new_v4();
        let name = build_image_filename(user_id, "png");
        assert!(name.starts_with(&format!("profile_{}_", user_id)));
        assert!(name.ends_with(".png"));
    }
}
