use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::ChallengeState;
use crate::services::PasswordResetService;
use crate::state::AppState;

// === リセットリクエスト（チャレンジ発行） ===

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct ForgotPasswordResponse {
    pub accepted: bool,
    pub message: String,
}

/// POST /api/auth/forgot-password
///
/// # Security
/// ユーザーの存在有無にかかわらず同じ成功レスポンスを返す（列挙防止）。
/// 形式チェックは非空のみ。形式で弾くと登録済みアドレスの形式が
/// 推測できてしまうため、未登録はすべてサービス層で同じ成功に落とす。
/// メール送信失敗のみ `DeliveryFailed` として区別して返す
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(request): Json<ForgotPasswordRequest>,
) -> Result<Json<ForgotPasswordResponse>, AppError> {
    validate_identity_present(&request.email)?;

    let service = PasswordResetService::new(
        state.user_repo.clone(),
        state.email_service.clone(),
        state.config.clone(),
    );
    service.request_reset(&request.email).await?;

    Ok(Json(ForgotPasswordResponse {
        accepted: true,
        message: "登録されたメールアドレスに確認コードを送信しました".to_string(),
    }))
}

// === チャレンジ検証（読み取りのみ） ===

#[derive(Debug, Deserialize)]
pub struct ValidateOtpRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateOtpResponse {
    pub valid: bool,
    pub reason: String,
}

/// POST /api/auth/validate-otp
///
/// 状態を変更しない。検証結果と人間可読な理由を返す。
/// 形式不正なコードもエラーにせず valid=false（不一致）として答える
pub async fn validate_otp(
    State(state): State<AppState>,
    Json(request): Json<ValidateOtpRequest>,
) -> Result<Json<ValidateOtpResponse>, AppError> {
    let service = PasswordResetService::new(
        state.user_repo.clone(),
        state.email_service.clone(),
        state.config.clone(),
    );
    let challenge_state = service
        .validate_challenge(&request.email, &request.otp)
        .await?;

    Ok(Json(ValidateOtpResponse {
        valid: challenge_state == ChallengeState::Valid,
        reason: challenge_state.reason().to_string(),
    }))
}

// === チャレンジ消費（パスワードリセット実行） ===

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub otp: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct ResetPasswordResponse {
    pub done: bool,
    pub message: String,
}

/// POST /api/auth/reset-password
///
/// # Security
/// - otp, new_password はログに出力しない
/// - 照合・更新・チャレンジ破棄は永続化層で原子的に行う
pub async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<ResetPasswordResponse>, AppError> {
    validate_email(&request.email)?;
    validate_otp_format(&request.otp)?;
    if request.new_password.len() < state.config.password_min_len {
        return Err(AppError::Validation(format!(
            "パスワードは{}文字以上で入力してください",
            state.config.password_min_len
        )));
    }

    let service = PasswordResetService::new(
        state.user_repo.clone(),
        state.email_service.clone(),
        state.config.clone(),
    );
    service
        .consume_challenge(&request.email, &request.otp, &request.new_password)
        .await?;

    Ok(Json(ResetPasswordResponse {
        done: true,
        message: "パスワードが更新されました".to_string(),
    }))
}

/// リセット対象IDの非空チェック（形式は検査しない）
fn validate_identity_present(email: &str) -> Result<(), AppError> {
    if email.trim().is_empty() {
        return Err(AppError::Validation(
            "メールアドレスを入力してください".to_string(),
        ));
    }
    Ok(())
}

/// メールアドレスのバリデーション
fn validate_email(email: &str) -> Result<(), AppError> {
    if email.trim().is_empty() || !email.contains('@') {
        return Err(AppError::Validation(
            "有効なメールアドレスを入力してください".to_string(),
        ));
    }
    Ok(())
}

/// ワンタイムコードの形式チェック（6桁数字）
fn validate_otp_format(otp: &str) -> Result<(), AppError> {
    if otp.len() != 6 || !otp.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(
            "確認コードは6桁の数字です".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identity_rejects_empty() {
        assert!(validate_identity_present("").is_err());
        assert!(validate_identity_present("   ").is_err());
    }

    /// 発行入口は非空のみ。形式で弾かない（未登録はサービス層で同じ成功になる）
    #[test]
    fn test_validate_identity_accepts_any_nonempty() {
        assert!(validate_identity_present("a@example.com").is_ok());
        assert!(validate_identity_present("not-an-address").is_ok());
    }

    #[test]
    fn test_validate_empty_email() {
        assert!(validate_email("").is_err());
    }

    #[test]
    fn test_validate_invalid_email() {
        assert!(validate_email("invalid-email").is_err());
    }

    #[test]
    fn test_validate_valid_email() {
        assert!(validate_email("a@example.com").is_ok());
    }

    #[test]
    fn test_validate_otp_format_accepts_six_digits() {
        assert!(validate_otp_format("482913").is_ok());
    }

    #[test]
    fn test_validate_otp_format_rejects_short_code() {
        assert!(validate_otp_format("4829").is_err());
    }

    #[test]
    fn test_validate_otp_format_rejects_non_digits() {
        assert!(validate_otp_format("48a913").is_err());
        assert!(validate_otp_format("４８２９１３").is_err()); // 全角は不可
    }
}
