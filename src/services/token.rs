use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;

/// セッショントークンのクレーム
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// ユーザーID
    pub sub: String,
    /// 発行時刻（UNIX秒）
    pub iat: i64,
    /// 失効時刻（UNIX秒）
    pub exp: i64,
}

/// ログインセッショントークン（HS256 JWT）を発行
pub fn issue_session_token(
    user_id: Uuid,
    secret: &str,
    ttl_secs: i64,
) -> Result<String, AppError> {
    let now = OffsetDateTime::now_utc().unix_timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + ttl_secs,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| {
        tracing::error!(error = ?e, "セッショントークン発行エラー");
        AppError::Internal(anyhow::anyhow!("token encode error"))
    })
}

/// セッショントークンを検証し、ユーザーIDを返す
pub fn verify_session_token(token: &str, secret: &str) -> Result<Uuid, AppError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::warn!(error = ?e, "セッショントークン検証失敗");
        AppError::Authentication("invalid_token".to_string())
    })?;

    data.claims
        .sub
        .parse()
        .map_err(|_| AppError::Authentication("invalid_token".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-for-unit-tests";

    #[test]
    fn test_issue_then_verify_roundtrip() {
        let user_id = Uuid::new_v4();
        let token = issue_session_token(user_id, SECRET, 3600).unwrap();
        let verified = verify_session_token(&token, SECRET).unwrap();
        assert_eq!(verified, user_id);
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let token = issue_session_token(Uuid::new_v4(), SECRET, 3600).unwrap();
        let result = verify_session_token(&token, "another-secret");
        assert!(result.is_err());
    }

    #[test]
    fn test_verify_rejects_expired_token() {
        // 失効済み（exp が過去）のトークンは拒否される
        let token = issue_session_token(Uuid::new_v4(), SECRET, -120).unwrap();
        let result = verify_session_token(&token, SECRET);
        assert!(result.is_err());
    }

    #[test]
    fn test_verify_rejects_garbage() {
        let result = verify_session_token("not-a-jwt", SECRET);
        assert!(result.is_err());
    }
}
