use std::sync::Arc;

use rand::Rng;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};

use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;
use crate::models::{ChallengeState, User};
use crate::repositories::UserRepository;
use crate::services::{EmailService, auth::hash_password};

/// ワンタイムコードの範囲（6桁固定幅）
const OTP_MIN: u32 = 100_000;
const OTP_MAX: u32 = 999_999;

/// 6桁のワンタイムコードをCSPRNGで一様に生成
pub fn generate_otp() -> String {
    OsRng.gen_range(OTP_MIN..=OTP_MAX).to_string()
}

/// チャレンジ値をSHA256でハッシュ化（16進小文字）
///
/// DBにはハッシュのみ保存する。照合もハッシュ同士の等値比較で行うため、
/// 平文コード長に依存しない定形比較になる
pub fn hash_challenge(challenge: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(challenge.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// 発行されたチャレンジ（送信用の平文コードと、保存用のハッシュ・期限）
#[derive(Debug)]
pub struct IssuedChallenge {
    pub otp: String,
    pub challenge_hash: String,
    pub expires_at: OffsetDateTime,
}

/// チャレンジ発行の判断
///
/// ユーザー不在なら None を返し、書き込みも送信も一切行わない
/// （存在有無の漏洩防止）。存在すれば新しいコードを生成し、
/// 保存すべきハッシュと期限を返す
pub fn issue_challenge(
    user: Option<&User>,
    now: OffsetDateTime,
    ttl: Duration,
) -> Option<(Uuid, IssuedChallenge)> {
    let user = user?;
    let otp = generate_otp();
    let challenge_hash = hash_challenge(&otp);
    Some((
        user.id,
        IssuedChallenge {
            otp,
            challenge_hash,
            expires_at: now + ttl,
        },
    ))
}

/// 送信失敗後の後始末の結果を吸収し、必ず `DeliveryFailed` を返す
///
/// チャレンジ破棄に失敗してもログに残すだけで、送信失敗という
/// 本来のシグナルを別のエラーで上書きしない
fn delivery_failed_after_cleanup(cleanup: Result<(), sqlx::Error>, email: &str) -> AppError {
    if let Err(e) = cleanup {
        tracing::error!(error = ?e, email = %email, "送信失敗後のチャレンジ破棄に失敗");
    }
    AppError::DeliveryFailed
}

/// パスワードリセットサービス
///
/// チャレンジ（ワンタイムコード）のライフサイクルを管理する:
/// 発行 → 検証（読み取りのみ）→ 消費（パスワード更新と同時にNULL化）。
/// 同一ユーザーへの再発行は旧チャレンジを即時無効化する。
#[derive(Clone)]
pub struct PasswordResetService {
    user_repo: UserRepository,
    email_service: EmailService,
    config: Arc<Config>,
}

impl PasswordResetService {
    /// 新しい PasswordResetService を作成
    pub fn new(
        user_repo: UserRepository,
        email_service: EmailService,
        config: Arc<Config>,
    ) -> Self {
        Self {
            user_repo,
            email_service,
            config,
        }
    }

    /// パスワードリセットをリクエスト（チャレンジ発行）
    ///
    /// # Security
    /// - ユーザーが存在しない場合も書き込み・送信なしで成功を返す（存在有無の漏洩防止）
    /// - 平文コードはログに出力しない
    ///
    /// # Errors
    /// メール送信失敗は `DeliveryFailed` として返す。このときチャレンジは
    /// 既に永続化済みで、`reset_rollback_on_delivery_failure` が true の
    /// 場合のみ破棄する（デフォルトは残す＝再送許容）
    pub async fn request_reset(&self, email: &str) -> Result<(), AppError> {
        tracing::info!(email = %email, "パスワードリセットリクエスト");

        let user = self.user_repo.find_by_email(email).await?;
        let now = OffsetDateTime::now_utc();
        let ttl = Duration::seconds(self.config.reset_otp_ttl_secs);

        let Some((user_id, issued)) = issue_challenge(user.as_ref(), now, ttl) else {
            // 内部ログにのみ不在を記録し、呼び出し側には成功と同じ形を返す
            tracing::info!(email = %email, "パスワードリセット: ユーザー不在（成功レスポンス返却）");
            return Ok(());
        };

        // 書き込みは1回。既存チャレンジがあれば上書き＝即時無効化
        self.user_repo
            .store_reset_challenge(user_id, &issued.challenge_hash, issued.expires_at)
            .await?;

        // 送信も1回。失敗しても自動リトライはしない
        if let Err(e) = self.email_service.send_reset_code(email, &issued.otp).await {
            if self.config.reset_rollback_on_delivery_failure {
                tracing::warn!(email = %email, "送信失敗のためチャレンジを破棄");
                let cleanup = self.user_repo.clear_reset_challenge(user_id).await;
                return Err(delivery_failed_after_cleanup(cleanup, email));
            }
            return Err(e);
        }

        tracing::info!(email = %email, "パスワードリセットコード送信完了");
        Ok(())
    }

    /// チャレンジを検証（状態を変更しない読み取り専用）
    ///
    /// 存在しないユーザーは「発行済みチャレンジなし」と同じ結果になる
    pub async fn validate_challenge(
        &self,
        email: &str,
        challenge: &str,
    ) -> Result<ChallengeState, AppError> {
        let presented_hash = hash_challenge(challenge);
        let now = OffsetDateTime::now_utc();

        let state = match self.user_repo.find_by_email(email).await? {
            Some(user) => user.challenge_state(&presented_hash, now),
            None => ChallengeState::NoneOutstanding,
        };

        tracing::debug!(email = %email, state = ?state, "チャレンジ検証");
        Ok(state)
    }

    /// チャレンジを消費してパスワードを更新
    ///
    /// 照合と更新は単一の条件付きUPDATEで行うため、検証後に期限が切れる
    /// レースでも古いチャレンジで更新されることはない。成功後、同じ
    /// チャレンジは二度と検証を通らない（ワンタイム保証）
    pub async fn consume_challenge(
        &self,
        email: &str,
        challenge: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        let challenge_hash = hash_challenge(challenge);
        let new_password_hash = hash_password(new_password)?;
        let now = OffsetDateTime::now_utc();

        let updated = self
            .user_repo
            .consume_reset_challenge(email, &challenge_hash, &new_password_hash, now)
            .await?;

        if updated == 0 {
            tracing::warn!(email = %email, "チャレンジ消費失敗: 不一致または期限切れ");
            return Err(AppError::InvalidOrExpiredChallenge);
        }

        tracing::info!(email = %email, "パスワードリセット完了");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth::verify_password;

    #[test]
    fn test_generate_otp_is_six_digits_in_range() {
        for _ in 0..200 {
            let otp = generate_otp();
            assert_eq!(otp.len(), 6);
            let value: u32 = otp.parse().unwrap();
            assert!((OTP_MIN..=OTP_MAX).contains(&value));
        }
    }

    #[test]
    fn test_hash_challenge_is_deterministic_hex() {
        let h1 = hash_challenge("482913");
        let h2 = hash_challenge("482913");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
        assert!(h1.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(hash_challenge("482913"), hash_challenge("482914"));
    }

    /// 不在IDへの発行判断は no-op: 書き込みも送信も発生しない（列挙防止）
    #[test]
    fn test_issue_challenge_absent_identity_is_noop() {
        let now = OffsetDateTime::now_utc();
        assert!(issue_challenge(None, now, Duration::seconds(600)).is_none());
    }

    /// 存在するユーザーには新規コードと保存用ハッシュ・期限が発行される
    #[test]
    fn test_issue_challenge_for_known_user() {
        let now = OffsetDateTime::now_utc();
        let user = user_for_scenario(now);

        let (user_id, issued) =
            issue_challenge(Some(&user), now, Duration::seconds(600)).unwrap();

        assert_eq!(user_id, user.id);
        assert_eq!(issued.otp.len(), 6);
        assert_eq!(issued.challenge_hash, hash_challenge(&issued.otp));
        assert_eq!(issued.expires_at, now + Duration::seconds(600));
    }

    /// 送信失敗時は破棄の成否にかかわらず DeliveryFailed を返す
    #[test]
    fn test_delivery_failure_signal_survives_cleanup_error() {
        let err = delivery_failed_after_cleanup(Err(sqlx::Error::RowNotFound), "a@example.com");
        assert!(matches!(err, AppError::DeliveryFailed));

        let err = delivery_failed_after_cleanup(Ok(()), "a@example.com");
        assert!(matches!(err, AppError::DeliveryFailed));
    }

    fn user_for_scenario(now: OffsetDateTime) -> User {
        User {
            id: Uuid::new_v4(),
            name: "A".to_string(),
            email: "a@example.com".to_string(),
            password_hash: hash_password("old-password").unwrap(),
            username: None,
            phone_number: String::new(),
            bio: String::new(),
            profile_image: None,
            reset_challenge_hash: None,
            reset_challenge_expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// 規定シナリオ: 発行 → t+100秒で検証OK → 消費 → 再検証NG
    #[test]
    fn test_issue_validate_consume_lifecycle() {
        let now = OffsetDateTime::now_utc();
        let mut user = user_for_scenario(now);

        // 発行: コード "482913"、有効期間600秒
        let otp = "482913";
        user.reset_challenge_hash = Some(hash_challenge(otp));
        user.reset_challenge_expires_at = Some(now + Duration::seconds(600));

        // t+100秒: 検証は成功
        let at_validate = now + Duration::seconds(100);
        assert_eq!(
            user.challenge_state(&hash_challenge(otp), at_validate),
            ChallengeState::Valid
        );

        // 消費: 条件付きUPDATEと同じ述語で照合し、成功したら
        // パスワード更新とチャレンジNULL化を同時に適用する
        let new_password = "Sx9!aa";
        assert_eq!(
            user.challenge_state(&hash_challenge(otp), at_validate),
            ChallengeState::Valid
        );
        user.password_hash = hash_password(new_password).unwrap();
        user.reset_challenge_hash = None;
        user.reset_challenge_expires_at = None;

        // 再検証は失敗（ワンタイム保証）
        assert_eq!(
            user.challenge_state(&hash_challenge(otp), at_validate),
            ChallengeState::NoneOutstanding
        );

        // 新パスワードで認証が通り、旧パスワードは通らない
        assert!(verify_password(new_password, &user.password_hash).unwrap());
        assert!(!verify_password("old-password", &user.password_hash).unwrap());
    }

    /// 期限経過後は同じコードでも検証に失敗する
    #[test]
    fn test_challenge_rejected_after_expiry() {
        let now = OffsetDateTime::now_utc();
        let mut user = user_for_scenario(now);

        let otp = generate_otp();
        user.reset_challenge_hash = Some(hash_challenge(&otp));
        user.reset_challenge_expires_at = Some(now + Duration::seconds(600));

        assert_eq!(
            user.challenge_state(&hash_challenge(&otp), now + Duration::seconds(599)),
            ChallengeState::Valid
        );
        assert_eq!(
            user.challenge_state(&hash_challenge(&otp), now + Duration::seconds(601)),
            ChallengeState::Expired
        );
    }
}
