use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// ユーザー
///
/// reset_challenge_hash にはワンタイムコードのSHA256ハッシュのみ保存する。
/// 平文コードはメールで送信し、DBには保存しない。
/// チャレンジ2フィールドは必ず両方セットか両方NULL（DB制約でも強制）。
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub username: Option<String>,
    pub phone_number: String,
    pub bio: String,
    pub profile_image: Option<String>,
    #[serde(skip)]
    pub reset_challenge_hash: Option<String>,
    #[serde(skip)]
    pub reset_challenge_expires_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// チャレンジ照合の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeState {
    /// 一致かつ有効期限内
    Valid,
    /// 発行済みチャレンジなし
    NoneOutstanding,
    /// ハッシュ不一致
    Mismatch,
    /// 一致したが期限切れ（値は上書きされるまで残る）
    Expired,
}

impl ChallengeState {
    /// ユーザー向けの理由文字列
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Valid => "有効な確認コードです",
            Self::NoneOutstanding => "確認コードが発行されていません",
            Self::Mismatch => "確認コードが一致しません",
            Self::Expired => "確認コードの有効期限が切れています",
        }
    }
}

impl User {
    /// 提示されたチャレンジハッシュを、時刻 `at` 時点で照合する
    ///
    /// 読み取り専用。期限切れは遅延観測（値の消去は消費か上書きでのみ起こる）。
    pub fn challenge_state(&self, presented_hash: &str, at: OffsetDateTime) -> ChallengeState {
        let (stored_hash, expires_at) = match (
            &self.reset_challenge_hash,
            self.reset_challenge_expires_at,
        ) {
            (Some(hash), Some(expires_at)) => (hash, expires_at),
            // 片側のみセットはDB制約で起こらないが、発行なしと同等に扱う
            _ => return ChallengeState::NoneOutstanding,
        };

        if stored_hash != presented_hash {
            return ChallengeState::Mismatch;
        }
        if at >= expires_at {
            return ChallengeState::Expired;
        }
        ChallengeState::Valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn user_with_challenge(
        hash: Option<&str>,
        expires_at: Option<OffsetDateTime>,
    ) -> User {
        let now = OffsetDateTime::now_utc();
        User {
            id: Uuid::new_v4(),
            name: "テストユーザー".to_string(),
            email: "a@example.com".to_string(),
            password_hash: "$argon2id$dummy".to_string(),
            username: None,
            phone_number: String::new(),
            bio: String::new(),
            profile_image: None,
            reset_challenge_hash: hash.map(str::to_string),
            reset_challenge_expires_at: expires_at,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_challenge_valid_before_expiry() {
        let now = OffsetDateTime::now_utc();
        let user = user_with_challenge(Some("abc123"), Some(now + Duration::seconds(600)));

        // 発行から100秒後はまだ有効
        let state = user.challenge_state("abc123", now + Duration::seconds(100));
        assert_eq!(state, ChallengeState::Valid);
    }

    #[test]
    fn test_challenge_expired_after_ttl() {
        let now = OffsetDateTime::now_utc();
        let user = user_with_challenge(Some("abc123"), Some(now + Duration::seconds(600)));

        // 有効期限ちょうどで無効になる
        let state = user.challenge_state("abc123", now + Duration::seconds(600));
        assert_eq!(state, ChallengeState::Expired);
    }

    #[test]
    fn test_challenge_mismatch() {
        let now = OffsetDateTime::now_utc();
        let user = user_with_challenge(Some("abc123"), Some(now + Duration::seconds(600)));

        let state = user.challenge_state("zzz999", now);
        assert_eq!(state, ChallengeState::Mismatch);
    }

    #[test]
    fn test_no_outstanding_challenge() {
        let user = user_with_challenge(None, None);

        let state = user.challenge_state("abc123", OffsetDateTime::now_utc());
        assert_eq!(state, ChallengeState::NoneOutstanding);
    }

    #[test]
    fn test_new_issue_invalidates_old_challenge() {
        let now = OffsetDateTime::now_utc();
        let mut user = user_with_challenge(Some("old_hash"), Some(now + Duration::seconds(600)));

        // 再発行で上書き → 旧値は期限内でも不一致になる
        user.reset_challenge_hash = Some("new_hash".to_string());
        user.reset_challenge_expires_at = Some(now + Duration::seconds(600));

        assert_eq!(user.challenge_state("old_hash", now), ChallengeState::Mismatch);
        assert_eq!(user.challenge_state("new_hash", now), ChallengeState::Valid);
    }
}
