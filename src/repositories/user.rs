use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::User;

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// メールアドレスでユーザーを検索
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, username, phone_number, bio, profile_image,
                   reset_challenge_hash, reset_challenge_expires_at, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    /// ユーザーIDでユーザーを検索
    pub async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, username, phone_number, bio, profile_image,
                   reset_challenge_hash, reset_challenge_expires_at, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// 新しいユーザーを作成
    ///
    /// # Errors
    /// - UNIQUE制約違反時: `sqlx::Error::Database` (constraint = "users_email_key")
    ///   呼び出し側で `AppError::EmailAlreadyExists` に変換すること
    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, password_hash, username, phone_number, bio, profile_image,
                      reset_challenge_hash, reset_challenge_expires_at, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
    }

    /// プロフィールを更新
    ///
    /// None のフィールドは変更しない（部分更新）
    #[allow(clippy::too_many_arguments)]
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        name: Option<&str>,
        username: Option<&str>,
        email: Option<&str>,
        phone_number: Option<&str>,
        bio: Option<&str>,
        profile_image: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name          = COALESCE($2, name),
                username      = COALESCE($3, username),
                email         = COALESCE($4, email),
                phone_number  = COALESCE($5, phone_number),
                bio           = COALESCE($6, bio),
                profile_image = COALESCE($7, profile_image),
                updated_at    = now()
            WHERE id = $1
            RETURNING id, name, email, password_hash, username, phone_number, bio, profile_image,
                      reset_challenge_hash, reset_challenge_expires_at, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(name)
        .bind(username)
        .bind(email)
        .bind(phone_number)
        .bind(bio)
        .bind(profile_image)
        .fetch_optional(&self.pool)
        .await
    }

    /// プロフィール画像URLを設定
    pub async fn set_profile_image(
        &self,
        user_id: Uuid,
        image_url: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET profile_image = $2, updated_at = now()
            WHERE id = $1
            RETURNING id, name, email, password_hash, username, phone_number, bio, profile_image,
                      reset_challenge_hash, reset_challenge_expires_at, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(image_url)
        .fetch_optional(&self.pool)
        .await
    }

    /// リセットチャレンジを発行（既存チャレンジは上書き＝即時無効化）
    ///
    /// # Note
    /// challenge_hash はSHA256ハッシュ。平文コードは保存もログ出力もしない
    pub async fn store_reset_challenge(
        &self,
        user_id: Uuid,
        challenge_hash: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET reset_challenge_hash = $2,
                reset_challenge_expires_at = $3,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(challenge_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// リセットチャレンジを破棄（両フィールドを同時にNULL化）
    pub async fn clear_reset_challenge(&self, user_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET reset_challenge_hash = NULL,
                reset_challenge_expires_at = NULL,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// チャレンジを消費してパスワードを更新する
    ///
    /// 照合（メール一致・ハッシュ一致・期限内）とパスワード更新・
    /// チャレンジNULL化を1つの条件付きUPDATEで行う。
    /// 検証と消費の間で期限が切れるレースはここで吸収される。
    ///
    /// # Returns
    /// 更新された行数（0 = 不一致または期限切れ）
    pub async fn consume_reset_challenge(
        &self,
        email: &str,
        challenge_hash: &str,
        new_password_hash: &str,
        now: OffsetDateTime,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $3,
                reset_challenge_hash = NULL,
                reset_challenge_expires_at = NULL,
                updated_at = now()
            WHERE email = $1
              AND reset_challenge_hash = $2
              AND reset_challenge_expires_at > $4
            "#,
        )
        .bind(email)
        .bind(challenge_hash)
        .bind(new_password_hash)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
