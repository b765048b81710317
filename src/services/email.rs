use std::sync::Arc;

use crate::config::Config;
use crate::error::AppError;

/// メール送信サービス
///
/// `email` feature 有効時は lettre でSMTP送信する。
/// 無効時（開発環境）はログ出力のみで常に成功を返す。
/// 送信失敗は `AppError::DeliveryFailed` として永続化エラーと区別する。
#[derive(Clone)]
pub struct EmailService {
    config: Arc<Config>,
}

impl EmailService {
    /// 新しい EmailService を作成
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// パスワードリセットの確認コードメールを送信
    ///
    /// # Security
    /// 本文にのみ平文コードを含める。コードはログに出力しない
    pub async fn send_reset_code(&self, to: &str, code: &str) -> Result<(), AppError> {
        let subject = "FlavorSync パスワードリセット確認コード";
        let body = format!(
            "パスワードリセットの確認コード: {}\n\n\
             このコードの有効期限は {} 分です。\n\
             心当たりがない場合はこのメールを無視してください。",
            code,
            self.config.reset_otp_ttl_secs / 60,
        );

        self.send(to, subject, &body).await
    }

    #[cfg(feature = "email")]
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AppError> {
        use lettre::message::header::ContentType;
        use lettre::transport::smtp::authentication::Credentials;
        use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
        use secrecy::ExposeSecret;

        let (host, username, password, from) = match (
            &self.config.smtp_host,
            &self.config.smtp_username,
            &self.config.smtp_password,
            &self.config.smtp_from_address,
        ) {
            (Some(host), Some(username), Some(password), Some(from)) => {
                (host, username, password, from)
            }
            _ => {
                tracing::error!("SMTP設定が不足しているため送信できません");
                return Err(AppError::DeliveryFailed);
            }
        };

        let message = Message::builder()
            .from(from.parse().map_err(|e| {
                tracing::error!(error = ?e, "Fromアドレスのパースに失敗");
                AppError::DeliveryFailed
            })?)
            .to(to.parse().map_err(|e| {
                tracing::error!(error = ?e, "宛先アドレスのパースに失敗");
                AppError::DeliveryFailed
            })?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| {
                tracing::error!(error = ?e, "メール本文の構築に失敗");
                AppError::DeliveryFailed
            })?;

        let credentials = Credentials::new(
            username.expose_secret().clone(),
            password.expose_secret().clone(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| {
                tracing::error!(error = ?e, "SMTPトランスポートの構築に失敗");
                AppError::DeliveryFailed
            })?
            .port(self.config.smtp_port)
            .credentials(credentials)
            .build();

        mailer.send(message).await.map_err(|e| {
            tracing::error!(error = ?e, to = %to, "メール送信失敗");
            AppError::DeliveryFailed
        })?;

        tracing::info!(to = %to, "メール送信完了");
        Ok(())
    }

    /// 開発モード: メール送信せずログ出力のみ
    #[cfg(not(feature = "email"))]
    async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<(), AppError> {
        tracing::info!(to = %to, subject = %subject, "メール送信（開発モード・実送信なし）");
        Ok(())
    }
}
