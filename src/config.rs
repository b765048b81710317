use secrecy::SecretBox;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub database_url: SecretBox<String>,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,

    /// アップロード画像URLの組み立てに使う公開ベースURL
    /// （未設定時は http://{host}:{port} を使用）
    #[serde(default)]
    pub public_base_url: Option<String>,
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: String,

    // セッショントークン設定
    pub jwt_secret: SecretBox<String>,
    #[serde(default = "default_jwt_ttl_secs")]
    pub jwt_ttl_secs: i64,

    // SMTP設定（オプション - email機能有効時のみ使用）
    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub smtp_username: Option<SecretBox<String>>,
    pub smtp_password: Option<SecretBox<String>>,
    #[serde(default)]
    pub smtp_from_address: Option<String>,

    // パスワードリセット設定
    /// ワンタイムコードの有効期間（数値コード方式のため短め）
    #[serde(default = "default_reset_otp_ttl_secs")]
    pub reset_otp_ttl_secs: i64,
    /// メール送信失敗時に発行済みチャレンジを破棄するか
    /// （false の場合はチャレンジを残し、後からの再送を許す）
    #[serde(default)]
    pub reset_rollback_on_delivery_failure: bool,
    /// 新パスワードの最小文字数（ポリシーフック）
    #[serde(default = "default_password_min_len")]
    pub password_min_len: usize,

    // 外部プレイスAPI設定（オプション）
    pub places_api_key: Option<SecretBox<String>>,
    #[serde(default = "default_places_base_url")]
    pub places_base_url: String,
}

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_JWT_TTL_SECS: i64 = 3600;
const DEFAULT_RESET_OTP_TTL_SECS: i64 = 600;
const DEFAULT_PASSWORD_MIN_LEN: usize = 8;
const DEFAULT_UPLOADS_DIR: &str = "uploads";
const DEFAULT_PLACES_BASE_URL: &str = "https://maps.googleapis.com/maps/api/place";

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_smtp_port() -> u16 {
    DEFAULT_SMTP_PORT
}

fn default_jwt_ttl_secs() -> i64 {
    DEFAULT_JWT_TTL_SECS
}

fn default_reset_otp_ttl_secs() -> i64 {
    DEFAULT_RESET_OTP_TTL_SECS
}

fn default_password_min_len() -> usize {
    DEFAULT_PASSWORD_MIN_LEN
}

fn default_uploads_dir() -> String {
    DEFAULT_UPLOADS_DIR.to_string()
}

fn default_places_base_url() -> String {
    DEFAULT_PLACES_BASE_URL.to_string()
}

impl Config {
    pub fn load() -> Result<Self, envy::Error> {
        envy::from_env()
    }
}
