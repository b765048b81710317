use std::sync::Arc;

use secrecy::ExposeSecret;
use sqlx::PgPool;

use crate::config::Config;
use crate::repositories::{FoodRepository, RestaurantRepository, UserRepository};
use crate::services::{EmailService, PlacesClient};

/// アプリケーション共有状態
///
/// axum の State として全ハンドラーで共有される。
/// Clone は必須（axum が内部で clone するため）。
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL コネクションプール
    pub db_pool: PgPool,
    /// アプリケーション設定（Arc で共有）
    pub config: Arc<Config>,
    /// ユーザーリポジトリ
    pub user_repo: UserRepository,
    /// レストランリポジトリ
    pub restaurant_repo: RestaurantRepository,
    /// フードリポジトリ
    pub food_repo: FoodRepository,
    /// メールサービス
    pub email_service: EmailService,
    /// 外部プレイスAPI クライアント（APIキーが設定されている場合のみ）
    pub places_client: Option<PlacesClient>,
}

impl AppState {
    /// 新しい AppState を作成
    pub fn new(db_pool: PgPool, config: Config) -> Self {
        let config = Arc::new(config);
        let user_repo = UserRepository::new(db_pool.clone());
        let restaurant_repo = RestaurantRepository::new(db_pool.clone());
        let food_repo = FoodRepository::new(db_pool.clone());
        let email_service = EmailService::new(config.clone());

        // プレイスAPI クライアント（設定されている場合のみ初期化）
        let places_client = match &config.places_api_key {
            Some(api_key) => {
                tracing::info!("プレイスAPI クライアントを初期化");
                Some(PlacesClient::new(
                    config.places_base_url.clone(),
                    api_key.expose_secret().clone(),
                ))
            }
            None => {
                tracing::info!("プレイスAPI 未設定（近傍検索はローカルDBのみ）");
                None
            }
        };

        Self {
            db_pool,
            config,
            user_repo,
            restaurant_repo,
            food_repo,
            email_service,
            places_client,
        }
    }
}
