use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{NewRestaurant, Restaurant};

#[derive(Clone)]
pub struct RestaurantRepository {
    pool: PgPool,
}

impl RestaurantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 全レストランを取得
    pub async fn list_all(&self) -> Result<Vec<Restaurant>, sqlx::Error> {
        sqlx::query_as::<_, Restaurant>(
            r#"
            SELECT id, name, cuisine, address, description, price_range, rating, image,
                   latitude, longitude, place_id, vicinity, created_at, updated_at
            FROM restaurants
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    /// IDでレストランを取得
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Restaurant>, sqlx::Error> {
        sqlx::query_as::<_, Restaurant>(
            r#"
            SELECT id, name, cuisine, address, description, price_range, rating, image,
                   latitude, longitude, place_id, vicinity, created_at, updated_at
            FROM restaurants
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// 指定座標から半径 radius_m メートル以内のレストランを距離順に取得
    ///
    /// PostGISなしのHaversine近似。acosの引数は丸め誤差で1.0を超え得るため
    /// least でクランプする
    pub async fn find_nearby(
        &self,
        latitude: f64,
        longitude: f64,
        radius_m: f64,
    ) -> Result<Vec<Restaurant>, sqlx::Error> {
        sqlx::query_as::<_, Restaurant>(
            r#"
            SELECT id, name, cuisine, address, description, price_range, rating, image,
                   latitude, longitude, place_id, vicinity, created_at, updated_at, distance_m
            FROM (
                SELECT *,
                       6371000.0 * acos(least(1.0,
                           cos(radians($1)) * cos(radians(latitude))
                             * cos(radians(longitude) - radians($2))
                           + sin(radians($1)) * sin(radians(latitude))
                       )) AS distance_m
                FROM restaurants
            ) r
            WHERE distance_m <= $3
            ORDER BY distance_m
            "#,
        )
        .bind(latitude)
        .bind(longitude)
        .bind(radius_m)
        .fetch_all(&self.pool)
        .await
    }

    /// 新しいレストランを登録
    pub async fn insert(&self, new: &NewRestaurant) -> Result<Restaurant, sqlx::Error> {
        sqlx::query_as::<_, Restaurant>(
            r#"
            INSERT INTO restaurants
                (name, cuisine, address, description, price_range, rating, image,
                 latitude, longitude, place_id, vicinity)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id, name, cuisine, address, description, price_range, rating, image,
                      latitude, longitude, place_id, vicinity, created_at, updated_at
            "#,
        )
        .bind(&new.name)
        .bind(&new.cuisine)
        .bind(&new.address)
        .bind(&new.description)
        .bind(&new.price_range)
        .bind(new.rating)
        .bind(&new.image)
        .bind(new.latitude)
        .bind(new.longitude)
        .bind(&new.place_id)
        .bind(&new.vicinity)
        .fetch_one(&self.pool)
        .await
    }

    /// 外部プレイスAPI由来のレストランを保存し、永続化済みの行を返す
    ///
    /// place_id 重複時は挿入せず既存行を引き直す。返る行のIDは常に
    /// DBが採番した実在のもの
    pub async fn upsert_place(
        &self,
        new: &NewRestaurant,
    ) -> Result<Option<Restaurant>, sqlx::Error> {
        // ON CONFLICT DO NOTHING は衝突時に RETURNING を返さない
        let inserted = sqlx::query_as::<_, Restaurant>(
            r#"
            INSERT INTO restaurants
                (name, cuisine, address, description, price_range, rating, image,
                 latitude, longitude, place_id, vicinity)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (place_id) DO NOTHING
            RETURNING id, name, cuisine, address, description, price_range, rating, image,
                      latitude, longitude, place_id, vicinity, created_at, updated_at
            "#,
        )
        .bind(&new.name)
        .bind(&new.cuisine)
        .bind(&new.address)
        .bind(&new.description)
        .bind(&new.price_range)
        .bind(new.rating)
        .bind(&new.image)
        .bind(new.latitude)
        .bind(new.longitude)
        .bind(&new.place_id)
        .bind(&new.vicinity)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(restaurant) = inserted {
            return Ok(Some(restaurant));
        }

        match &new.place_id {
            Some(place_id) => self.find_by_place_id(place_id).await,
            None => Ok(None),
        }
    }

    /// place_id でレストランを取得
    async fn find_by_place_id(&self, place_id: &str) -> Result<Option<Restaurant>, sqlx::Error> {
        sqlx::query_as::<_, Restaurant>(
            r#"
            SELECT id, name, cuisine, address, description, price_range, rating, image,
                   latitude, longitude, place_id, vicinity, created_at, updated_at
            FROM restaurants
            WHERE place_id = $1
            "#,
        )
        .bind(place_id)
        .fetch_optional(&self.pool)
        .await
    }
}
