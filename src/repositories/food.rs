use sqlx::PgPool;

use crate::models::Food;

#[derive(Clone)]
pub struct FoodRepository {
    pool: PgPool,
}

impl FoodRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// フードアイテムを登録
    pub async fn insert(
        &self,
        name: &str,
        category: &str,
        cuisine: &str,
        calories: i32,
        image: &str,
    ) -> Result<Food, sqlx::Error> {
        sqlx::query_as::<_, Food>(
            r#"
            INSERT INTO foods (name, category, cuisine, calories, image)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, category, cuisine, calories, image, created_at
            "#,
        )
        .bind(name)
        .bind(category)
        .bind(cuisine)
        .bind(calories)
        .bind(image)
        .fetch_one(&self.pool)
        .await
    }

    /// 全フードアイテムを取得
    pub async fn list_all(&self) -> Result<Vec<Food>, sqlx::Error> {
        sqlx::query_as::<_, Food>(
            r#"
            SELECT id, name, category, cuisine, calories, image, created_at
            FROM foods
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    /// カテゴリ・料理ジャンルで絞り込み（未指定の条件は無視）
    pub async fn recommend(
        &self,
        category: Option<&str>,
        cuisine: Option<&str>,
    ) -> Result<Vec<Food>, sqlx::Error> {
        sqlx::query_as::<_, Food>(
            r#"
            SELECT id, name, category, cuisine, calories, image, created_at
            FROM foods
            WHERE ($1::text IS NULL OR category = $1)
              AND ($2::text IS NULL OR cuisine = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(category)
        .bind(cuisine)
        .fetch_all(&self.pool)
        .await
    }
}
