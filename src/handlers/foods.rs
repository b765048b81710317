use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::Food;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddFoodRequest {
    pub name: String,
    pub category: String,
    pub cuisine: String,
    pub calories: i32,
    pub image: String,
}

#[derive(Debug, Serialize)]
pub struct AddFoodResponse {
    pub message: String,
    pub food: Food,
}

/// POST /api/food/add
pub async fn add_food(
    State(state): State<AppState>,
    Json(request): Json<AddFoodRequest>,
) -> Result<Json<AddFoodResponse>, AppError> {
    validate_add_food_request(&request)?;

    let food = state
        .food_repo
        .insert(
            &request.name,
            &request.category,
            &request.cuisine,
            request.calories,
            &request.image,
        )
        .await?;

    tracing::info!(name = %food.name, "フード登録成功");

    Ok(Json(AddFoodResponse {
        message: "フードアイテムを登録しました".to_string(),
        food,
    }))
}

/// GET /api/food/all
pub async fn list_foods(State(state): State<AppState>) -> Result<Json<Vec<Food>>, AppError> {
    let foods = state.food_repo.list_all().await?;
    Ok(Json(foods))
}

#[derive(Debug, Deserialize)]
pub struct RecommendQuery {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub cuisine: Option<String>,
}

/// GET /api/food/recommend?category=..&cuisine=..
///
/// カテゴリ・料理ジャンルの単純フィルタによるおすすめ
pub async fn recommend_foods(
    State(state): State<AppState>,
    Query(query): Query<RecommendQuery>,
) -> Result<Json<Vec<Food>>, AppError> {
    let foods = state
        .food_repo
        .recommend(query.category.as_deref(), query.cuisine.as_deref())
        .await?;
    Ok(Json(foods))
}

/// フード登録リクエストのバリデーション
fn validate_add_food_request(request: &AddFoodRequest) -> Result<(), AppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("名前は必須です".to_string()));
    }
    if request.category.trim().is_empty() {
        return Err(AppError::Validation("カテゴリは必須です".to_string()));
    }
    if request.cuisine.trim().is_empty() {
        return Err(AppError::Validation("料理ジャンルは必須です".to_string()));
    }
    if request.calories < 0 {
        return Err(AppError::Validation(
            "カロリーは0以上で入力してください".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> AddFoodRequest {
        AddFoodRequest {
            name: "バターチキンカレー".to_string(),
            category: "カレー".to_string(),
            cuisine: "インド料理".to_string(),
            calories: 650,
            image: "https://example.com/curry.jpg".to_string(),
        }
    }

    #[test]
    fn test_validate_valid_request() {
        assert!(validate_add_food_request(&request()).is_ok());
    }

    #[test]
    fn test_validate_empty_name() {
        let mut r = request();
        r.name = "".to_string();
        assert!(validate_add_food_request(&r).is_err());
    }

    #[test]
    fn test_validate_negative_calories() {
        let mut r = request();
        r.calories = -1;
        assert!(validate_add_food_request(&r).is_err());
    }
}
