use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{NewRestaurant, Restaurant};
use crate::state::AppState;

const DEFAULT_NEARBY_RADIUS_M: f64 = 1500.0;

/// GET /api/restaurants/all
pub async fn list_restaurants(
    State(state): State<AppState>,
) -> Result<Json<Vec<Restaurant>>, AppError> {
    let restaurants = state.restaurant_repo.list_all().await?;
    Ok(Json(restaurants))
}

/// GET /api/restaurants/{id}
pub async fn get_restaurant(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Restaurant>, AppError> {
    let restaurant = state
        .restaurant_repo
        .find_by_id(id)
        .await?
        .ok_or(AppError::NotFound("レストラン"))?;
    Ok(Json(restaurant))
}

// === 近傍検索 ===

#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "default_radius")]
    pub radius: f64,
}

fn default_radius() -> f64 {
    DEFAULT_NEARBY_RADIUS_M
}

/// GET /api/restaurants/nearby?latitude=..&longitude=..&radius=..
///
/// ローカルDBの近傍行と外部プレイスAPIの結果をマージして返す。
/// プレイス結果はローカルスキーマに変換して place_id で保存し（重複は無視）、
/// レスポンスでも place_id で重複排除する。
/// プレイスAPI 未設定時・障害時はローカル結果のみ返す
pub async fn nearby_restaurants(
    State(state): State<AppState>,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<Vec<Restaurant>>, AppError> {
    validate_coordinates(query.latitude, query.longitude)?;

    let local = state
        .restaurant_repo
        .find_nearby(query.latitude, query.longitude, query.radius)
        .await?;

    let places_client = match &state.places_client {
        Some(client) => client,
        None => return Ok(Json(local)),
    };

    let places = match places_client
        .nearby_restaurants(query.latitude, query.longitude, query.radius)
        .await
    {
        Ok(places) => places,
        Err(e) => {
            // 外部API障害でリクエスト全体を失敗させない
            tracing::warn!(error = ?e, "プレイスAPI近傍検索失敗（ローカル結果のみ返却）");
            return Ok(Json(local));
        }
    };

    let mut fetched = Vec::new();
    for place in &places {
        let already_known = local
            .iter()
            .any(|r| r.place_id.as_deref() == Some(place.place_id.as_str()));
        if already_known {
            continue;
        }

        // 保存してDB採番済みの行を受け取る（1件の失敗は続行）
        let new = places_client.to_new_restaurant(place);
        match state.restaurant_repo.upsert_place(&new).await {
            Ok(Some(restaurant)) => fetched.push(restaurant),
            Ok(None) => {
                tracing::warn!(place_id = %place.place_id, "プレイス行を取得できず（スキップ）");
            }
            Err(e) => {
                tracing::warn!(error = ?e, place_id = %place.place_id, "プレイス保存失敗（スキップ）");
            }
        }
    }

    Ok(Json(merge_nearby(local, fetched)))
}

/// ローカル近傍結果と保存済みプレイス行をマージ（place_id で重複排除）
///
/// 入力の行をそのまま通すだけで、新しい行を合成しない。
/// レスポンスのIDは常に永続化済みの行を指す
fn merge_nearby(mut local: Vec<Restaurant>, fetched: Vec<Restaurant>) -> Vec<Restaurant> {
    for restaurant in fetched {
        let already_known = restaurant.place_id.as_deref().is_some_and(|place_id| {
            local
                .iter()
                .any(|r| r.place_id.as_deref() == Some(place_id))
        });
        if !already_known {
            local.push(restaurant);
        }
    }
    local
}

// === 新規登録 ===

#[derive(Debug, Deserialize)]
pub struct AddRestaurantRequest {
    pub name: String,
    pub cuisine: String,
    pub address: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_price_range")]
    pub price_range: String,
    #[serde(default = "default_rating")]
    pub rating: f64,
    pub image: String,
    pub latitude: f64,
    pub longitude: f64,
}

fn default_price_range() -> String {
    "₹₹".to_string()
}

fn default_rating() -> f64 {
    4.5
}

#[derive(Debug, Serialize)]
pub struct AddRestaurantResponse {
    pub message: String,
    pub restaurant: Restaurant,
}

/// POST /api/restaurants/add
pub async fn add_restaurant(
    State(state): State<AppState>,
    Json(request): Json<AddRestaurantRequest>,
) -> Result<Json<AddRestaurantResponse>, AppError> {
    validate_add_restaurant_request(&request)?;

    let new = NewRestaurant {
        name: request.name,
        cuisine: request.cuisine,
        address: request.address,
        description: request.description,
        price_range: request.price_range,
        rating: request.rating,
        image: request.image,
        latitude: request.latitude,
        longitude: request.longitude,
        place_id: None,
        vicinity: None,
    };

    let restaurant = state.restaurant_repo.insert(&new).await?;

    tracing::info!(name = %restaurant.name, "レストラン登録成功");

    Ok(Json(AddRestaurantResponse {
        message: "レストランを登録しました".to_string(),
        restaurant,
    }))
}

/// 緯度経度の範囲チェック
fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), AppError> {
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(AppError::Validation(
            "緯度・経度の値が不正です".to_string(),
        ));
    }
    Ok(())
}

/// レストラン登録リクエストのバリデーション
fn validate_add_restaurant_request(request: &AddRestaurantRequest) -> Result<(), AppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("店名は必須です".to_string()));
    }
    if request.cuisine.trim().is_empty() {
        return Err(AppError::Validation("料理ジャンルは必須です".to_string()));
    }
    if request.address.trim().is_empty() {
        return Err(AppError::Validation("住所は必須です".to_string()));
    }
    if request.image.trim().is_empty() {
        return Err(AppError::Validation("画像URLは必須です".to_string()));
    }
    validate_coordinates(request.latitude, request.longitude)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> AddRestaurantRequest {
        AddRestaurantRequest {
            name: "テスト食堂".to_string(),
            cuisine: "和食".to_string(),
            address: "中央通り1-2-3".to_string(),
            description: None,
            price_range: "₹₹".to_string(),
            rating: 4.5,
            image: "https://example.com/image.jpg".to_string(),
            latitude: 35.68,
            longitude: 139.76,
        }
    }

    #[test]
    fn test_validate_valid_request() {
        assert!(validate_add_restaurant_request(&request()).is_ok());
    }

    #[test]
    fn test_validate_empty_name() {
        let mut r = request();
        r.name = "  ".to_string();
        assert!(validate_add_restaurant_request(&r).is_err());
    }

    #[test]
    fn test_validate_out_of_range_coordinates() {
        assert!(validate_coordinates(91.0, 0.0).is_err());
        assert!(validate_coordinates(0.0, -181.0).is_err());
        assert!(validate_coordinates(35.68, 139.76).is_ok());
    }

    fn restaurant(place_id: Option<&str>) -> Restaurant {
        let now = time::OffsetDateTime::now_utc();
        Restaurant {
            id: Uuid::new_v4(),
            name: "テスト食堂".to_string(),
            cuisine: "和食".to_string(),
            address: "中央通り1-2-3".to_string(),
            description: None,
            price_range: "₹₹".to_string(),
            rating: 4.5,
            image: "https://example.com/image.jpg".to_string(),
            latitude: 35.68,
            longitude: 139.76,
            place_id: place_id.map(str::to_string),
            vicinity: None,
            distance_m: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// マージ結果の行はすべて入力由来（IDを合成しない）
    #[test]
    fn test_merge_nearby_passes_rows_through() {
        let local = vec![restaurant(Some("p1")), restaurant(None)];
        let fetched = vec![restaurant(Some("p2"))];
        let input_ids: Vec<Uuid> = local.iter().chain(fetched.iter()).map(|r| r.id).collect();

        let merged = merge_nearby(local, fetched);

        assert_eq!(merged.len(), 3);
        assert!(merged.iter().all(|r| input_ids.contains(&r.id)));
    }

    /// place_id が重複する行はローカル側を残す
    #[test]
    fn test_merge_nearby_dedupes_by_place_id() {
        let local = vec![restaurant(Some("p1"))];
        let local_id = local[0].id;

        let merged = merge_nearby(local, vec![restaurant(Some("p1")), restaurant(Some("p2"))]);

        assert_eq!(merged.len(), 2);
        assert!(merged.iter().any(|r| r.id == local_id));
    }
}
