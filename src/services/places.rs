use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::NewRestaurant;

/// デフォルトのレストラン画像（写真のないプレイス用）
const FALLBACK_IMAGE_URL: &str = "https://i.imgur.com/Nm7vIGs.jpeg";

// ============================================================================
// プレイスAPI レスポンス DTO
// ============================================================================

/// 近傍検索レスポンス
#[derive(Debug, Deserialize)]
pub struct NearbySearchResponse {
    #[serde(default)]
    pub results: Vec<PlaceResult>,
}

/// プレイス1件
#[derive(Debug, Deserialize)]
pub struct PlaceResult {
    pub name: String,
    pub place_id: String,
    #[serde(default)]
    pub vicinity: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub price_level: Option<u8>,
    pub geometry: PlaceGeometry,
    #[serde(default)]
    pub photos: Vec<PlacePhoto>,
    #[serde(default)]
    pub types: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlaceGeometry {
    pub location: PlaceLocation,
}

#[derive(Debug, Deserialize)]
pub struct PlaceLocation {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Deserialize)]
pub struct PlacePhoto {
    pub photo_reference: String,
}

/// プレイス詳細レスポンス（レビュー取得用）
#[derive(Debug, Deserialize)]
pub struct PlaceDetailsResponse {
    #[serde(default)]
    pub result: Option<PlaceDetails>,
}

#[derive(Debug, Deserialize)]
pub struct PlaceDetails {
    #[serde(default)]
    pub reviews: Vec<PlaceReview>,
}

/// プレイスのレビュー（そのままクライアントへ返す）
#[derive(Debug, Deserialize, Serialize)]
pub struct PlaceReview {
    pub author_name: String,
    pub rating: f64,
    pub text: String,
    #[serde(default)]
    pub relative_time_description: Option<String>,
    pub time: i64,
}

/// テキスト検索レスポンス（プレイス名 → place_id 解決用）
#[derive(Debug, Deserialize)]
pub struct FindPlaceResponse {
    #[serde(default)]
    pub candidates: Vec<PlaceCandidate>,
}

#[derive(Debug, Deserialize)]
pub struct PlaceCandidate {
    pub place_id: String,
}

// ============================================================================
// クライアント
// ============================================================================

/// 外部プレイスAPI クライアント
#[derive(Clone)]
pub struct PlacesClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl PlacesClient {
    /// 新しい PlacesClient を作成
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    /// 指定座標近傍のレストランを検索
    pub async fn nearby_restaurants(
        &self,
        latitude: f64,
        longitude: f64,
        radius_m: f64,
    ) -> Result<Vec<PlaceResult>, AppError> {
        let url = format!("{}/nearbysearch/json", self.base_url);
        let response: NearbySearchResponse = self
            .client
            .get(&url)
            .query(&[
                ("location", format!("{},{}", latitude, longitude)),
                ("radius", radius_m.to_string()),
                ("type", "restaurant".to_string()),
                ("key", self.api_key.clone()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.results)
    }

    /// プレイスのレビュー一覧を取得
    pub async fn place_reviews(&self, place_id: &str) -> Result<Vec<PlaceReview>, AppError> {
        let url = format!("{}/details/json", self.base_url);
        let response: PlaceDetailsResponse = self
            .client
            .get(&url)
            .query(&[
                ("place_id", place_id),
                ("fields", "name,rating,reviews"),
                ("key", &self.api_key),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.result.map(|r| r.reviews).unwrap_or_default())
    }

    /// プレイス名から place_id を解決（見つからなければ None）
    pub async fn find_place_id(&self, place_name: &str) -> Result<Option<String>, AppError> {
        let url = format!("{}/findplacefromtext/json", self.base_url);
        let response: FindPlaceResponse = self
            .client
            .get(&url)
            .query(&[
                ("input", place_name),
                ("inputtype", "textquery"),
                ("fields", "place_id"),
                ("key", &self.api_key),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.candidates.into_iter().next().map(|c| c.place_id))
    }

    /// 写真参照からプレイス写真URLを組み立てる
    fn photo_url(&self, photo_reference: &str) -> String {
        format!(
            "{}/photo?maxwidth=400&photoreference={}&key={}",
            self.base_url, photo_reference, self.api_key
        )
    }

    /// プレイスAPI の結果をローカルスキーマに変換
    pub fn to_new_restaurant(&self, place: &PlaceResult) -> NewRestaurant {
        let image = place
            .photos
            .first()
            .map(|p| self.photo_url(&p.photo_reference))
            .unwrap_or_else(|| FALLBACK_IMAGE_URL.to_string());

        let cuisine = if place.types.iter().any(|t| t == "restaurant") {
            "Restaurant".to_string()
        } else {
            place
                .types
                .first()
                .map(|t| t.replace('_', " "))
                .unwrap_or_else(|| "Restaurant".to_string())
        };

        let price_range = match place.price_level {
            Some(level) if level > 0 => "₹".repeat(level as usize),
            _ => "₹₹".to_string(),
        };

        NewRestaurant {
            name: place.name.clone(),
            cuisine,
            address: place.vicinity.clone().unwrap_or_default(),
            description: None,
            price_range,
            rating: place.rating.unwrap_or(4.0),
            image,
            latitude: place.geometry.location.lat,
            longitude: place.geometry.location.lng,
            place_id: Some(place.place_id.clone()),
            vicinity: place.vicinity.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(types: &[&str], price_level: Option<u8>, photos: bool) -> PlaceResult {
        PlaceResult {
            name: "テスト食堂".to_string(),
            place_id: "place-1".to_string(),
            vicinity: Some("中央通り1-2-3".to_string()),
            rating: Some(4.2),
            price_level,
            geometry: PlaceGeometry {
                location: PlaceLocation { lat: 35.0, lng: 139.0 },
            },
            photos: if photos {
                vec![PlacePhoto {
                    photo_reference: "photoref".to_string(),
                }]
            } else {
                Vec::new()
            },
            types: types.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn client() -> PlacesClient {
        PlacesClient::new(
            "https://example.invalid/place".to_string(),
            "test-key".to_string(),
        )
    }

    #[test]
    fn test_to_new_restaurant_maps_fields() {
        let new = client().to_new_restaurant(&place(&["restaurant", "food"], Some(3), true));
        assert_eq!(new.cuisine, "Restaurant");
        assert_eq!(new.price_range, "₹₹₹");
        assert_eq!(new.rating, 4.2);
        assert_eq!(new.place_id.as_deref(), Some("place-1"));
        assert!(new.image.contains("photoref"));
        assert_eq!(new.latitude, 35.0);
        assert_eq!(new.longitude, 139.0);
    }

    #[test]
    fn test_to_new_restaurant_defaults() {
        let new = client().to_new_restaurant(&place(&["meal_takeaway"], None, false));
        assert_eq!(new.cuisine, "meal takeaway");
        assert_eq!(new.price_range, "₹₹");
        assert_eq!(new.image, FALLBACK_IMAGE_URL);
    }
}
