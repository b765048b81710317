use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use crate::error::AppError;
use crate::services::places::PlaceReview;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewsQuery {
    #[serde(default)]
    pub place_id: Option<String>,
    #[serde(default)]
    pub place_name: Option<String>,
}

/// GET /api/reviews?placeId=.. または ?placeName=..
///
/// 外部プレイスAPIのレビューをそのまま中継する。
/// placeName 指定時はテキスト検索で place_id に解決してから取得
pub async fn get_reviews(
    State(state): State<AppState>,
    Query(query): Query<ReviewsQuery>,
) -> Result<Json<Vec<PlaceReview>>, AppError> {
    let places_client = state
        .places_client
        .as_ref()
        .ok_or(AppError::PlacesUnconfigured)?;

    let place_id = match (query.place_id, query.place_name) {
        (Some(place_id), _) if !place_id.trim().is_empty() => place_id,
        (_, Some(place_name)) if !place_name.trim().is_empty() => places_client
            .find_place_id(&place_name)
            .await?
            .ok_or(AppError::NotFound("プレイス"))?,
        _ => {
            return Err(AppError::Validation(
                "placeId または placeName を指定してください".to_string(),
            ));
        }
    };

    let reviews = places_client.place_reviews(&place_id).await?;
    Ok(Json(reviews))
}
