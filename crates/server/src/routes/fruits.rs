use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use service::fruits::Fruit;
use tracing::info;

use crate::{errors::ApiError, routes::ServerState};

#[utoipa::path(
    get, path = "/api/fruits", tag = "fruits",
    responses((status = 200, description = "All fruits", body = [crate::openapi::FruitDoc]))
)]
pub async fn list_fruits(State(state): State<ServerState>) -> Json<Vec<Fruit>> {
    let fruits = state.store.list_all().await;
    info!(count = fruits.len(), "list fruits");
    Json(fruits)
}

#[utoipa::path(
    get, path = "/api/fruits/{id}", tag = "fruits",
    params(("id" = String, Path, description = "Fruit ID")),
    responses(
        (status = 200, description = "Fruit found", body = crate::openapi::FruitDoc),
        (status = 404, description = "No fruit with this ID", body = String)
    )
)]
pub async fn get_fruit(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<Fruit>, ApiError> {
    Ok(Json(state.store.get_by_id(&id).await?))
}

/// `GET /api/fruits/search` shares its path with the search route, so it is
/// routed here and looks up the fruit whose id is literally `search`.
pub async fn get_fruit_named_search(State(state): State<ServerState>) -> Result<Json<Fruit>, ApiError> {
    Ok(Json(state.store.get_by_id("search").await?))
}

/// Without an `id` in the payload one is generated. Fields are not validated.
#[utoipa::path(
    post, path = "/api/fruits", tag = "fruits",
    request_body = crate::openapi::FruitDoc,
    responses(
        (status = 200, description = "ID of the stored fruit", body = String),
        (status = 400, description = "Body is not a fruit", body = String),
        (status = 500, description = "ID already in use", body = String)
    )
)]
pub async fn create_fruit(
    State(state): State<ServerState>,
    payload: Result<Json<Fruit>, JsonRejection>,
) -> Result<String, ApiError> {
    let Json(input) = payload?;
    let id = state.store.create(input).await?;
    Ok(id)
}

/// Union of id, color and fruit matches; 204 when nothing matches.
#[utoipa::path(
    post, path = "/api/fruits/search", tag = "fruits",
    request_body = crate::openapi::FruitDoc,
    responses(
        (status = 200, description = "Matching fruits", body = [crate::openapi::FruitDoc]),
        (status = 204, description = "No match")
    )
)]
pub async fn search_fruits(
    State(state): State<ServerState>,
    payload: Result<Json<Fruit>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(criteria) = payload?;
    let results = state.store.search(&criteria).await;
    if results.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    Ok(Json(results).into_response())
}
