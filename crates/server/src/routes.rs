use axum::{
    routing::{get, post},
    Json, Router,
};
use service::fruits::FruitStore;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use common::types::Health;

use crate::openapi::ApiDoc;

pub mod fruits;

/// Shared handler state.
#[derive(Clone)]
pub struct ServerState {
    pub store: FruitStore,
}

#[utoipa::path(
    get, path = "/health", tag = "health",
    responses((status = 200, description = "Service is up", body = crate::openapi::HealthResponse))
)]
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// Build the full application router: fruit API, health and Swagger UI.
pub fn build_router(state: ServerState, cors: CorsLayer) -> Router {
    // "/api/fruits" and "/api/fruits/" behave the same
    let api = Router::new()
        .route("/api/fruits", get(fruits::list_fruits).post(fruits::create_fruit))
        .route("/api/fruits/", get(fruits::list_fruits).post(fruits::create_fruit))
        .route(
            "/api/fruits/search",
            get(fruits::get_fruit_named_search).post(fruits::search_fruits),
        )
        .route("/api/fruits/:id", get(fruits::get_fruit));

    Router::new()
        .route("/health", get(health))
        .merge(api)
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                // 每次请求创建 span，包含方法和路径等，日志级别为 INFO
                .make_span_with(
                    DefaultMakeSpan::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                // 响应返回时打点，包含状态码与耗时
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                // 失败（5xx 等）时以 ERROR 记录
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
