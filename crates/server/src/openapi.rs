use utoipa::OpenApi;
use utoipa::ToSchema;

#[derive(ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
}

#[derive(ToSchema)]
pub struct FruitDoc {
    #[schema(example = "rKdzQ4aB")]
    pub id: String,
    #[schema(example = "apple")]
    pub fruit: String,
    #[schema(example = "red")]
    pub color: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::fruits::list_fruits,
        crate::routes::fruits::get_fruit,
        crate::routes::fruits::create_fruit,
        crate::routes::fruits::search_fruits,
    ),
    components(schemas(HealthResponse, FruitDoc)),
    tags(
        (name = "health"),
        (name = "fruits")
    )
)]
pub struct ApiDoc;
