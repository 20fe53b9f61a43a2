use crate::models::health::HealthResponse;
use crate::service::gemini::{GeminiClient, Generator};
use rocket::serde::json::{json, Json, Value};
use rocket::{routes, State};

#[rocket::get("/")]
pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Virtual try-on API is running" }))
}

/// Liveness plus a best-effort probe of the generation backend. The
/// service is "healthy" either way; only `generator_api` reflects the
/// probe result.
#[rocket::get("/health")]
pub async fn healthcheck(generator: &State<GeminiClient>) -> Json<HealthResponse> {
    let generator_api = if generator.health_check().await {
        "connected"
    } else {
        "disconnected"
    };
    Json(HealthResponse {
        status: "healthy",
        generator_api,
    })
}

pub fn routes() -> Vec<rocket::Route> {
    routes![root, healthcheck]
}
