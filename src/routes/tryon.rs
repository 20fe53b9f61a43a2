use crate::config::Config;
use crate::database::session::SessionRepository;
use crate::database::sqlite_repository::SqliteRepository;
use crate::error::app_error::AppError;
use crate::models::session::{TryOnRequest, TryOnResponse, TryOnSessionResponse};
use crate::service::gemini::GeminiClient;
use crate::service::tryon::TryOnService;
use crate::storage::Storage;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{routes, State};
use sqlx::SqlitePool;
use validator::Validate;

#[rocket::post("/tryon", data = "<payload>")]
pub async fn create_tryon(
    pool: &State<SqlitePool>,
    storage: &State<Storage>,
    generator: &State<GeminiClient>,
    config: &State<Config>,
    payload: Json<TryOnRequest>,
) -> Result<(Status, Json<TryOnResponse>), AppError> {
    payload.validate()?;

    let repo = SqliteRepository::new(pool.inner().clone());
    let service = TryOnService::new(
        &repo,
        storage.inner(),
        generator.inner(),
        &config.images,
        &config.generator.disallowed_formats,
    );
    let response = service.request_try_on(payload.user_id, payload.product_id).await?;

    Ok((Status::Created, Json(response)))
}

#[rocket::get("/tryon/<id>")]
pub async fn get_tryon(pool: &State<SqlitePool>, id: i64) -> Result<Json<TryOnSessionResponse>, AppError> {
    let repo = SqliteRepository::new(pool.inner().clone());
    let session = repo
        .get_session_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Try-on session not found".to_string()))?;
    Ok(Json(TryOnSessionResponse::from(&session)))
}

pub fn routes() -> Vec<rocket::Route> {
    routes![create_tryon, get_tryon]
}
