use crate::database::sqlite_repository::SqliteRepository;
use crate::database::user::UserRepository;
use crate::error::app_error::AppError;
use crate::images;
use crate::models::user::{CreateUserRequest, UserPhotoResponse, UserResponse};
use crate::routes::{ensure_image_content_type, read_upload};
use crate::storage::Storage;
use rocket::form::Form;
use rocket::fs::TempFile;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{routes, State};
use sqlx::SqlitePool;

#[rocket::post("/users", data = "<payload>")]
pub async fn create_user(
    pool: &State<SqlitePool>,
    payload: Json<CreateUserRequest>,
) -> Result<(Status, Json<UserResponse>), AppError> {
    let repo = SqliteRepository::new(pool.inner().clone());
    let user = repo.create_user(payload.name.as_deref()).await?;
    Ok((Status::Created, Json(UserResponse::from(&user))))
}

#[rocket::get("/users/<id>")]
pub async fn get_user(pool: &State<SqlitePool>, id: i64) -> Result<Json<UserResponse>, AppError> {
    let repo = SqliteRepository::new(pool.inner().clone());
    let user = repo
        .get_user_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(UserResponse::from(&user)))
}

#[derive(rocket::FromForm)]
pub struct UserPhotoForm<'r> {
    pub user_id: i64,
    pub file: TempFile<'r>,
}

#[rocket::post("/upload-user-photo", data = "<form>")]
pub async fn upload_user_photo(
    pool: &State<SqlitePool>,
    storage: &State<Storage>,
    mut form: Form<UserPhotoForm<'_>>,
) -> Result<Json<UserPhotoResponse>, AppError> {
    let repo = SqliteRepository::new(pool.inner().clone());
    let user = repo
        .get_user_by_id(form.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    ensure_image_content_type(form.file.content_type())?;
    let bytes = read_upload(&mut form.file).await?;
    images::validate_image(&bytes)?;

    let filepath = storage.save_user_photo(user.id, &bytes)?;
    Ok(Json(UserPhotoResponse {
        user_id: user.id,
        filepath,
    }))
}

pub fn routes() -> Vec<rocket::Route> {
    routes![create_user, get_user, upload_user_photo]
}
