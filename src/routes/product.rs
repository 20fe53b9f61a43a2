use crate::database::product::ProductRepository;
use crate::database::sqlite_repository::SqliteRepository;
use crate::error::app_error::AppError;
use crate::images;
use crate::models::product::ProductResponse;
use crate::routes::{ensure_image_content_type, read_upload};
use crate::storage::Storage;
use rocket::form::Form;
use rocket::fs::TempFile;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{routes, State};
use sqlx::SqlitePool;

#[derive(rocket::FromForm)]
pub struct ProductUploadForm<'r> {
    pub name: String,
    pub file: TempFile<'r>,
}

#[rocket::post("/upload-product-photo", data = "<form>")]
pub async fn upload_product_photo(
    pool: &State<SqlitePool>,
    storage: &State<Storage>,
    mut form: Form<ProductUploadForm<'_>>,
) -> Result<(Status, Json<ProductResponse>), AppError> {
    let name = form.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("Product name must not be empty".to_string()));
    }

    ensure_image_content_type(form.file.content_type())?;
    let bytes = read_upload(&mut form.file).await?;
    images::validate_image(&bytes)?;

    // Row first: the generated id keys the storage directory.
    let repo = SqliteRepository::new(pool.inner().clone());
    let product = repo.create_product(&name).await?;
    let filepath = storage.save_product_photo(product.id, &bytes)?;
    let product = repo.set_product_filepath(product.id, &filepath).await?;

    Ok((Status::Created, Json(ProductResponse::from(&product))))
}

#[rocket::get("/products")]
pub async fn list_products(pool: &State<SqlitePool>) -> Result<Json<Vec<ProductResponse>>, AppError> {
    let repo = SqliteRepository::new(pool.inner().clone());
    let products = repo.list_products().await?;
    Ok(Json(products.iter().map(ProductResponse::from).collect()))
}

#[rocket::get("/products/<id>")]
pub async fn get_product(pool: &State<SqlitePool>, id: i64) -> Result<Json<ProductResponse>, AppError> {
    let repo = SqliteRepository::new(pool.inner().clone());
    let product = repo
        .get_product_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
    Ok(Json(ProductResponse::from(&product)))
}

pub fn routes() -> Vec<rocket::Route> {
    routes![upload_product_photo, list_products, get_product]
}
