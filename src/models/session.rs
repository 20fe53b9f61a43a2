use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// One try-on attempt. `output_image_path` is the sole completion signal:
/// `None` means generation did not finish, `Some` means a result image was
/// written under the storage root.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TryOnSession {
    pub id: i64,
    pub user_id: i64,
    pub product_id: i64,
    pub input_user_photo_path: String,
    pub input_product_photo_path: String,
    pub output_image_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TryOnRequest {
    #[validate(range(min = 1))]
    pub user_id: i64,
    #[validate(range(min = 1))]
    pub product_id: i64,
}

/// `output_image_url` is empty when generation failed; the session row
/// still exists and can be fetched by id.
#[derive(Debug, Serialize)]
pub struct TryOnResponse {
    pub session_id: i64,
    pub output_image_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct TryOnSessionResponse {
    pub id: i64,
    pub user_id: i64,
    pub product_id: i64,
    pub input_user_photo_path: String,
    pub input_product_photo_path: String,
    pub output_image_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&TryOnSession> for TryOnSessionResponse {
    fn from(session: &TryOnSession) -> Self {
        Self {
            id: session.id,
            user_id: session.user_id,
            product_id: session.product_id,
            input_user_photo_path: session.input_user_photo_path.clone(),
            input_product_photo_path: session.input_product_photo_path.clone(),
            output_image_path: session.output_image_path.clone(),
            created_at: session.created_at,
        }
    }
}
