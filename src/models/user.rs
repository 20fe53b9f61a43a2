use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Returned by the user-photo upload endpoint; `filepath` is relative to
/// the storage root.
#[derive(Debug, Serialize)]
pub struct UserPhotoResponse {
    pub user_id: i64,
    pub filepath: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            created_at: user.created_at,
        }
    }
}
