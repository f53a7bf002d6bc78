use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    #[serde(rename = "nombre_completo")]
    pub full_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    #[serde(rename = "activo")]
    pub active: bool,
}

/// Public projection of a user, used by every response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserSummary {
    pub id: i64,
    #[serde(rename = "nombre_completo")]
    pub full_name: String,
    pub email: String,
    #[serde(rename = "activo")]
    pub active: bool,
}

impl From<User> for UserSummary {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            full_name: u.full_name,
            email: u.email,
            active: u.active,
        }
    }
}

/// Only what login needs to check a password.
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    pub email: String,
    pub password_hash: String,
}

/// Insert payload; `password_hash` is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
}
