use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

use crate::users::repo_types::{NewUser, User, UserCredentials, UserSummary};

#[derive(Debug, Error)]
pub enum StoreError {
    /// The unique index on `lower(users.email)` rejected the write.
    #[error("email already registered")]
    DuplicateEmail,
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::DuplicateEmail,
            _ => StoreError::Database(e),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable table of users keyed by id, unique on email.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn list(&self) -> StoreResult<Vec<UserSummary>>;
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<User>>;
    async fn find_credentials(&self, email: &str) -> StoreResult<Option<UserCredentials>>;
    /// `exclude_id` lets an update keep its own email.
    async fn exists_by_email(&self, email: &str, exclude_id: Option<i64>) -> StoreResult<bool>;
    async fn insert(&self, user: NewUser) -> StoreResult<User>;
    /// Returns `None` when no row has this id.
    async fn update_profile(&self, id: i64, full_name: &str, email: &str)
        -> StoreResult<Option<User>>;
    /// Flips `active` and returns the row, `None` when no row has this id.
    async fn toggle_active(&self, id: i64) -> StoreResult<Option<User>>;
    async fn delete_by_id(&self, id: i64) -> StoreResult<bool>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn list(&self) -> StoreResult<Vec<UserSummary>> {
        let rows = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT id, full_name, email, active
            FROM users
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, full_name, email, password_hash, active
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_credentials(&self, email: &str) -> StoreResult<Option<UserCredentials>> {
        let creds = sqlx::query_as::<_, UserCredentials>(
            r#"
            SELECT email, password_hash
            FROM users
            WHERE lower(email) = lower($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(creds)
    }

    async fn exists_by_email(&self, email: &str, exclude_id: Option<i64>) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM users
                WHERE lower(email) = lower($1) AND ($2::BIGINT IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(email)
        .bind(exclude_id)
        .fetch_one(&self.db)
        .await?;
        Ok(exists)
    }

    async fn insert(&self, user: NewUser) -> StoreResult<User> {
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (full_name, email, password_hash, active)
            VALUES ($1, $2, $3, TRUE)
            RETURNING id, full_name, email, password_hash, active
            "#,
        )
        .bind(&user.full_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.db)
        .await?;
        Ok(created)
    }

    async fn update_profile(
        &self,
        id: i64,
        full_name: &str,
        email: &str,
    ) -> StoreResult<Option<User>> {
        let updated = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET full_name = $2, email = $3, updated_at = now()
             WHERE id = $1
            RETURNING id, full_name, email, password_hash, active
            "#,
        )
        .bind(id)
        .bind(full_name)
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(updated)
    }

    async fn toggle_active(&self, id: i64) -> StoreResult<Option<User>> {
        let toggled = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET active = NOT active, updated_at = now()
             WHERE id = $1
            RETURNING id, full_name, email, password_hash, active
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(toggled)
    }

    async fn delete_by_id(&self, id: i64) -> StoreResult<bool> {
        let res = sqlx::query(r#"DELETE FROM users WHERE id = $1"#)
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
