use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::users::repo::{StoreError, StoreResult, UserStore};
use crate::users::repo_types::{NewUser, User, UserCredentials, UserSummary};

#[derive(Default)]
struct Table {
    rows: BTreeMap<i64, User>,
    last_id: i64,
}

/// In-memory `UserStore` for tests. Enforces email uniqueness on write like the real table.
#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    table: Arc<RwLock<Table>>,
    failing: Arc<AtomicBool>,
    failing_writes: Arc<AtomicBool>,
    blind_email_check: Arc<AtomicBool>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every subsequent call fails with a database error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Reads keep working, every write fails with a database error.
    pub fn set_failing_writes(&self, failing: bool) {
        self.failing_writes.store(failing, Ordering::SeqCst);
    }

    /// `exists_by_email` always answers `false`, simulating a lost race.
    pub fn set_blind_email_check(&self, blind: bool) {
        self.blind_email_check.store(blind, Ordering::SeqCst);
    }

    pub async fn row_count(&self) -> usize {
        self.table.read().await.rows.len()
    }

    fn check(&self) -> StoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn check_write(&self) -> StoreResult<()> {
        self.check()?;
        if self.failing_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

fn email_taken(table: &Table, email: &str, exclude_id: Option<i64>) -> bool {
    table
        .rows
        .values()
        .any(|u| u.email.eq_ignore_ascii_case(email) && Some(u.id) != exclude_id)
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn list(&self) -> StoreResult<Vec<UserSummary>> {
        self.check()?;
        let table = self.table.read().await;
        Ok(table.rows.values().cloned().map(UserSummary::from).collect())
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        self.check()?;
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn find_credentials(&self, email: &str) -> StoreResult<Option<UserCredentials>> {
        self.check()?;
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .map(|u| UserCredentials {
                email: u.email.clone(),
                password_hash: u.password_hash.clone(),
            }))
    }

    async fn exists_by_email(&self, email: &str, exclude_id: Option<i64>) -> StoreResult<bool> {
        self.check()?;
        if self.blind_email_check.load(Ordering::SeqCst) {
            return Ok(false);
        }
        Ok(email_taken(&*self.table.read().await, email, exclude_id))
    }

    async fn insert(&self, user: NewUser) -> StoreResult<User> {
        self.check_write()?;
        let mut table = self.table.write().await;
        if email_taken(&table, &user.email, None) {
            return Err(StoreError::DuplicateEmail);
        }
        table.last_id += 1;
        let row = User {
            id: table.last_id,
            full_name: user.full_name,
            email: user.email,
            password_hash: user.password_hash,
            active: true,
        };
        table.rows.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_profile(
        &self,
        id: i64,
        full_name: &str,
        email: &str,
    ) -> StoreResult<Option<User>> {
        self.check_write()?;
        let mut table = self.table.write().await;
        if !table.rows.contains_key(&id) {
            return Ok(None);
        }
        if email_taken(&table, email, Some(id)) {
            return Err(StoreError::DuplicateEmail);
        }
        let row = table.rows.get_mut(&id).map(|u| {
            u.full_name = full_name.to_string();
            u.email = email.to_string();
            u.clone()
        });
        Ok(row)
    }

    async fn toggle_active(&self, id: i64) -> StoreResult<Option<User>> {
        self.check_write()?;
        let mut table = self.table.write().await;
        Ok(table.rows.get_mut(&id).map(|u| {
            u.active = !u.active;
            u.clone()
        }))
    }

    async fn delete_by_id(&self, id: i64) -> StoreResult<bool> {
        self.check_write()?;
        Ok(self.table.write().await.rows.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            full_name: "Test User".into(),
            email: email.into(),
            password_hash: "hash".into(),
        }
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_delete() {
        let store = InMemoryUserStore::new();
        let a = store.insert(new_user("a@example.com")).await.unwrap();
        assert!(store.delete_by_id(a.id).await.unwrap());
        let b = store.insert(new_user("b@example.com")).await.unwrap();
        assert!(b.id > a.id);
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_email() {
        let store = InMemoryUserStore::new();
        store.insert(new_user("a@example.com")).await.unwrap();
        let err = store.insert(new_user("a@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
    }

    #[tokio::test]
    async fn email_uniqueness_ignores_case() {
        let store = InMemoryUserStore::new();
        store.insert(new_user("a@example.com")).await.unwrap();
        assert!(store.exists_by_email("A@Example.com", None).await.unwrap());
        let err = store.insert(new_user("A@EXAMPLE.COM")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
    }

    #[tokio::test]
    async fn failing_writes_leave_reads_working() {
        let store = InMemoryUserStore::new();
        let a = store.insert(new_user("a@example.com")).await.unwrap();
        store.set_failing_writes(true);
        assert!(store.exists_by_email("b@example.com", None).await.is_ok());
        assert!(store.find_by_id(a.id).await.unwrap().is_some());
        assert!(store.toggle_active(a.id).await.is_err());
        assert!(store.delete_by_id(a.id).await.is_err());
    }

    #[tokio::test]
    async fn exists_by_email_honours_exclusion() {
        let store = InMemoryUserStore::new();
        let a = store.insert(new_user("a@example.com")).await.unwrap();
        assert!(store.exists_by_email("a@example.com", None).await.unwrap());
        assert!(!store.exists_by_email("a@example.com", Some(a.id)).await.unwrap());
    }
}
