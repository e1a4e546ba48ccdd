use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::{Task, User};
use crate::filter::TaskQuery;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Duplicate value for unique field: {0}")]
    Duplicate(&'static str),

    #[error("Record not found")]
    NotFound,

    #[error("Owner does not exist")]
    MissingOwner,

    #[error("Storage fault: {0}")]
    Fault(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return StoreError::Duplicate("email");
            }
            if db.is_foreign_key_violation() {
                return StoreError::MissingOwner;
            }
        }
        StoreError::Database(DatabaseError::Sqlx(err))
    }
}

/// Durable storage for identities and their tasks.
///
/// Every task lookup takes the owner id; there is no way to reach a task
/// through this trait without naming the identity that owns it.
#[async_trait]
pub trait Store: Send + Sync {
    async fn health_check(&self) -> Result<(), StoreError>;

    /// Fails with `Duplicate("email")` if the (case-insensitive) email is taken.
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Writes name, email, password hash, age and `updated_at` only.
    async fn update_profile(&self, user: &User) -> Result<(), StoreError>;

    async fn set_avatar(&self, id: Uuid, avatar: Option<Vec<u8>>) -> Result<(), StoreError>;

    /// Appends `token` and drops every entry listed in `stale`, in one write.
    async fn push_session(&self, id: Uuid, token: &str, stale: &[String]) -> Result<(), StoreError>;

    async fn pull_session(&self, id: Uuid, token: &str) -> Result<(), StoreError>;

    async fn clear_sessions(&self, id: Uuid) -> Result<(), StoreError>;

    /// Deletes the identity and every task it owns as one unit. Returns the
    /// number of tasks removed; on error nothing is removed.
    async fn delete_user_cascade(&self, id: Uuid) -> Result<u64, StoreError>;

    async fn insert_task(&self, task: &Task) -> Result<(), StoreError>;

    async fn find_task(&self, owner: Uuid, id: Uuid) -> Result<Option<Task>, StoreError>;

    async fn find_tasks(&self, owner: Uuid, query: &TaskQuery) -> Result<Vec<Task>, StoreError>;

    /// Writes description, completed and `updated_at` of the task matching
    /// both `task.id` and `task.owner`.
    async fn update_task(&self, task: &Task) -> Result<(), StoreError>;

    async fn delete_task(&self, owner: Uuid, id: Uuid) -> Result<Option<Task>, StoreError>;
}
