use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{Task, User};
use super::store::{Store, StoreError};
use crate::filter::{Filter, TaskQuery};

const NO_FAULT: usize = usize::MAX;

#[derive(Default)]
struct Collections {
    users: HashMap<Uuid, User>,
    /// Insertion order is the storage order seen by unsorted listings.
    tasks: Vec<Task>,
}

/// Process-local store used by the `memory` backend and the test suites.
///
/// All writes take the single write lock, which gives every operation,
/// including the identity cascade, document-level atomicity.
pub struct MemoryStore {
    inner: RwLock<Collections>,
    cascade_fault_after: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Collections::default()),
            cascade_fault_after: AtomicUsize::new(NO_FAULT),
        }
    }

    /// Makes the next cascade fail after `n` task deletions have been staged.
    pub fn fail_cascade_after(&self, n: usize) {
        self.cascade_fault_after.store(n, Ordering::SeqCst);
    }

    fn email_taken(users: &HashMap<Uuid, User>, email: &str, except: Option<Uuid>) -> bool {
        users
            .values()
            .any(|u| Some(u.id) != except && u.email.eq_ignore_ascii_case(email))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if Self::email_taken(&inner.users, &user.email, None) {
            return Err(StoreError::Duplicate("email"));
        }
        inner.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email.eq_ignore_ascii_case(email)).cloned())
    }

    async fn update_profile(&self, user: &User) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if Self::email_taken(&inner.users, &user.email, Some(user.id)) {
            return Err(StoreError::Duplicate("email"));
        }
        let stored = inner.users.get_mut(&user.id).ok_or(StoreError::NotFound)?;
        stored.name = user.name.clone();
        stored.email = user.email.clone();
        stored.password_hash = user.password_hash.clone();
        stored.age = user.age;
        stored.updated_at = user.updated_at;
        Ok(())
    }

    async fn set_avatar(&self, id: Uuid, avatar: Option<Vec<u8>>) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let stored = inner.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        stored.avatar = avatar;
        stored.updated_at = Utc::now();
        Ok(())
    }

    async fn push_session(&self, id: Uuid, token: &str, stale: &[String]) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let stored = inner.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        stored.tokens.retain(|t| !stale.contains(t));
        stored.tokens.push(token.to_string());
        Ok(())
    }

    async fn pull_session(&self, id: Uuid, token: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let stored = inner.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        if let Some(pos) = stored.tokens.iter().position(|t| t == token) {
            stored.tokens.remove(pos);
        }
        Ok(())
    }

    async fn clear_sessions(&self, id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let stored = inner.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        stored.tokens.clear();
        Ok(())
    }

    async fn delete_user_cascade(&self, id: Uuid) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&id) {
            return Err(StoreError::NotFound);
        }

        let fault_after = self.cascade_fault_after.swap(NO_FAULT, Ordering::SeqCst);

        // Stage the surviving tasks, then commit both collections together.
        let mut staged = Vec::with_capacity(inner.tasks.len());
        let mut removed: u64 = 0;
        for task in inner.tasks.iter() {
            if task.owner != id {
                staged.push(task.clone());
                continue;
            }
            if removed as usize >= fault_after {
                return Err(StoreError::Fault(format!(
                    "simulated failure after deleting {} of the owner's tasks",
                    removed
                )));
            }
            removed += 1;
        }

        inner.tasks = staged;
        inner.users.remove(&id);
        Ok(removed)
    }

    async fn insert_task(&self, task: &Task) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&task.owner) {
            return Err(StoreError::MissingOwner);
        }
        inner.tasks.push(task.clone());
        Ok(())
    }

    async fn find_task(&self, owner: Uuid, id: Uuid) -> Result<Option<Task>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.tasks.iter().find(|t| t.id == id && t.owner == owner).cloned())
    }

    async fn find_tasks(&self, owner: Uuid, query: &TaskQuery) -> Result<Vec<Task>, StoreError> {
        let inner = self.inner.read().await;
        Ok(Filter::new(owner, query.clone()).apply(&inner.tasks))
    }

    async fn update_task(&self, task: &Task) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .tasks
            .iter_mut()
            .find(|t| t.id == task.id && t.owner == task.owner)
            .ok_or(StoreError::NotFound)?;
        stored.description = task.description.clone();
        stored.completed = task.completed;
        stored.updated_at = task.updated_at;
        Ok(())
    }

    async fn delete_task(&self, owner: Uuid, id: Uuid) -> Result<Option<Task>, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.tasks.iter().position(|t| t.id == id && t.owner == owner) {
            Some(pos) => Ok(Some(inner.tasks.remove(pos))),
            None => Ok(None),
        }
    }
}
