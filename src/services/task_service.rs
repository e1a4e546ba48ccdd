use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

use super::error::ServiceError;
use super::validation::{self, Validator};
use crate::database::models::{Task, User};
use crate::database::Store;
use crate::filter::{Filter, ListParams, TaskQuery};

const TASK_FIELDS: &[&str] = &["description", "completed"];

/// Task operations. Every call takes the authenticated caller and only ever
/// touches tasks that caller owns.
#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn Store>,
    max_limit: Option<u32>,
}

impl TaskService {
    pub fn new(store: Arc<dyn Store>, max_limit: Option<u32>) -> Self {
        Self { store, max_limit }
    }

    pub fn parse_query(&self, params: &ListParams) -> Result<TaskQuery, ServiceError> {
        Ok(Filter::parse(params, self.max_limit)?)
    }

    /// The request body may carry any keys; only `description` and
    /// `completed` are read and the owner always comes from `caller`.
    pub async fn create(&self, caller: &User, body: &Map<String, Value>) -> Result<Task, ServiceError> {
        let mut v = Validator::new();
        let description = v.check(
            "description",
            match body.get("description") {
                None | Some(Value::Null) => validation::required(None),
                Some(raw) => validation::as_string(raw).and_then(|d| validation::description(&d)),
            },
        );
        let completed = match body.get("completed") {
            None | Some(Value::Null) => Some(false),
            Some(raw) => v.check("completed", validation::completed(raw)),
        };
        v.finish()?;

        let (Some(description), Some(completed)) = (description, completed) else {
            return Err(ServiceError::internal("validator passed with missing fields"));
        };

        let task = Task::new(caller.id, description, completed);
        self.store.insert_task(&task).await?;
        tracing::debug!("User {} created task {}", caller.id, task.id);
        Ok(task)
    }

    pub async fn get(&self, caller: &User, id: &str) -> Result<Task, ServiceError> {
        let id = parse_id(id)?;
        self.store.find_task(caller.id, id).await?.ok_or(ServiceError::NotFound)
    }

    pub async fn list(&self, caller: &User, query: &TaskQuery) -> Result<Vec<Task>, ServiceError> {
        Ok(self.store.find_tasks(caller.id, query).await?)
    }

    pub async fn update(&self, caller: &User, id: &str, updates: Map<String, Value>) -> Result<Task, ServiceError> {
        validation::check_allowed_keys(&updates, TASK_FIELDS)?;
        let mut task = self.get(caller, id).await?;

        let mut v = Validator::new();
        for (key, value) in updates.iter() {
            match key.as_str() {
                "description" => {
                    if let Some(d) = v.check(
                        "description",
                        validation::as_string(value).and_then(|d| validation::description(&d)),
                    ) {
                        task.description = d;
                    }
                }
                "completed" => {
                    if let Some(c) = v.check("completed", validation::completed(value)) {
                        task.completed = c;
                    }
                }
                _ => return Err(ServiceError::invalid_updates()),
            }
        }
        v.finish()?;

        task.updated_at = Utc::now();
        self.store.update_task(&task).await?;
        Ok(task)
    }

    pub async fn delete(&self, caller: &User, id: &str) -> Result<Task, ServiceError> {
        let id = parse_id(id)?;
        let task = self.store.delete_task(caller.id, id).await?.ok_or(ServiceError::NotFound)?;
        tracing::debug!("User {} deleted task {}", caller.id, task.id);
        Ok(task)
    }
}

/// Malformed ids can't name any task, so they are `NotFound` too.
fn parse_id(id: &str) -> Result<Uuid, ServiceError> {
    Uuid::parse_str(id).map_err(|_| ServiceError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use serde_json::json;

    async fn setup() -> (TaskService, User, User) {
        let store = Arc::new(MemoryStore::new());
        let alice = User::new("Alice".into(), "alice@example.com".into(), "hash".into(), 0);
        let bob = User::new("Bob".into(), "bob@example.com".into(), "hash".into(), 0);
        store.insert_user(&alice).await.unwrap();
        store.insert_user(&bob).await.unwrap();
        (TaskService::new(store, Some(100)), alice, bob)
    }

    fn body(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn create_ignores_supplied_owner() {
        let (tasks, alice, bob) = setup().await;
        let task = tasks
            .create(&alice, &body(json!({"description": "  buy milk ", "owner": bob.id})))
            .await
            .unwrap();
        assert_eq!(task.owner, alice.id);
        assert_eq!(task.description, "buy milk");
        assert!(!task.completed);
    }

    #[tokio::test]
    async fn create_requires_description() {
        let (tasks, alice, _) = setup().await;
        for bad in [json!({}), json!({"description": "   "}), json!({"description": 5})] {
            let err = tasks.create(&alice, &body(bad)).await.unwrap_err();
            assert!(matches!(err, ServiceError::Validation { ref field_errors, .. } if field_errors.contains_key("description")));
        }
    }

    #[tokio::test]
    async fn other_owners_tasks_are_not_found() {
        let (tasks, alice, bob) = setup().await;
        let task = tasks.create(&alice, &body(json!({"description": "private"}))).await.unwrap();
        let id = task.id.to_string();

        assert!(matches!(tasks.get(&bob, &id).await, Err(ServiceError::NotFound)));
        assert!(matches!(
            tasks.update(&bob, &id, body(json!({"completed": true}))).await,
            Err(ServiceError::NotFound)
        ));
        assert!(matches!(tasks.delete(&bob, &id).await, Err(ServiceError::NotFound)));

        let still_there = tasks.get(&alice, &id).await.unwrap();
        assert!(!still_there.completed);
        assert!(matches!(tasks.get(&alice, "garbage").await, Err(ServiceError::NotFound)));
    }

    #[tokio::test]
    async fn update_rejects_unknown_keys_without_mutation() {
        let (tasks, alice, bob) = setup().await;
        let task = tasks.create(&alice, &body(json!({"description": "original"}))).await.unwrap();
        let id = task.id.to_string();

        let err = tasks
            .update(&alice, &id, body(json!({"description": "changed", "owner": bob.id})))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation { ref message, .. } if message == "Invalid Updates!"));

        let stored = tasks.get(&alice, &id).await.unwrap();
        assert_eq!(stored.description, "original");
        assert_eq!(stored.owner, alice.id);

        let updated = tasks
            .update(&alice, &id, body(json!({"description": "changed", "completed": true})))
            .await
            .unwrap();
        assert_eq!(updated.description, "changed");
        assert!(updated.completed);
    }

    #[tokio::test]
    async fn delete_returns_prior_state() {
        let (tasks, alice, _) = setup().await;
        let task = tasks.create(&alice, &body(json!({"description": "gone", "completed": true}))).await.unwrap();
        let deleted = tasks.delete(&alice, &task.id.to_string()).await.unwrap();
        assert_eq!(deleted.id, task.id);
        assert!(deleted.completed);
        assert!(matches!(tasks.get(&alice, &task.id.to_string()).await, Err(ServiceError::NotFound)));
    }

    #[tokio::test]
    async fn list_filters_sorts_and_pages() {
        let (tasks, alice, bob) = setup().await;
        for i in 0..6 {
            tasks
                .create(&alice, &body(json!({"description": format!("a{}", i), "completed": i % 2 == 0})))
                .await
                .unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        tasks.create(&bob, &body(json!({"description": "b", "completed": true}))).await.unwrap();

        let params = ListParams {
            completed: Some("true".into()),
            ..Default::default()
        };
        let done = tasks.list(&alice, &tasks.parse_query(&params).unwrap()).await.unwrap();
        assert_eq!(done.len(), 3);
        assert!(done.iter().all(|t| t.completed && t.owner == alice.id));

        let params = ListParams {
            sort_by: Some("createdAt:desc".into()),
            ..Default::default()
        };
        let newest_first = tasks.list(&alice, &tasks.parse_query(&params).unwrap()).await.unwrap();
        assert_eq!(newest_first.len(), 6);
        assert!(newest_first.windows(2).all(|w| w[0].created_at >= w[1].created_at));

        let params = ListParams {
            sort_by: Some("createdAt:desc".into()),
            limit: Some("2".into()),
            skip: Some("1".into()),
            ..Default::default()
        };
        let page = tasks.list(&alice, &tasks.parse_query(&params).unwrap()).await.unwrap();
        let expected: Vec<Uuid> = newest_first[1..3].iter().map(|t| t.id).collect();
        assert_eq!(page.iter().map(|t| t.id).collect::<Vec<_>>(), expected);

        let unsorted = tasks.list(&alice, &TaskQuery::default()).await.unwrap();
        let order: Vec<&str> = unsorted.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(order, vec!["a0", "a1", "a2", "a3", "a4", "a5"]);
    }

    #[tokio::test]
    async fn bad_query_values_are_validation_errors() {
        let (tasks, _, _) = setup().await;
        let params = ListParams {
            limit: Some("ten".into()),
            ..Default::default()
        };
        let err = tasks.parse_query(&params).unwrap_err();
        assert!(matches!(err, ServiceError::Validation { ref field_errors, .. } if field_errors.contains_key("limit")));
    }
}
