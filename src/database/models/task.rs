use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub description: String,
    pub completed: bool,
    pub owner: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(owner: Uuid, description: String, completed: bool) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            description,
            completed,
            owner,
            created_at: now,
            updated_at: now,
        }
    }
}
