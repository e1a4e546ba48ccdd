use async_trait::async_trait;
use sqlx::{postgres::PgArguments, PgPool};
use uuid::Uuid;

use super::manager::DatabaseManager;
use super::models::{Task, User};
use super::store::{Store, StoreError};
use crate::filter::{Filter, SqlParam, TaskQuery};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fails with `NotFound` when an UPDATE touched no row.
    fn expect_row(rows_affected: u64) -> Result<(), StoreError> {
        if rows_affected == 0 {
            Err(StoreError::NotFound)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        DatabaseManager::health_check(&self.pool).await?;
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, age, avatar, tokens, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.age)
        .bind(&user.avatar)
        .bind(&user.tokens)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE lower(email) = lower($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn update_profile(&self, user: &User) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET name = $2, email = $3, password_hash = $4, age = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.age)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;
        Self::expect_row(result.rows_affected())
    }

    async fn set_avatar(&self, id: Uuid, avatar: Option<Vec<u8>>) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET avatar = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(avatar)
            .execute(&self.pool)
            .await?;
        Self::expect_row(result.rows_affected())
    }

    async fn push_session(&self, id: Uuid, token: &str, stale: &[String]) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users SET tokens = array_append(
                ARRAY(
                    SELECT t FROM unnest(tokens) WITH ORDINALITY AS s(t, n)
                    WHERE t <> ALL($3::text[])
                    ORDER BY n
                ),
                $2
            )
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token)
        .bind(stale)
        .execute(&self.pool)
        .await?;
        Self::expect_row(result.rows_affected())
    }

    async fn pull_session(&self, id: Uuid, token: &str) -> Result<(), StoreError> {
        // tokens carry a unique jti, so array_remove drops exactly one entry
        let result = sqlx::query("UPDATE users SET tokens = array_remove(tokens, $2) WHERE id = $1")
            .bind(id)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Self::expect_row(result.rows_affected())
    }

    async fn clear_sessions(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET tokens = '{}' WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Self::expect_row(result.rows_affected())
    }

    async fn delete_user_cascade(&self, id: Uuid) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await.map_err(cascade_fault)?;

        // Row lock first: concurrent task inserts wait on the FK check
        // instead of slipping in between the two deletes.
        let locked = sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(cascade_fault)?;
        if locked.is_none() {
            tx.rollback().await.map_err(cascade_fault)?;
            return Err(StoreError::NotFound);
        }

        let tasks = sqlx::query("DELETE FROM tasks WHERE owner = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(cascade_fault)?
            .rows_affected();

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(cascade_fault)?;

        tx.commit().await.map_err(cascade_fault)?;
        Ok(tasks)
    }

    async fn insert_task(&self, task: &Task) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO tasks (id, description, completed, owner, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(task.id)
        .bind(&task.description)
        .bind(task.completed)
        .bind(task.owner)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_task(&self, owner: Uuid, id: Uuid) -> Result<Option<Task>, StoreError> {
        let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1 AND owner = $2")
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?;
        Ok(task)
    }

    async fn find_tasks(&self, owner: Uuid, query: &TaskQuery) -> Result<Vec<Task>, StoreError> {
        let sql_result = Filter::new(owner, query.clone()).to_sql();
        let mut q = sqlx::query_as::<_, Task>(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query_as(q, p);
        }
        let rows = q.fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn update_task(&self, task: &Task) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET description = $3, completed = $4, updated_at = $5
            WHERE id = $1 AND owner = $2
            "#,
        )
        .bind(task.id)
        .bind(task.owner)
        .bind(&task.description)
        .bind(task.completed)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await?;
        Self::expect_row(result.rows_affected())
    }

    async fn delete_task(&self, owner: Uuid, id: Uuid) -> Result<Option<Task>, StoreError> {
        let task = sqlx::query_as::<_, Task>("DELETE FROM tasks WHERE id = $1 AND owner = $2 RETURNING *")
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?;
        Ok(task)
    }
}

fn bind_param_query_as<'q, O>(
    q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    v: &'q SqlParam,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow>,
{
    match v {
        SqlParam::Uuid(id) => q.bind(*id),
        SqlParam::Bool(b) => q.bind(*b),
    }
}

/// Inside the cascade every failure is a storage fault, including constraint
/// violations that would otherwise read as a missing owner or a duplicate.
fn cascade_fault(err: sqlx::Error) -> StoreError {
    tracing::error!("User cascade failed: {}", err);
    StoreError::Fault(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ServiceError;

    #[test]
    fn cascade_errors_surface_as_internal() {
        for err in [sqlx::Error::PoolTimedOut, sqlx::Error::RowNotFound] {
            let store_err = cascade_fault(err);
            assert!(matches!(store_err, StoreError::Fault(_)));
            assert!(matches!(ServiceError::from(store_err), ServiceError::Internal(_)));
        }
    }
}
