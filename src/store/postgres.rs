use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use crate::domain::{Image, Status, Task};

use super::{StoreError, TaskStore};

/// The durable state store variant. Connects through a pooled,
/// pre-pinging `PgPool` so idle database disconnects surface as a
/// retried acquire rather than a permanent failure (§4.1).
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    #[tracing::instrument(skip(url), err)]
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .test_before_acquire(true)
            .connect(url)
            .await?;

        tracing::info!("connected to postgres");

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("migrations applied");

        Ok(Self { pool })
    }

    /// `SELECT 1` health probe. A pending-rollback error is rolled back
    /// before reporting down, so a single bad transaction doesn't wedge
    /// every later health check on this pool.
    async fn check_connection(&self) -> bool {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => true,
            Err(err) => {
                tracing::error!(error = %err, "postgres health check failed");
                if let Ok(mut conn) = self.pool.acquire().await {
                    let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                }
                false
            }
        }
    }
}

fn row_to_task(row: &sqlx::postgres::PgRow) -> Result<Task, StoreError> {
    let images: Json<Vec<Image>> = row.try_get("images")?;
    let status: String = row.try_get("status")?;
    Ok(Task {
        id: row.try_get("id")?,
        app: row.try_get("app")?,
        author: row.try_get("author")?,
        project: row.try_get("project")?,
        images: images.0,
        status: Status::parse(&status).unwrap_or(Status::Failed),
        created: row.try_get("created")?,
        updated: row.try_get::<Option<f64>, _>("updated")?.unwrap_or(0.0),
    })
}

#[async_trait]
impl TaskStore for PostgresStore {
    async fn set_current_task(&self, task: Task, status: Status) -> Result<(), StoreError> {
        let created = crate::time::now_secs();
        let result = sqlx::query(
            "INSERT INTO tasks (id, created, updated, images, status, app, author, project) \
             VALUES ($1, $2, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&task.id)
        .bind(created)
        .bind(Json(&task.images))
        .bind(status.as_str())
        .bind(&task.app)
        .bind(&task.author)
        .bind(&task.project)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23505") => {
                Err(StoreError::Conflict(task.id))
            }
            Err(err) => Err(StoreError::Db(err)),
        }
    }

    async fn get_task_status(&self, id: &str) -> Result<Status, StoreError> {
        let row = sqlx::query("SELECT status FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(match row {
            Some(row) => {
                let status: String = row.try_get("status")?;
                Status::parse(&status).unwrap_or(Status::TaskNotFound)
            }
            None => Status::TaskNotFound,
        })
    }

    async fn update_task(&self, id: &str, status: Status) -> Result<(), StoreError> {
        let updated = crate::time::now_secs();
        sqlx::query("UPDATE tasks SET status = $1, updated = $2 WHERE id = $3")
            .bind(status.as_str())
            .bind(updated)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_state(
        &self,
        from_ts: f64,
        to_ts: Option<f64>,
        app: Option<&str>,
    ) -> Result<Vec<Task>, StoreError> {
        let to_ts = to_ts.unwrap_or_else(crate::time::now_secs);
        let rows = sqlx::query(
            "SELECT id, created, updated, images, status, app, author, project FROM tasks \
             WHERE created >= $1 AND created <= $2 AND ($3::text IS NULL OR app = $3)",
        )
        .bind(from_ts)
        .bind(to_ts)
        .bind(app)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_task).collect()
    }

    async fn get_app_list(&self) -> Result<HashSet<String>, StoreError> {
        let rows = sqlx::query("SELECT DISTINCT app FROM tasks")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("app").map_err(StoreError::from))
            .collect()
    }

    async fn health(&self) -> bool {
        self.check_connection().await
    }
}
