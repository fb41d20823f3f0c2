use std::time::Duration;

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::registry::TaskRegistry;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// The durable queue: a `tasks` table polled by a fixed worker pool per
/// named queue.
#[derive(Clone)]
pub struct DbTaskQueue {
    pool: SqlitePool,
}

impl DbTaskQueue {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn enqueue(
        &self,
        queue: &str,
        task_name: &str,
        payload: &impl serde::Serialize,
    ) -> Result<(), QueueError> {
        let id = Uuid::new_v4().to_string();
        let payload = serde_json::to_string(payload)?;
        sqlx::query(
            r#"INSERT INTO tasks (id, queue, task_name, payload, status)
               VALUES (?, ?, ?, ?, 'pending')"#,
        )
        .bind(id)
        .bind(queue)
        .bind(task_name)
        .bind(payload)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Reset any `claimed` task back to `pending` on startup, so a task
    /// owned by a worker that crashed mid-run is picked up again instead
    /// of staying stuck forever.
    pub async fn recover_stuck_tasks(&self) -> Result<u64, QueueError> {
        let result = sqlx::query("UPDATE tasks SET status = 'pending', claimed_at = NULL WHERE status = 'claimed'")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn claim_next(&self, queue: &str) -> Result<Option<(String, String, String)>, QueueError> {
        let candidate: Option<(String,)> = sqlx::query_as(
            "SELECT id FROM tasks WHERE queue = ? AND status = 'pending' ORDER BY created_at LIMIT 1",
        )
        .bind(queue)
        .fetch_optional(&self.pool)
        .await?;

        let Some((id,)) = candidate else {
            return Ok(None);
        };

        let claimed = sqlx::query(
            "UPDATE tasks SET status = 'claimed', claimed_at = ? WHERE id = ? AND status = 'pending'",
        )
        .bind(Utc::now())
        .bind(&id)
        .execute(&self.pool)
        .await?;

        if claimed.rows_affected() == 0 {
            // Another worker claimed it between the select and the update.
            return Ok(None);
        }

        let row: (String, String) =
            sqlx::query_as("SELECT task_name, payload FROM tasks WHERE id = ?")
                .bind(&id)
                .fetch_one(&self.pool)
                .await?;

        Ok(Some((id, row.0, row.1)))
    }

    async fn delete(&self, id: &str) -> Result<(), QueueError> {
        sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Spawn `concurrency` Tokio workers polling `queue`, each running
    /// bound handlers from `registry`. Returns their join handles so the
    /// caller can hold them for the process lifetime.
    pub fn spawn_workers(
        &self,
        queue: &'static str,
        concurrency: usize,
        registry: TaskRegistry,
    ) -> Vec<tokio::task::JoinHandle<()>> {
        (0..concurrency)
            .map(|worker_index| {
                let queue_handle = self.clone();
                let registry = registry.clone();
                tokio::spawn(async move {
                    loop {
                        match queue_handle.claim_next(queue).await {
                            Ok(Some((id, task_name, payload))) => {
                                let span = tracing::info_span!(
                                    "task",
                                    queue,
                                    worker_index,
                                    task_name = %task_name
                                );
                                let _enter = span.enter();
                                match serde_json::from_str::<serde_json::Value>(&payload) {
                                    Ok(args) => {
                                        if let Some(task) = registry.get(&task_name) {
                                            if let Err(e) = task.run(args).await {
                                                tracing::error!(error = %e, "task handler failed");
                                            }
                                        } else {
                                            tracing::error!("no handler registered for task");
                                        }
                                    }
                                    Err(e) => tracing::error!(error = %e, "malformed task payload"),
                                }
                                if let Err(e) = queue_handle.delete(&id).await {
                                    tracing::error!(error = %e, "failed to remove completed task");
                                }
                            }
                            Ok(None) => tokio::time::sleep(POLL_INTERVAL).await,
                            Err(e) => {
                                tracing::error!(error = %e, "queue poll failed");
                                tokio::time::sleep(POLL_INTERVAL).await;
                            }
                        }
                    }
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingTask {
        count: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl super::super::registry::Task for CountingTask {
        fn name(&self) -> &'static str {
            "count"
        }
        async fn run(&self, _payload: serde_json::Value) -> Result<(), anyhow::Error> {
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    async fn memory_pool() -> SqlitePool {
        use sqlx::sqlite::SqlitePoolOptions;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn enqueue_and_process_one_task() {
        let pool = memory_pool().await;
        let queue = DbTaskQueue::new(pool);
        queue
            .enqueue(super::super::DEFAULT_QUEUE, "count", &serde_json::json!({}))
            .await
            .unwrap();

        let count = Arc::new(AtomicUsize::new(0));
        let mut registry = TaskRegistry::new();
        registry.register(Arc::new(CountingTask {
            count: count.clone(),
        }));

        let handles = queue.spawn_workers(super::super::DEFAULT_QUEUE, 1, registry);
        tokio::time::sleep(Duration::from_millis(400)).await;
        for h in handles {
            h.abort();
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recover_stuck_tasks_resets_claimed_rows() {
        let pool = memory_pool().await;
        let queue = DbTaskQueue::new(pool.clone());
        sqlx::query("INSERT INTO tasks (id, queue, task_name, payload, status) VALUES ('x', 'default', 'count', '{}', 'claimed')")
            .execute(&pool)
            .await
            .unwrap();

        let reset = queue.recover_stuck_tasks().await.unwrap();
        assert_eq!(reset, 1);

        let row: (String,) = sqlx::query_as("SELECT status FROM tasks WHERE id = 'x'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(row.0, "pending");
    }
}
