use std::sync::Mutex;

use async_trait::async_trait;
use brain_core::types::{RecurrenceConfig, Task, TaskId, TaskStatus, UserContext, UserId};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::SchedulerError;

/// External collaborator for the task side of a fired job. Task CRUD itself
/// lives outside this crate; the Scheduler only needs to load a task to
/// check it's still pending (at-least-once delivery means a handler can run
/// twice) and to record the outcome once it has.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn load_task(&self, task_id: &TaskId) -> Result<Option<Task>, SchedulerError>;
    async fn mark_done(&self, task_id: &TaskId) -> Result<(), SchedulerError>;
    async fn update_recurrence(
        &self,
        task_id: &TaskId,
        next_execution: DateTime<Utc>,
        execution_count: u32,
    ) -> Result<(), SchedulerError>;
}

/// External collaborator resolving the [`UserContext`] a fired job's percept
/// needs — `JobPayload` carries only a `user_id`, and user CRUD is likewise
/// out of scope here.
#[async_trait]
pub trait UserContextResolver: Send + Sync {
    async fn resolve(&self, user_id: &UserId) -> Result<UserContext, SchedulerError>;
}

/// Reads and writes exactly the columns of the `task` table the scheduler
/// itself needs — loading a task to check it's still pending, and recording
/// the outcome once a job fires. Everything else about task lifecycle
/// (creation, listing, editing) belongs to the out-of-scope CRUD layer that
/// owns the rest of this table.
pub struct SqliteTaskStore {
    conn: Mutex<Connection>,
}

impl SqliteTaskStore {
    pub fn new(conn: Connection) -> Result<Self, SchedulerError> {
        crate::db::init_db(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn load_task(&self, task_id: &TaskId) -> Result<Option<Task>, SchedulerError> {
        let conn = self.conn.lock().expect("task store mutex poisoned");
        let row = conn
            .query_row(
                "SELECT id, user_id, title, description, status, priority, tags, scheduled_at, due_at,
                        is_recurring, recurrence_config, parent_task_id, next_execution, execution_count, metadata
                 FROM task WHERE id = ?1",
                params![task_id.as_str()],
                row_to_task,
            )
            .optional()?;
        Ok(row)
    }

    async fn mark_done(&self, task_id: &TaskId) -> Result<(), SchedulerError> {
        let conn = self.conn.lock().expect("task store mutex poisoned");
        conn.execute("UPDATE task SET status = 'done' WHERE id = ?1", params![task_id.as_str()])?;
        Ok(())
    }

    async fn update_recurrence(
        &self,
        task_id: &TaskId,
        next_execution: DateTime<Utc>,
        execution_count: u32,
    ) -> Result<(), SchedulerError> {
        let conn = self.conn.lock().expect("task store mutex poisoned");
        conn.execute(
            "UPDATE task SET next_execution = ?2, execution_count = ?3 WHERE id = ?1",
            params![task_id.as_str(), next_execution.to_rfc3339(), execution_count],
        )?;
        Ok(())
    }
}

fn row_to_task(row: &rusqlite::Row) -> rusqlite::Result<Task> {
    let status: String = row.get(4)?;
    let tags: String = row.get(6)?;
    let recurrence_config: Option<String> = row.get(10)?;
    let metadata: String = row.get(14)?;

    Ok(Task {
        id: TaskId::from(row.get::<_, String>(0)?),
        user_id: UserId::from(row.get::<_, String>(1)?),
        title: row.get(2)?,
        description: row.get(3)?,
        status: parse_task_status(&status),
        priority: row.get(5)?,
        tags: serde_json::from_str(&tags).unwrap_or_default(),
        scheduled_at: parse_optional_ts(row.get::<_, Option<String>>(7)?),
        due_at: parse_optional_ts(row.get::<_, Option<String>>(8)?),
        is_recurring: row.get::<_, i64>(9)? != 0,
        recurrence_config: recurrence_config.and_then(|s| serde_json::from_str::<RecurrenceConfig>(&s).ok()),
        parent_task_id: row.get::<_, Option<String>>(11)?.map(TaskId::from),
        next_execution: parse_optional_ts(row.get::<_, Option<String>>(12)?),
        execution_count: row.get(13)?,
        metadata: serde_json::from_str(&metadata).unwrap_or(serde_json::json!({})),
    })
}

fn parse_task_status(s: &str) -> TaskStatus {
    match s {
        "done" => TaskStatus::Done,
        "cancelled" => TaskStatus::Cancelled,
        _ => TaskStatus::Pending,
    }
}

fn parse_optional_ts(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| DateTime::parse_from_rfc3339(&s).ok()).map(|dt| dt.with_timezone(&Utc))
}


#[cfg(test)]
mod sqlite_tests {
    use super::*;

    fn seeded_task(store: &SqliteTaskStore, id: &TaskId) {
        let conn = store.conn.lock().expect("task store mutex poisoned");
        conn.execute(
            "INSERT INTO task (id, user_id, title, status, priority, execution_count)
             VALUES (?1, 'u1', 'Water the plants', 'pending', 3, 0)",
            params![id.as_str()],
        )
        .expect("seed task insert should succeed");
    }

    #[tokio::test]
    async fn load_task_returns_a_seeded_row() {
        let conn = Connection::open_in_memory().expect("open in-memory sqlite db");
        let store = SqliteTaskStore::new(conn).expect("init task store");
        let id = TaskId::new();
        seeded_task(&store, &id);

        let task = store.load_task(&id).await.unwrap().expect("task should be found");
        assert_eq!(task.title, "Water the plants");
        assert_eq!(task.status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn mark_done_flips_status() {
        let conn = Connection::open_in_memory().expect("open in-memory sqlite db");
        let store = SqliteTaskStore::new(conn).expect("init task store");
        let id = TaskId::new();
        seeded_task(&store, &id);

        store.mark_done(&id).await.expect("mark_done should succeed");
        let task = store.load_task(&id).await.unwrap().expect("task should be found");
        assert_eq!(task.status, TaskStatus::Done);
    }

    #[tokio::test]
    async fn update_recurrence_persists_next_execution_and_count() {
        let conn = Connection::open_in_memory().expect("open in-memory sqlite db");
        let store = SqliteTaskStore::new(conn).expect("init task store");
        let id = TaskId::new();
        seeded_task(&store, &id);

        let next = Utc::now();
        store.update_recurrence(&id, next, 4).await.expect("update_recurrence should succeed");
        let task = store.load_task(&id).await.unwrap().expect("task should be found");
        assert_eq!(task.execution_count, 4);
        assert!(task.next_execution.is_some());
    }
}
