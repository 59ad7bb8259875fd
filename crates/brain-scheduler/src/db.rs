use rusqlite::Connection;

use crate::error::SchedulerError;

/// Initialise the `jobs` table. Shares the Conversation Repository's SQLite
/// file rather than a separate broker — one datastore for hot messages,
/// durable memories, and job state.
pub fn init_db(conn: &Connection) -> Result<(), SchedulerError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS jobs (
            id          TEXT    NOT NULL PRIMARY KEY,
            task_id     TEXT    NOT NULL,
            user_id     TEXT    NOT NULL,
            queue       TEXT    NOT NULL,
            priority    INTEGER NOT NULL,
            status      TEXT    NOT NULL DEFAULT 'pending',
            execute_at  TEXT    NOT NULL,
            payload     BLOB    NOT NULL,
            created_at  TEXT    NOT NULL,
            updated_at  TEXT    NOT NULL
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_jobs_due ON jobs (status, execute_at);
        CREATE INDEX IF NOT EXISTS idx_jobs_task ON jobs (task_id);

        CREATE TABLE IF NOT EXISTS task (
            id                 TEXT    NOT NULL PRIMARY KEY,
            user_id            TEXT    NOT NULL,
            title              TEXT    NOT NULL,
            description        TEXT    NOT NULL DEFAULT '',
            status             TEXT    NOT NULL DEFAULT 'pending',
            priority           INTEGER NOT NULL DEFAULT 3,
            tags               TEXT    NOT NULL DEFAULT '[]',
            scheduled_at       TEXT,
            due_at             TEXT,
            is_recurring       INTEGER NOT NULL DEFAULT 0,
            recurrence_config  TEXT,
            parent_task_id     TEXT,
            next_execution     TEXT,
            execution_count    INTEGER NOT NULL DEFAULT 0,
            metadata           TEXT    NOT NULL DEFAULT '{}'
        ) STRICT;
        ",
    )?;
    Ok(())
}
