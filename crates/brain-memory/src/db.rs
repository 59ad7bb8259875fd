use rusqlite::{Connection, Result};

/// Creates the tables this crate owns. Idempotent, safe on every startup.
///
/// Per the documented schema split, `brain-memory` owns `message`,
/// `conversation`, `memory`, and `memory_chunk`; `user`/`project`/`note`
/// belong to the out-of-scope CRUD layer and are never created here.
pub fn init_db(conn: &Connection) -> Result<()> {
    create_conversation_table(conn)?;
    create_message_table(conn)?;
    create_memory_table(conn)?;
    create_memory_chunk_table(conn)?;
    Ok(())
}

fn create_conversation_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS conversation (
            id          TEXT PRIMARY KEY,
            owner_id    TEXT NOT NULL UNIQUE,
            summary     TEXT,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );",
    )
}

fn create_message_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS message (
            id                TEXT PRIMARY KEY,
            user_id           TEXT NOT NULL,
            conversation_id   TEXT NOT NULL,
            role              TEXT NOT NULL,
            text              TEXT NOT NULL,
            tags              TEXT NOT NULL DEFAULT '[]',
            timestamp         TEXT NOT NULL,
            expires_at        TEXT NOT NULL,
            tool_response_name TEXT,
            tool_response_call_id TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_message_user_ts
            ON message(user_id, timestamp, id);",
    )
}

fn create_memory_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS memory (
            id              TEXT PRIMARY KEY,
            conversation_id TEXT NOT NULL,
            memory_type     TEXT NOT NULL,
            saliency        INTEGER NOT NULL,
            content         TEXT NOT NULL,
            created_at      TEXT NOT NULL,
            updated_at      TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_memory_conversation
            ON memory(conversation_id);",
    )
}

fn create_memory_chunk_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS memory_chunk (
            id          TEXT PRIMARY KEY,
            memory_id   TEXT NOT NULL,
            chunk_index INTEGER NOT NULL,
            content     TEXT NOT NULL,
            embedding   BLOB NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_chunk_memory
            ON memory_chunk(memory_id);",
    )
}
