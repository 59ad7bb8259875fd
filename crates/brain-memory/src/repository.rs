use std::sync::Mutex;

use brain_core::types::{
    Conversation, ConversationId, Memory, MemoryChunk, MemoryId, MemoryType, Message, MessageId,
    Role, ToolResponsePointer, UserId,
};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

use crate::chunk::chunk_content;
use crate::db;
use crate::embedding::{cosine_similarity, EmbeddingEngine};
use crate::error::MemoryError;

/// Character cap used when chunking memory content, roughly 3x a typical
/// embedder's token limit.
pub const DEFAULT_CHUNK_CHARS: usize = 1200;

/// Time/saliency filter with no query, used by `retrieve_conversation`.
#[derive(Debug, Clone, Default)]
pub struct MemoryFilter {
    pub time_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    pub saliency_range: Option<(u8, u8)>,
}

/// Filter plus an optional query string, used by `find_memories`. A
/// non-`None` query requires an `EmbeddingEngine` be passed alongside it.
#[derive(Debug, Clone, Default)]
pub struct MemorySearch {
    pub time_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    pub saliency_range: Option<(u8, u8)>,
    pub query: Option<String>,
}

/// Owns the hot-window message store and the durable memory store, both in
/// the same SQLite database (one engine for both, per the ambient design).
pub struct ConversationRepository {
    conn: Mutex<Connection>,
    msg_ttl: Duration,
    chunk_chars: usize,
}

impl ConversationRepository {
    pub fn new(conn: Connection, msg_ttl_minutes: u32) -> Result<Self, MemoryError> {
        db::init_db(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            msg_ttl: Duration::minutes(msg_ttl_minutes as i64),
            chunk_chars: DEFAULT_CHUNK_CHARS,
        })
    }

    pub fn append_message(&self, msg: Message) -> Result<Message, MemoryError> {
        let conn = self.conn.lock().expect("conversation repository mutex poisoned");
        let expires_at = msg.timestamp + self.msg_ttl;
        let tags = serde_json::to_string(&msg.tags).map_err(|e| MemoryError::Serialization(e.to_string()))?;
        let (tool_name, tool_call_id) = match &msg.tool_response {
            Some(p) => (Some(p.tool_name.clone()), Some(p.call_id.clone())),
            None => (None, None),
        };
        conn.execute(
            "INSERT INTO message
                (id, user_id, conversation_id, role, text, tags, timestamp, expires_at,
                 tool_response_name, tool_response_call_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                msg.id.as_str(),
                msg.user_id.as_str(),
                msg.conversation_id.as_str(),
                msg.role.to_string(),
                msg.text,
                tags,
                msg.timestamp.to_rfc3339(),
                expires_at.to_rfc3339(),
                tool_name,
                tool_call_id,
            ],
        )?;
        Ok(msg)
    }

    /// Messages with `start <= timestamp <= end`, ordered `(timestamp, id)`,
    /// silently skipping ids whose TTL has already expired.
    pub fn fetch_messages(
        &self,
        user_id: &UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Message>, MemoryError> {
        let conn = self.conn.lock().expect("conversation repository mutex poisoned");
        let now = Utc::now().to_rfc3339();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, conversation_id, role, text, tags, timestamp,
                    tool_response_name, tool_response_call_id
             FROM message
             WHERE user_id = ?1 AND timestamp >= ?2 AND timestamp <= ?3 AND expires_at > ?4
             ORDER BY timestamp ASC, id ASC",
        )?;
        let rows = stmt.query_map(
            params![user_id.as_str(), start.to_rfc3339(), end.to_rfc3339(), now],
            row_to_message,
        )?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Distinct users with at least one unexpired message at or after
    /// `since` — the Summarizer's per-tick "active users" enumeration.
    pub fn list_active_users(&self, since: DateTime<Utc>) -> Result<Vec<UserId>, MemoryError> {
        let conn = self.conn.lock().expect("conversation repository mutex poisoned");
        let now = Utc::now().to_rfc3339();
        let mut stmt = conn.prepare(
            "SELECT DISTINCT user_id FROM message WHERE timestamp >= ?1 AND expires_at > ?2",
        )?;
        let rows = stmt.query_map(params![since.to_rfc3339(), now], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(UserId::from(row?));
        }
        Ok(out)
    }

    /// Removes a user's hot-store messages with `timestamp < boundary`,
    /// returning the number of rows deleted.
    pub fn prune_messages_before(&self, user_id: &UserId, boundary: DateTime<Utc>) -> Result<usize, MemoryError> {
        let conn = self.conn.lock().expect("conversation repository mutex poisoned");
        let deleted = conn.execute(
            "DELETE FROM message WHERE user_id = ?1 AND timestamp < ?2",
            params![user_id.as_str(), boundary.to_rfc3339()],
        )?;
        Ok(deleted)
    }

    /// Creates the conversation on first access. `filter` scopes which
    /// memories are returned; messages are always the full unexpired set.
    pub fn retrieve_conversation(
        &self,
        user_id: &UserId,
        filter: Option<MemoryFilter>,
    ) -> Result<Conversation, MemoryError> {
        let conversation_id = self.ensure_conversation(user_id)?;
        let far_past = Utc::now() - Duration::days(365 * 50);
        let messages = self.fetch_messages(user_id, far_past, Utc::now())?;

        let filter = filter.unwrap_or_default();
        let memories = self.query_memories(&conversation_id, &filter.time_range, &filter.saliency_range)?;

        let conn = self.conn.lock().expect("conversation repository mutex poisoned");
        let (summary, created_at, updated_at): (Option<String>, String, String) = conn.query_row(
            "SELECT summary, created_at, updated_at FROM conversation WHERE id = ?1",
            params![conversation_id.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        Ok(Conversation {
            id: conversation_id,
            owner_id: user_id.clone(),
            summary,
            created_at: parse_ts(&created_at)?,
            updated_at: parse_ts(&updated_at)?,
            messages,
            memories,
        })
    }

    fn ensure_conversation(&self, user_id: &UserId) -> Result<ConversationId, MemoryError> {
        let conn = self.conn.lock().expect("conversation repository mutex poisoned");
        let existing: Option<String> = conn
            .query_row(
                "SELECT id FROM conversation WHERE owner_id = ?1",
                params![user_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(ConversationId::from(id));
        }
        let id = ConversationId::new();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO conversation (id, owner_id, summary, created_at, updated_at)
             VALUES (?1, ?2, NULL, ?3, ?3)",
            params![id.as_str(), user_id.as_str(), now],
        )?;
        Ok(id)
    }

    /// Chunks `content`, embeds each chunk, and writes memory + chunks
    /// atomically.
    pub async fn create_memory(
        &self,
        conversation_id: &ConversationId,
        memory_type: MemoryType,
        saliency: u8,
        content: String,
        embedder: &dyn EmbeddingEngine,
    ) -> Result<Memory, MemoryError> {
        let pieces = chunk_content(&content, self.chunk_chars);
        let mut chunks = Vec::with_capacity(pieces.len());
        for (idx, piece) in pieces.into_iter().enumerate() {
            let embedding = embedder.embed(&piece).await.map_err(|e| MemoryError::Embedding(e.to_string()))?;
            chunks.push(MemoryChunk { chunk_index: idx as u32, content: piece, embedding });
        }

        let id = MemoryId::new();
        let now = Utc::now();
        let memory = Memory {
            id,
            conversation_id: conversation_id.clone(),
            memory_type,
            saliency,
            content,
            created_at: now,
            updated_at: now,
            chunks,
        };

        let mut conn = self.conn.lock().expect("conversation repository mutex poisoned");
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO memory (id, conversation_id, memory_type, saliency, content, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                memory.id.as_str(),
                memory.conversation_id.as_str(),
                memory.memory_type.to_string(),
                memory.saliency,
                memory.content,
                memory.created_at.to_rfc3339(),
                memory.updated_at.to_rfc3339(),
            ],
        )?;
        for chunk in &memory.chunks {
            tx.execute(
                "INSERT INTO memory_chunk (id, memory_id, chunk_index, content, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    uuid::Uuid::now_v7().to_string(),
                    memory.id.as_str(),
                    chunk.chunk_index,
                    chunk.content,
                    encode_embedding(&chunk.embedding),
                ],
            )?;
        }
        tx.commit()?;

        Ok(memory)
    }

    /// Ranks matching memories by max chunk cosine-similarity to `search.query`
    /// (when given; requires `embedder`), tie-broken by saliency then recency.
    pub async fn find_memories(
        &self,
        conversation_id: &ConversationId,
        search: MemorySearch,
        embedder: Option<&dyn EmbeddingEngine>,
    ) -> Result<Vec<Memory>, MemoryError> {
        let mut memories = self.query_memories(conversation_id, &search.time_range, &search.saliency_range)?;

        let Some(query) = search.query else {
            memories.sort_by(|a, b| b.saliency.cmp(&a.saliency).then(b.created_at.cmp(&a.created_at)));
            return Ok(memories);
        };
        let embedder = embedder.ok_or_else(|| {
            MemoryError::Embedding("query search requires an embedding engine".to_string())
        })?;
        let query_embedding = embedder.embed(&query).await.map_err(|e| MemoryError::Embedding(e.to_string()))?;

        let mut scored: Vec<(f32, Memory)> = memories
            .drain(..)
            .map(|memory| {
                let best = memory
                    .chunks
                    .iter()
                    .map(|c| cosine_similarity(&query_embedding, &c.embedding))
                    .fold(f32::MIN, f32::max);
                (if best == f32::MIN { 0.0 } else { best }, memory)
            })
            .collect();
        scored.sort_by(|(sim_a, mem_a), (sim_b, mem_b)| {
            sim_b
                .partial_cmp(sim_a)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(mem_b.saliency.cmp(&mem_a.saliency))
                .then(mem_b.created_at.cmp(&mem_a.created_at))
        });

        Ok(scored.into_iter().map(|(_, memory)| memory).collect())
    }

    pub fn delete_memory(&self, memory_id: &MemoryId) -> Result<(), MemoryError> {
        let mut conn = self.conn.lock().expect("conversation repository mutex poisoned");
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM memory_chunk WHERE memory_id = ?1", params![memory_id.as_str()])?;
        let deleted = tx.execute("DELETE FROM memory WHERE id = ?1", params![memory_id.as_str()])?;
        tx.commit()?;
        if deleted == 0 {
            warn!(memory_id = %memory_id, "delete_memory called on unknown id");
        }
        Ok(())
    }

    fn query_memories(
        &self,
        conversation_id: &ConversationId,
        time_range: &Option<(DateTime<Utc>, DateTime<Utc>)>,
        saliency_range: &Option<(u8, u8)>,
    ) -> Result<Vec<Memory>, MemoryError> {
        let conn = self.conn.lock().expect("conversation repository mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, conversation_id, memory_type, saliency, content, created_at, updated_at
             FROM memory WHERE conversation_id = ?1",
        )?;
        let rows = stmt.query_map(params![conversation_id.as_str()], row_to_memory)?;
        let mut memories = Vec::new();
        for row in rows {
            let memory = row?;
            if let Some((start, end)) = time_range {
                if memory.created_at < *start || memory.created_at > *end {
                    continue;
                }
            }
            if let Some((lo, hi)) = saliency_range {
                if memory.saliency < *lo || memory.saliency > *hi {
                    continue;
                }
            }
            memories.push(memory);
        }
        drop(stmt);

        for memory in &mut memories {
            memory.chunks = self.load_chunks(&conn, &memory.id)?;
        }
        Ok(memories)
    }

    fn load_chunks(&self, conn: &Connection, memory_id: &MemoryId) -> Result<Vec<MemoryChunk>, MemoryError> {
        let mut stmt = conn.prepare(
            "SELECT chunk_index, content, embedding FROM memory_chunk WHERE memory_id = ?1 ORDER BY chunk_index ASC",
        )?;
        let rows = stmt.query_map(params![memory_id.as_str()], |row| {
            let chunk_index: u32 = row.get(0)?;
            let content: String = row.get(1)?;
            let blob: Vec<u8> = row.get(2)?;
            Ok((chunk_index, content, blob))
        })?;
        let mut chunks = Vec::new();
        for row in rows {
            let (chunk_index, content, blob) = row?;
            chunks.push(MemoryChunk { chunk_index, content, embedding: decode_embedding(&blob) });
        }
        Ok(chunks)
    }
}

fn encode_embedding(v: &[f32]) -> Vec<u8> {
    v.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes.chunks_exact(4).map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect()
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>, MemoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| MemoryError::Serialization(e.to_string()))
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let role_str: String = row.get(3)?;
    let tags_str: String = row.get(5)?;
    let ts_str: String = row.get(6)?;
    let tool_name: Option<String> = row.get(7)?;
    let tool_call_id: Option<String> = row.get(8)?;
    Ok(Message {
        id: MessageId::from(row.get::<_, String>(0)?),
        user_id: UserId::from(row.get::<_, String>(1)?),
        conversation_id: ConversationId::from(row.get::<_, String>(2)?),
        role: role_str.parse().unwrap_or(Role::User),
        text: row.get(4)?,
        tags: serde_json::from_str(&tags_str).unwrap_or_default(),
        timestamp: ts_str
            .parse::<DateTime<Utc>>()
            .unwrap_or_else(|_| Utc::now()),
        tool_response: match (tool_name, tool_call_id) {
            (Some(name), Some(call_id)) => Some(ToolResponsePointer { tool_name: name, call_id }),
            _ => None,
        },
    })
}

fn row_to_memory(row: &rusqlite::Row<'_>) -> rusqlite::Result<Memory> {
    let type_str: String = row.get(2)?;
    let created: String = row.get(5)?;
    let updated: String = row.get(6)?;
    Ok(Memory {
        id: MemoryId::from(row.get::<_, String>(0)?),
        conversation_id: ConversationId::from(row.get::<_, String>(1)?),
        memory_type: type_str.parse().unwrap_or(MemoryType::Episodic),
        saliency: row.get(3)?,
        content: row.get(4)?,
        created_at: created.parse::<DateTime<Utc>>().unwrap_or_else(|_| Utc::now()),
        updated_at: updated.parse::<DateTime<Utc>>().unwrap_or_else(|_| Utc::now()),
        chunks: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::PlaceholderEmbeddingEngine;
    use brain_core::types::Role;

    fn repo() -> ConversationRepository {
        let conn = Connection::open_in_memory().unwrap();
        ConversationRepository::new(conn, 60).unwrap()
    }

    #[test]
    fn fetch_messages_respects_time_range_and_ordering() {
        let repo = repo();
        let user = UserId::from("u1");
        let conv = ConversationId::new();
        let base = Utc::now();

        for (i, offset) in [0i64, 10, 20].into_iter().enumerate() {
            let mut msg = Message::new(user.clone(), conv.clone(), Role::User, format!("msg {i}"));
            msg.timestamp = base + Duration::seconds(offset);
            repo.append_message(msg).unwrap();
        }

        let messages = repo
            .fetch_messages(&user, base + Duration::seconds(5), base + Duration::seconds(25))
            .unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text, "msg 1");
        assert_eq!(messages[1].text, "msg 2");
    }

    #[tokio::test]
    async fn create_and_find_memory_round_trips() {
        let repo = repo();
        let conv = ConversationId::new();
        let embedder = PlaceholderEmbeddingEngine::new(64);

        repo.create_memory(&conv, MemoryType::Semantic, 7, "User prefers dark mode.".to_string(), &embedder)
            .await
            .unwrap();
        repo.create_memory(&conv, MemoryType::Episodic, 3, "User asked about the weather in Tokyo.".to_string(), &embedder)
            .await
            .unwrap();

        let results = repo
            .find_memories(
                &conv,
                MemorySearch { query: Some("dark mode preference".to_string()), ..Default::default() },
                Some(&embedder),
            )
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results[0].content.contains("dark mode"));
    }

    #[tokio::test]
    async fn delete_memory_cascades_to_chunks() {
        let repo = repo();
        let conv = ConversationId::new();
        let embedder = PlaceholderEmbeddingEngine::new(32);
        let memory = repo
            .create_memory(&conv, MemoryType::Semantic, 5, "Some durable fact.".to_string(), &embedder)
            .await
            .unwrap();

        repo.delete_memory(&memory.id).unwrap();

        let results = repo.find_memories(&conv, MemorySearch::default(), None).await.unwrap();
        assert!(results.is_empty());
    }
}
