use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier for a user. Not generated by this crate — the core
/// receives it from whatever external user store the caller maintains.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

macro_rules! durable_id {
    ($name:ident) => {
        /// UUIDv7 — time-sortable so rows and log lines order naturally.
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::now_v7().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

durable_id!(MessageId);
durable_id!(ConversationId);
durable_id!(MemoryId);
durable_id!(TaskId);
durable_id!(JobId);

macro_rules! ephemeral_id {
    ($name:ident) => {
        /// UUIDv4 — random, per-connection, never persisted past a restart.
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

ephemeral_id!(SessionId);
ephemeral_id!(DeviceId);

/// Who authored a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::System => write!(f, "system"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            "tool" => Ok(Role::Tool),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// One line in a conversation. Lives in the hot-window store with TTL
/// `msg_ttl`; `role` is immutable once created, `timestamp` is
/// non-decreasing within a `conversation_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub user_id: UserId,
    pub conversation_id: ConversationId,
    pub role: Role,
    pub text: String,
    pub tags: Vec<String>,
    pub timestamp: DateTime<Utc>,
    /// Set when `role == Tool`: the tool call this message is a response to.
    pub tool_response: Option<ToolResponsePointer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResponsePointer {
    pub tool_name: String,
    pub call_id: String,
}

impl Message {
    pub fn new(user_id: UserId, conversation_id: ConversationId, role: Role, text: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            user_id,
            conversation_id,
            role,
            text: text.into(),
            tags: Vec::new(),
            timestamp: Utc::now(),
            tool_response: None,
        }
    }
}

/// What kind of durable memory this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryType {
    Episodic,
    Semantic,
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryType::Episodic => write!(f, "episodic"),
            MemoryType::Semantic => write!(f, "semantic"),
        }
    }
}

impl std::str::FromStr for MemoryType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "episodic" => Ok(MemoryType::Episodic),
            "semantic" => Ok(MemoryType::Semantic),
            other => Err(format!("unknown memory type: {other}")),
        }
    }
}

/// One embedded slice of a [`Memory`]'s content. Chunk ordering is stable;
/// the concatenation of all chunks (with a separator) partitions the parent
/// memory's content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryChunk {
    pub chunk_index: u32,
    pub content: String,
    pub embedding: Vec<f32>,
}

/// Durable summary with at least one embedded chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    pub id: MemoryId,
    pub conversation_id: ConversationId,
    pub memory_type: MemoryType,
    pub saliency: u8,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub chunks: Vec<MemoryChunk>,
}

/// One per user; owns Messages (hot) and Memories (durable).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub owner_id: UserId,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub messages: Vec<Message>,
    pub memories: Vec<Memory>,
}

/// Lifecycle state of a [`Task`]. Transitions are `Pending -> {Done, Cancelled}` only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Done,
    Cancelled,
}

/// How a recurring [`Task`] repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceType {
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Custom,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrenceConfig {
    #[serde(rename = "type")]
    pub recurrence_type: RecurrenceType,
    pub interval: u32,
    #[serde(default)]
    pub days_of_week: Vec<u8>,
    #[serde(default)]
    pub days_of_month: Vec<u8>,
    #[serde(default)]
    pub months_of_year: Vec<u8>,
    pub end_date: Option<DateTime<Utc>>,
    pub max_occurrences: Option<u32>,
    /// Only meaningful when `recurrence_type == Custom`: the base unit of
    /// `interval`, in seconds.
    #[serde(default)]
    pub custom_base_unit_secs: Option<i64>,
}

/// User-scheduled work. `execution_count` is monotonically non-decreasing;
/// a recurring instance has `is_recurring = false` and `parent_task_id` set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub user_id: UserId,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: u8,
    pub tags: Vec<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub due_at: Option<DateTime<Utc>>,
    pub is_recurring: bool,
    pub recurrence_config: Option<RecurrenceConfig>,
    pub parent_task_id: Option<TaskId>,
    pub next_execution: Option<DateTime<Utc>>,
    pub execution_count: u32,
    pub metadata: serde_json::Value,
}

/// Why a [`JobPayload`] re-enters the Brain Core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    TaskExecution,
    TaskReminder,
    TaskDeadline,
    RecurringTask,
}

/// Enqueued scheduler record. Serialized as a length-prefixed JSON object;
/// consumers must ignore unknown `metadata` keys (forward-compat).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPayload {
    pub job_type: JobType,
    pub task_id: TaskId,
    pub user_id: UserId,
    pub session_id: SessionId,
    pub execute_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Ephemeral per-connection view of recent context. Created on demand,
/// discarded after inactivity, never persisted across a restart.
#[derive(Debug, Clone)]
pub struct BrainSession {
    pub user_id: UserId,
    pub session_id: SessionId,
    pub messages: Vec<Message>,
}

impl BrainSession {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            session_id: SessionId::new(),
            messages: Vec::new(),
        }
    }
}

/// Opaque context threaded into every tool `execute` and scheduled-task run.
/// Tools never read `user_id` from their own arguments — it always comes
/// from here, eliminating spoofing.
#[derive(Debug, Clone)]
pub struct UserContext {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    pub now: DateTime<Utc>,
}

/// Output sink kinds a device may accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameKind {
    Text,
    Audio,
}
