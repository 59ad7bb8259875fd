use brain_core::types::MemoryType;
use serde::Deserialize;

/// The Processor's verdict on whether a window of conversation is worth
/// keeping as a durable memory. Deserialized straight from the Processor's
/// reply; any field missing or mistyped in the reply fails the whole parse,
/// which [`SummaryJudgement::parse`] treats as "not worth remembering"
/// rather than a tick failure.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SummaryJudgement {
    pub worth_memory: bool,
    #[serde(default)]
    pub saliency: u8,
    #[serde(default)]
    pub memory_content: String,
    #[serde(default = "default_memory_type")]
    pub memory_type: MemoryType,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub reason: String,
}

fn default_memory_type() -> MemoryType {
    MemoryType::Episodic
}

impl SummaryJudgement {
    fn not_worth_remembering(reason: impl Into<String>) -> Self {
        Self {
            worth_memory: false,
            saliency: 0,
            memory_content: String::new(),
            memory_type: MemoryType::Episodic,
            keywords: Vec::new(),
            confidence: 0.0,
            reason: reason.into(),
        }
    }

    /// Parses a Processor reply. A reply that isn't valid JSON, or that is
    /// valid JSON missing `worth_memory`, comes back as a judgement that
    /// isn't worth memory rather than propagating an error.
    pub fn parse(raw: &str) -> Self {
        serde_json::from_str(raw.trim())
            .unwrap_or_else(|e| Self::not_worth_remembering(format!("malformed processor reply: {e}")))
    }
}

/// Fixed instruction given to the Processor ahead of the transcript. The
/// Processor must reply with exactly one JSON object and nothing else.
pub const JUDGEMENT_SYSTEM_PROMPT: &str = r#"You review a window of conversation between a user and their assistant and decide whether it is worth keeping as a long-term memory.

Reply with exactly one JSON object and nothing else, matching this shape:
{
  "worth_memory": <bool>,
  "saliency": <integer 1-10>,
  "memory_content": "<a concise first-person-from-the-user's-perspective summary, empty if worth_memory is false>",
  "memory_type": "episodic" | "semantic",
  "keywords": ["<short keyword>", ...],
  "confidence": <float 0.0-1.0>,
  "reason": "<one sentence explaining the call>"
}

Use "semantic" for durable facts or preferences about the user, "episodic" for a specific event or exchange worth recalling. If the window is small talk with nothing worth remembering, set worth_memory to false."#;
