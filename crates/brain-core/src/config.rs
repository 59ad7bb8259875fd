use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Top-level config (brain.toml + BRAIN_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub brain: BrainConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub embedder: EmbedderConfig,
    #[serde(default)]
    pub tts: TtsConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Brain Core tunables named directly in the spec's external interfaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrainConfig {
    #[serde(default = "default_max_tool_calls")]
    pub max_tool_calls: u32,
    #[serde(default = "default_msg_ttl_minutes")]
    pub msg_ttl_minutes: u32,
    #[serde(default = "default_summarizer_interval_secs")]
    pub summarizer_interval_secs: u64,
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Confidence threshold above which a Summarizer judgement becomes a memory.
    #[serde(default = "default_summary_confidence_threshold")]
    pub summary_confidence_threshold: f64,
    #[serde(default = "default_batch_size")]
    pub mediator_batch_size: usize,
    #[serde(default = "default_batch_tick_ms")]
    pub mediator_batch_tick_ms: u64,
    #[serde(default = "default_tts_max_chars")]
    pub tts_max_segment_chars: usize,
    #[serde(default = "default_fanout_cap")]
    pub tool_fanout_cap: usize,
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            max_tool_calls: default_max_tool_calls(),
            msg_ttl_minutes: default_msg_ttl_minutes(),
            summarizer_interval_secs: default_summarizer_interval_secs(),
            default_model: default_model(),
            summary_confidence_threshold: default_summary_confidence_threshold(),
            mediator_batch_size: default_batch_size(),
            mediator_batch_tick_ms: default_batch_tick_ms(),
            tts_max_segment_chars: default_tts_max_chars(),
            tool_fanout_cap: default_fanout_cap(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    pub anthropic: Option<AnthropicConfig>,
    pub openai_compat: Vec<OpenAiCompatEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    pub api_key: String,
    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub models: Vec<String>,
}

/// A single OpenAI-compatible provider entry (also covers local/self-hosted
/// servers such as Ollama or vLLM that speak the same wire shape).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiCompatEntry {
    pub id: String,
    pub api_key: String,
    pub base_url: String,
    #[serde(default = "default_chat_path")]
    pub chat_path: String,
    #[serde(default)]
    pub models: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedderConfig {
    #[serde(default = "default_embedder_dimension")]
    pub dimension: usize,
    #[serde(default = "default_embedder_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            dimension: default_embedder_dimension(),
            timeout_secs: default_embedder_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TtsConfig {
    pub endpoint_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
        }
    }
}

/// Device transport bind address for the runnable binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    7670
}
fn default_shutdown_grace_secs() -> u64 {
    5
}

fn default_max_tool_calls() -> u32 {
    5
}
fn default_msg_ttl_minutes() -> u32 {
    60 * 24
}
fn default_summarizer_interval_secs() -> u64 {
    180
}
fn default_model() -> String {
    "claude-sonnet-4-6".to_string()
}
fn default_summary_confidence_threshold() -> f64 {
    0.6
}
fn default_batch_size() -> usize {
    24
}
fn default_batch_tick_ms() -> u64 {
    150
}
fn default_tts_max_chars() -> usize {
    280
}
fn default_fanout_cap() -> usize {
    16
}
fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".to_string()
}
fn default_chat_path() -> String {
    "/v1/chat/completions".to_string()
}
fn default_embedder_dimension() -> usize {
    384
}
fn default_embedder_timeout_secs() -> u64 {
    30
}
fn default_worker_count() -> usize {
    10
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.brain/brain.db", home)
}
fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.brain/brain.toml", home)
}

impl Config {
    /// Load config from a TOML file with `BRAIN_*` env var overrides.
    ///
    /// Checks in order: explicit path argument, then `~/.brain/brain.toml`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: Config = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("BRAIN_").split("__"))
            .extract()
            .map_err(|e| crate::error::BrainError::Config(e.to_string()))?;

        Ok(config)
    }
}
