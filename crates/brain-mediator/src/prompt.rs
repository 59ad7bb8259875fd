/// Three-tier system prompt for providers that support prompt caching.
///
/// TIER 1 (static): identical for every user — the default-assistant
/// persona and safety rules. Cached at a breakpoint with a near-100% hit
/// rate across requests.
///
/// TIER 2 (per-user): user profile / memory context. Cached separately —
/// hits whenever the same user continues a conversation.
///
/// TIER 3 (volatile): session id, turn count, current instant. Never
/// cached; placed last so it never breaks the cached prefix.
#[derive(Debug, Clone, Default)]
pub struct SystemPrompt {
    pub static_tier: String,
    pub user_tier: String,
    pub volatile_tier: String,
}

impl SystemPrompt {
    pub fn to_plain_text(&self) -> String {
        let mut out = self.static_tier.clone();
        if !self.user_tier.is_empty() {
            out.push_str("\n\n");
            out.push_str(&self.user_tier);
        }
        if !self.volatile_tier.is_empty() {
            out.push_str("\n\n");
            out.push_str(&self.volatile_tier);
        }
        out
    }

    /// Convert to Anthropic-style content blocks with `cache_control`
    /// breakpoints after the static and per-user tiers.
    pub fn to_cache_blocks(&self) -> Vec<serde_json::Value> {
        let mut blocks = Vec::with_capacity(3);

        blocks.push(serde_json::json!({
            "type": "text",
            "text": self.static_tier,
            "cache_control": { "type": "ephemeral" }
        }));

        if !self.user_tier.is_empty() {
            blocks.push(serde_json::json!({
                "type": "text",
                "text": self.user_tier,
                "cache_control": { "type": "ephemeral" }
            }));
        }

        if !self.volatile_tier.is_empty() {
            blocks.push(serde_json::json!({
                "type": "text",
                "text": self.volatile_tier,
            }));
        }

        blocks
    }
}
