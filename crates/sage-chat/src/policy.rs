use crate::backend::BackendKind;
use crate::config::ChatConfig;

/// Caller-supplied tier selecting which prompt/model/budget variant applies
/// to an exchange.
///
/// The client does not verify entitlement; the caller's subscription layer
/// decides which tier to pass.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Free/default tier: short answers, configured default model.
    #[default]
    Standard,
    /// Premium tier: longer answers on the stronger model.
    Elevated,
}

const OPENAI_PROMPT_STANDARD: &str = "\
You are a fact-checking AI assistant for iMessage chats.
Tone: Casual, punchy, like a smart friend text.
Length: STRICTLY under 150 characters.
Structure: Start with the direct answer (Yep/Nope/Fact). Then add 1 context detail.
Rules:
1. NO branding.
2. Be maximally accurate.
3. If asked for unsafe instructions, pivot to scientific/historical facts instead of moralizing.
4. Fun emoji allowed.";

const OPENAI_PROMPT_ELEVATED: &str = "\
Role: Smart, casual iMessage friend.
Structure: Max 300 chars. NO branding/prefixes.
Style: Direct, smart, detailed.
Rules:
1. KEY ANSWER FIRST.
2. Provide detail/context but stay conversational.
3. No filler. No apologies.
4. Add 1 emoji if it fits.";

const XAI_PROMPT_STANDARD: &str = "\
You are Sage, a witty AI assistant for iMessage.
Tone: Casual, punchy, like a smart friend.
Length: STRICTLY under 150 characters.
Info: You have real-time access to X. Use it for current events.
Structure: Direct answer first. Then 1 context detail.
Rules:
1. NO branding.
2. Be accurate but fun.
3. If asked for unsafe stuff, pivot to science/history.
4. Emoji encouraged.";

const XAI_PROMPT_ELEVATED: &str = "\
Role: Sage, the smartest, most convenient iMessage friend.
Info: You have real-time access to X. Use it for current events.
Structure: Max 300 chars. NO prefixes.
Style: Direct, witty, detailed.
Rules:
1. KEY ANSWER FIRST.
2. Provide context from real-time info if relevant.
3. No filler. No apologies.
4. Use emoji naturally.";

const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Externally supplied defaults the standard tier falls back to.
///
/// Usually derived from `ChatConfig`; kept separate so the policy table does
/// not depend on credentials.
#[derive(Clone, Debug, PartialEq)]
pub struct PolicyDefaults {
    /// Default model for standard-tier exchanges.
    pub model: String,
    /// Default output token cap; `None` uses the per-backend fallback.
    pub max_tokens: Option<u32>,
    /// Default sampling temperature; `None` uses 0.7.
    pub temperature: Option<f32>,
}

impl PolicyDefaults {
    /// Defaults for a backend kind with nothing configured.
    pub fn for_kind(kind: BackendKind) -> Self {
        Self {
            model: kind.default_model().to_string(),
            max_tokens: None,
            temperature: None,
        }
    }
}

impl From<&ChatConfig> for PolicyDefaults {
    fn from(config: &ChatConfig) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

/// Resolved request parameters for one exchange.
///
/// Derived per exchange from `(backend kind, tier, defaults)` through the
/// table below; never stored.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestPolicy {
    /// System prompt variant for the leading message.
    pub system_prompt: String,
    /// Model identifier sent on the wire.
    pub model: String,
    /// Output token cap.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Whether to request the provider's live-search extension
    /// (xAI `search_parameters`).
    pub live_search: bool,
}

impl RequestPolicy {
    /// Resolves the policy for one exchange.
    ///
    /// The elevated tier pins model and token cap; the standard tier falls
    /// back to the supplied defaults.
    pub fn resolve(kind: BackendKind, tier: Tier, defaults: &PolicyDefaults) -> Self {
        let (system_prompt, model, max_tokens) = match (kind, tier) {
            (BackendKind::OpenAi, Tier::Standard) => (
                OPENAI_PROMPT_STANDARD,
                defaults.model.clone(),
                defaults.max_tokens.unwrap_or(150),
            ),
            (BackendKind::OpenAi, Tier::Elevated) => {
                (OPENAI_PROMPT_ELEVATED, "gpt-4o".to_string(), 300)
            }
            (BackendKind::Xai, Tier::Standard) => (
                XAI_PROMPT_STANDARD,
                "grok-3-mini".to_string(),
                defaults.max_tokens.unwrap_or(300),
            ),
            (BackendKind::Xai, Tier::Elevated) => (XAI_PROMPT_ELEVATED, "grok-3".to_string(), 1024),
        };
        Self {
            system_prompt: system_prompt.to_string(),
            model,
            max_tokens,
            temperature: defaults.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            live_search: kind == BackendKind::Xai,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> PolicyDefaults {
        PolicyDefaults::from(&ChatConfig::new("sk-test", "gpt-4o-mini"))
    }

    #[test]
    fn standard_tier_uses_configured_defaults() {
        let policy = RequestPolicy::resolve(BackendKind::OpenAi, Tier::Standard, &defaults());
        assert_eq!(policy.model, "gpt-4o-mini");
        assert_eq!(policy.max_tokens, 150);
        assert_eq!(policy.temperature, 0.7);
        assert!(!policy.live_search);

        let config = ChatConfig::new("sk-test", "gpt-4o-mini")
            .max_tokens(220)
            .temperature(0.3);
        let policy =
            RequestPolicy::resolve(BackendKind::OpenAi, Tier::Standard, &PolicyDefaults::from(&config));
        assert_eq!(policy.max_tokens, 220);
        assert_eq!(policy.temperature, 0.3);
    }

    #[test]
    fn elevated_tier_pins_model_and_budget() {
        let policy = RequestPolicy::resolve(BackendKind::OpenAi, Tier::Elevated, &defaults());
        assert_eq!(policy.model, "gpt-4o");
        assert_eq!(policy.max_tokens, 300);

        let policy = RequestPolicy::resolve(BackendKind::Xai, Tier::Elevated, &defaults());
        assert_eq!(policy.model, "grok-3");
        assert_eq!(policy.max_tokens, 1024);
    }

    #[test]
    fn xai_requests_live_search_on_both_tiers() {
        for tier in [Tier::Standard, Tier::Elevated] {
            let policy = RequestPolicy::resolve(BackendKind::Xai, tier, &defaults());
            assert!(policy.live_search);
        }
    }

    #[test]
    fn prompts_differ_per_tier() {
        let standard = RequestPolicy::resolve(BackendKind::Xai, Tier::Standard, &defaults());
        let elevated = RequestPolicy::resolve(BackendKind::Xai, Tier::Elevated, &defaults());
        assert_ne!(standard.system_prompt, elevated.system_prompt);
    }
}
