use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LLM provider system
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Sampling temperature applied when the request does not carry one.
    #[serde(default = "d_temperature")]
    pub default_temperature: f32,
    /// Completion token cap applied when the request does not carry one.
    #[serde(default = "d_max_tokens")]
    pub default_max_tokens: u32,
    #[serde(default = "d_timeout")]
    pub request_timeout_secs: u64,
    /// Registered LLM providers (data-driven: adding a provider = adding config).
    #[serde(default = "d_providers")]
    pub providers: Vec<ProviderConfig>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            default_temperature: d_temperature(),
            default_max_tokens: d_max_tokens(),
            request_timeout_secs: d_timeout(),
            providers: d_providers(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: String,
    #[serde(default = "d_base_url")]
    pub base_url: String,
    #[serde(default = "d_model")]
    pub default_model: String,
    #[serde(default)]
    pub auth: AuthConfig,
}

/// How the provider API key is resolved.
///
/// Precedence: plaintext `key` field (warned against) → `env` variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Plaintext API key. Prefer `env` — this exists for throwaway setups.
    #[serde(default)]
    pub key: Option<String>,
    /// Environment variable holding the API key.
    #[serde(default = "d_key_env")]
    pub env: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            key: None,
            env: d_key_env(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_providers() -> Vec<ProviderConfig> {
    vec![ProviderConfig {
        id: "openai".into(),
        base_url: d_base_url(),
        default_model: d_model(),
        auth: AuthConfig::default(),
    }]
}
fn d_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn d_model() -> String {
    "gpt-4o-mini".into()
}
fn d_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn d_temperature() -> f32 {
    0.1
}
fn d_max_tokens() -> u32 {
    16_000
}
fn d_timeout() -> u64 {
    120
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
