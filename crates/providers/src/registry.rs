//! Provider registry.
//!
//! Constructs and holds all configured LLM provider instances. At startup the
//! registry reads the [`LlmConfig`], resolves authentication, and instantiates
//! an adapter for each configured provider. A provider that fails to
//! initialize (typically a missing API key) is a startup error.

use std::collections::HashMap;
use std::sync::Arc;

use crate::openai_compat::OpenAiCompatProvider;
use crate::traits::LlmProvider;
use fd_domain::config::LlmConfig;
use fd_domain::error::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ProviderRegistry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    /// The first configured provider id — used when no override is given.
    default_id: String,
}

impl ProviderRegistry {
    /// Initialize every configured provider.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        if config.providers.is_empty() {
            return Err(Error::Config(
                "no LLM providers configured under [llm.providers]".into(),
            ));
        }

        let mut providers: HashMap<String, Arc<dyn LlmProvider>> = HashMap::new();
        let default_id = config.providers[0].id.clone();

        for provider_cfg in &config.providers {
            let provider =
                OpenAiCompatProvider::from_config(provider_cfg, config.request_timeout_secs)?;
            tracing::info!(
                provider = %provider_cfg.id,
                base_url = %provider_cfg.base_url,
                model = %provider_cfg.default_model,
                "LLM provider initialized"
            );
            providers.insert(provider_cfg.id.clone(), Arc::new(provider));
        }

        Ok(Self {
            providers,
            default_id,
        })
    }

    /// Build a registry around a single pre-constructed provider.
    ///
    /// Used by embedders and tests that supply their own [`LlmProvider`]
    /// implementation instead of going through config.
    pub fn from_provider(provider: Arc<dyn LlmProvider>) -> Self {
        let default_id = provider.provider_id().to_string();
        let mut providers = HashMap::new();
        providers.insert(default_id.clone(), provider);
        Self {
            providers,
            default_id,
        }
    }

    /// Look up a provider by id.
    pub fn get(&self, id: &str) -> Option<Arc<dyn LlmProvider>> {
        self.providers.get(id).cloned()
    }

    /// The default provider (the first one configured).
    pub fn default_provider(&self) -> Option<Arc<dyn LlmProvider>> {
        self.providers.get(&self.default_id).cloned()
    }

    /// Resolve a provider for an optional `"provider_id/model"` override.
    ///
    /// An unknown prefix falls back to the default provider — the model name
    /// is passed through in the request and the endpoint decides what it
    /// accepts.
    pub fn resolve(&self, model_override: Option<&str>) -> Option<Arc<dyn LlmProvider>> {
        if let Some(spec) = model_override {
            let provider_id = spec.split('/').next().unwrap_or(spec);
            if let Some(p) = self.providers.get(provider_id) {
                return Some(p.clone());
            }
        }
        self.default_provider()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
