//! LLM integration.
//!
//! One capability trait, [`LlmProvider`], with one concrete implementation
//! talking to any OpenAI-compatible chat completions endpoint. The provider is
//! chosen once at start-up; when no key is configured there is no provider at
//! all and every caller uses its deterministic path.

pub mod openai;
pub mod provider;

pub use openai::OpenAiCompatProvider;
pub use provider::*;

use std::sync::Arc;

use crate::config::LlmConfig;
use crate::error::LlmError;

/// Create the LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let provider = OpenAiCompatProvider::new(config)?;
    tracing::info!(
        "Using OpenAI-compatible endpoint {} (model: {})",
        provider.url(),
        config.model
    );
    Ok(Arc::new(provider))
}

/// Create the provider if configured, logging and disabling on failure.
pub fn optional_provider(config: Option<&LlmConfig>) -> Option<Arc<dyn LlmProvider>> {
    let config = config?;
    match create_provider(config) {
        Ok(provider) => Some(provider),
        Err(e) => {
            tracing::warn!(error = %e, "LLM provider unavailable, using rule-based fallbacks");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn create_provider_reports_model() {
        let config = LlmConfig {
            api_key: secrecy::SecretString::from("test-key"),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout: Duration::from_secs(20),
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.model_name(), "gpt-4o-mini");
    }

    #[test]
    fn optional_provider_none_without_config() {
        assert!(optional_provider(None).is_none());
    }
}
