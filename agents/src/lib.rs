//! Agent (C3) and Provider Contract (C2): role-specialized LLM loops over a
//! closed set of backend providers, plus the generic loop shape they share.

pub mod loop_runner;
pub mod provider;

pub use loop_runner::{run_turn, AgentLoopError, AgentRole, TurnOutcome};
pub use provider::{CompletionResponse, Provider, ProviderBackend, ProviderError};

use maestro_core::Config;

/// Builds the concrete `Provider` for a configured backend name, following
/// the teacher's adapter-factory pattern (`adapters::factory`): one match
/// arm per backend, reading only the fields that backend's wire format needs.
pub fn provider_for(config: &Config, backend: &str) -> anyhow::Result<Provider> {
    use std::env;

    let provider_config = config
        .providers
        .get(backend)
        .ok_or_else(|| anyhow::anyhow!("no provider configured for backend '{backend}'"))?;

    match backend {
        "anthropic" => {
            let api_key = provider_config
                .api_key_env
                .as_ref()
                .and_then(|var| env::var(var).ok())
                .ok_or_else(|| anyhow::anyhow!("missing API key env var for backend 'anthropic'"))?;
            let base_url = provider_config.base_url.clone().unwrap_or_else(|| "https://api.anthropic.com".to_string());
            Ok(Provider::Anthropic(provider::anthropic::AnthropicBackend::new(base_url, api_key)))
        }
        "openai" => {
            let api_key = provider_config
                .api_key_env
                .as_ref()
                .and_then(|var| env::var(var).ok())
                .ok_or_else(|| anyhow::anyhow!("missing API key env var for backend 'openai'"))?;
            let base_url = provider_config.base_url.clone().unwrap_or_else(|| "https://api.openai.com".to_string());
            Ok(Provider::OpenAi(provider::openai::OpenAiBackend::new(base_url, api_key)))
        }
        "ollama" => {
            let base_url = provider_config.base_url.clone().unwrap_or_else(|| "http://localhost:11434".to_string());
            Ok(Provider::Ollama(provider::ollama::OllamaBackend::new(base_url)))
        }
        "stub" => Ok(Provider::Stub(provider::stub::StubBackend::new())),
        other => Err(anyhow::anyhow!("unknown backend '{other}'")),
    }
}
