//! Layered configuration: defaults, then `setup.yaml`, then `MAESTRO_*` env vars,
//! then CLI flags. Assembly is a pure function — no global mutable state, no
//! in-place mutation of a singleton (contrast with a `ConfigManager` that owns
//! and rewrites its own file on every override).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub base_url: Option<String>,
    pub api_key_env: Option<String>,
    pub timeout_seconds: u64,
    pub models: Vec<ModelProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelProfile {
    pub name: String,
    pub context_window: u32,
    pub cost_per_1k_tokens: f64,
    pub throughput_tokens_per_sec: f64,
    #[serde(default)]
    pub daily_rate_limit: Option<u32>,
    /// Missing capability flags default to `true` ("permissive") so a legacy
    /// catalog entry written before these flags existed stays selectable for
    /// every role, including the Editor (§4.6 backward-compat guarantee).
    #[serde(default = "permissive")]
    pub supports_tools: bool,
    #[serde(default = "permissive")]
    pub supports_file_operations: bool,
}

fn permissive() -> bool {
    true
}

impl ModelProfile {
    /// Editor-role calls require both flags; other roles only need `supports_tools`.
    pub fn supports_role(&self, role_requires_file_ops: bool) -> bool {
        self.supports_tools && (!role_requires_file_ops || self.supports_file_operations)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    pub success_bonus: f64,
    pub failure_penalty: f64,
    pub min_samples: u32,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        SelectorConfig {
            success_bonus: 20.0,
            failure_penalty: -40.0,
            min_samples: 3,
        }
    }
}

/// Which policy-enabled verifier stages run for a movement, on top of the
/// always-considered build/test intersection rule (§4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierConfig {
    pub lint_enabled: bool,
    pub coverage_enabled: bool,
    pub security_enabled: bool,
    pub coverage_threshold_percent: f64,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        VerifierConfig {
            lint_enabled: true,
            coverage_enabled: false,
            security_enabled: false,
            coverage_threshold_percent: 80.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    pub max_attempts_per_movement: u32,
    pub max_iterations_per_agent_turn: u32,
    pub command_timeout_seconds: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            max_attempts_per_movement: 3,
            max_iterations_per_agent_turn: 25,
            command_timeout_seconds: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub default_provider: Option<String>,
    pub providers: HashMap<String, ProviderConfig>,
    pub selector: SelectorConfig,
    pub executor: ExecutorConfig,
    pub verifier: VerifierConfig,
    pub log_level: String,
    pub workspace_root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let mut providers = HashMap::new();
        providers.insert(
            "anthropic".to_string(),
            ProviderConfig {
                base_url: Some("https://api.anthropic.com".to_string()),
                api_key_env: Some("ANTHROPIC_API_KEY".to_string()),
                timeout_seconds: 60,
                models: vec![ModelProfile {
                    name: "claude-sonnet".to_string(),
                    context_window: 200_000,
                    cost_per_1k_tokens: 0.003,
                    throughput_tokens_per_sec: 60.0,
                    daily_rate_limit: Some(10_000),
                    supports_tools: true,
                    supports_file_operations: true,
                }],
            },
        );
        providers.insert(
            "ollama".to_string(),
            ProviderConfig {
                base_url: Some("http://localhost:11434".to_string()),
                api_key_env: None,
                timeout_seconds: 120,
                models: vec![ModelProfile {
                    name: "llama3".to_string(),
                    context_window: 8_192,
                    cost_per_1k_tokens: 0.0,
                    throughput_tokens_per_sec: 25.0,
                    daily_rate_limit: None,
                    supports_tools: true,
                    supports_file_operations: true,
                }],
            },
        );

        Config {
            default_provider: Some("anthropic".to_string()),
            providers,
            selector: SelectorConfig::default(),
            executor: ExecutorConfig::default(),
            verifier: VerifierConfig::default(),
            log_level: "info".to_string(),
            workspace_root: PathBuf::from("."),
        }
    }
}

/// CLI overrides collected by `clap`, passed in as plain data. Only the
/// fields a subcommand actually exposes are `Some`.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub provider: Option<String>,
    pub max_attempts: Option<u32>,
    pub log_level: Option<String>,
    pub workspace_root: Option<PathBuf>,
}

/// Assembles a `Config` from defaults, an optional `setup.yaml`, the process
/// environment and CLI overrides, in that precedence order. Pure: takes its
/// inputs as arguments and returns a fresh value, touching no global state.
pub fn load(setup_yaml_path: Option<&Path>, env: &HashMap<String, String>, cli: &CliOverrides) -> Result<Config> {
    let mut config = Config::default();

    if let Some(path) = setup_yaml_path {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            let file_config: FileConfig = serde_yaml::from_str(&content)
                .with_context(|| format!("parsing config file {}", path.display()))?;
            file_config.apply(&mut config);
        }
    }

    apply_env(&mut config, env);
    apply_cli(&mut config, cli);

    Ok(config)
}

/// Partial config as found on disk; every field optional so an operator's
/// `setup.yaml` only needs to mention what it overrides.
#[derive(Debug, Clone, Deserialize)]
struct FileConfig {
    default_provider: Option<String>,
    #[serde(default)]
    providers: HashMap<String, ProviderConfig>,
    selector: Option<SelectorConfig>,
    executor: Option<ExecutorConfig>,
    verifier: Option<VerifierConfig>,
    log_level: Option<String>,
    workspace_root: Option<PathBuf>,
}

impl FileConfig {
    fn apply(self, config: &mut Config) {
        if let Some(provider) = self.default_provider {
            config.default_provider = Some(provider);
        }
        for (name, provider_config) in self.providers {
            config.providers.insert(name, provider_config);
        }
        if let Some(selector) = self.selector {
            config.selector = selector;
        }
        if let Some(executor) = self.executor {
            config.executor = executor;
        }
        if let Some(verifier) = self.verifier {
            config.verifier = verifier;
        }
        if let Some(log_level) = self.log_level {
            config.log_level = log_level;
        }
        if let Some(workspace_root) = self.workspace_root {
            config.workspace_root = workspace_root;
        }
    }
}

fn apply_env(config: &mut Config, env: &HashMap<String, String>) {
    if let Some(provider) = env.get("MAESTRO_DEFAULT_PROVIDER") {
        config.default_provider = Some(provider.clone());
    }
    if let Some(log_level) = env.get("MAESTRO_LOG_LEVEL") {
        config.log_level = log_level.clone();
    }
    if let Some(max_attempts) = env.get("MAESTRO_MAX_ATTEMPTS") {
        if let Ok(parsed) = max_attempts.parse() {
            config.executor.max_attempts_per_movement = parsed;
        }
    }
    if let Some(timeout) = env.get("MAESTRO_COMMAND_TIMEOUT_SECONDS") {
        if let Ok(parsed) = timeout.parse() {
            config.executor.command_timeout_seconds = parsed;
        }
    }
    if let Some(workspace_root) = env.get("MAESTRO_WORKSPACE_ROOT") {
        config.workspace_root = PathBuf::from(workspace_root);
    }
}

fn apply_cli(config: &mut Config, cli: &CliOverrides) {
    if let Some(provider) = &cli.provider {
        config.default_provider = Some(provider.clone());
    }
    if let Some(max_attempts) = cli.max_attempts {
        config.executor.max_attempts_per_movement = max_attempts;
    }
    if let Some(log_level) = &cli.log_level {
        config.log_level = log_level.clone();
    }
    if let Some(workspace_root) = &cli.workspace_root {
        config.workspace_root = workspace_root.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_an_anthropic_provider() {
        let config = Config::default();
        assert!(config.providers.contains_key("anthropic"));
        assert_eq!(config.selector.min_samples, 3);
    }

    #[test]
    fn env_overrides_take_precedence_over_file_and_defaults() {
        let mut env = HashMap::new();
        env.insert("MAESTRO_DEFAULT_PROVIDER".to_string(), "ollama".to_string());
        env.insert("MAESTRO_MAX_ATTEMPTS".to_string(), "7".to_string());

        let config = load(None, &env, &CliOverrides::default()).unwrap();
        assert_eq!(config.default_provider.as_deref(), Some("ollama"));
        assert_eq!(config.executor.max_attempts_per_movement, 7);
    }

    #[test]
    fn cli_overrides_take_precedence_over_env() {
        let mut env = HashMap::new();
        env.insert("MAESTRO_DEFAULT_PROVIDER".to_string(), "ollama".to_string());
        let cli = CliOverrides {
            provider: Some("anthropic".to_string()),
            ..Default::default()
        };

        let config = load(None, &env, &cli).unwrap();
        assert_eq!(config.default_provider.as_deref(), Some("anthropic"));
    }

    #[test]
    fn legacy_model_profile_without_capability_flags_is_permissive() {
        let json = r#"{"name":"old-model","context_window":4096,"cost_per_1k_tokens":0.01,"throughput_tokens_per_sec":10.0}"#;
        let profile: ModelProfile = serde_json::from_str(json).unwrap();
        assert!(profile.supports_tools);
        assert!(profile.supports_file_operations);
        assert!(profile.supports_role(true));
    }

    #[test]
    fn missing_setup_yaml_falls_back_to_defaults_silently() {
        let config = load(Some(Path::new("/nonexistent/setup.yaml")), &HashMap::new(), &CliOverrides::default()).unwrap();
        assert_eq!(config.default_provider.as_deref(), Some("anthropic"));
    }
}
