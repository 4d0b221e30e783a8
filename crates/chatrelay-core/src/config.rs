//! Configuration loading and defaults.
//!
//! Config is a JSON5 file (all sections optional) with env-resolved
//! credentials. The provider API key is looked up once at startup; a missing
//! key is a setup failure, never a per-request one.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RelayError, Result};

/// Default system prompt when none is configured.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful, concise AI assistant.";

/// Top-level chatrelay configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub provider: ProviderSettings,
    pub agent: AgentSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub bind: String,
    pub port: u16,

    /// Hard cap on one turn's streaming time, in seconds. Expiry is a turn
    /// failure: the client gets a single `error` event and the connection
    /// stays open.
    pub turn_timeout_secs: u64,

    /// Connections with no inbound message for this long are closed.
    pub idle_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 8000,
            turn_timeout_secs: 120,
            idle_timeout_secs: 900,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub model: String,

    /// Override the provider base URL (mainly for tests and proxies).
    pub base_url: Option<String>,

    /// Name of the environment variable holding the API key.
    pub api_key_env: String,

    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            model: "llama-3.1-8b-instant".into(),
            base_url: None,
            api_key_env: "GROQ_API_KEY".into(),
            temperature: 0.0,
            max_tokens: 1024,
        }
    }
}

/// Which turn-handler variant the gateway runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnMode {
    #[default]
    Llm,
    Agent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub mode: TurnMode,
    pub max_tool_iterations: u32,
    pub system_prompt: Option<String>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            mode: TurnMode::Llm,
            max_tool_iterations: 4,
            system_prompt: None,
        }
    }
}

impl Config {
    /// Default config file location (`~/.config/chatrelay/chatrelay.json5`).
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("chatrelay")
            .join("chatrelay.json5")
    }

    /// Load config from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        json5::from_str(&raw)
            .map_err(|e| RelayError::Config(format!("{}: {e}", path.display())))
    }

    /// Resolve the provider API key from the process environment.
    pub fn resolve_api_key(&self) -> Result<String> {
        std::env::var(&self.provider.api_key_env).map_err(|_| {
            RelayError::Config(format!(
                "environment variable {} is not set",
                self.provider.api_key_env
            ))
        })
    }

    pub fn system_prompt(&self) -> &str {
        self.agent
            .system_prompt
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }

    pub fn turn_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway.turn_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway.idle_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.gateway.port, 8000);
        assert_eq!(config.gateway.bind, "0.0.0.0");
        assert_eq!(config.provider.model, "llama-3.1-8b-instant");
        assert_eq!(config.provider.api_key_env, "GROQ_API_KEY");
        assert_eq!(config.agent.mode, TurnMode::Llm);
        assert_eq!(config.system_prompt(), DEFAULT_SYSTEM_PROMPT);
        assert_eq!(config.turn_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_load_missing_file_is_defaults() {
        let config = Config::load(Path::new("/nonexistent/chatrelay.json5")).unwrap();
        assert_eq!(config.gateway.port, 8000);
    }

    #[test]
    fn test_load_partial_json5() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chatrelay.json5");
        std::fs::write(
            &path,
            r#"{
                // agent deployment on a non-default port
                gateway: { port: 9100 },
                agent: { mode: "agent", max_tool_iterations: 2 },
            }"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.gateway.port, 9100);
        assert_eq!(config.gateway.bind, "0.0.0.0");
        assert_eq!(config.agent.mode, TurnMode::Agent);
        assert_eq!(config.agent.max_tool_iterations, 2);
        // untouched sections keep their defaults
        assert_eq!(config.provider.model, "llama-3.1-8b-instant");
    }

    #[test]
    fn test_load_invalid_json5_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json5");
        std::fs::write(&path, "{ gateway: [ }").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, RelayError::Config(_)));
    }

    #[test]
    fn test_resolve_api_key_missing() {
        let config = Config {
            provider: ProviderSettings {
                api_key_env: "CHATRELAY_TEST_KEY_THAT_IS_NEVER_SET".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        let err = config.resolve_api_key().unwrap_err();
        assert!(err.to_string().contains("CHATRELAY_TEST_KEY_THAT_IS_NEVER_SET"));
    }

    #[test]
    fn test_custom_system_prompt() {
        let config = Config {
            agent: AgentSettings {
                system_prompt: Some("Talk like a pirate.".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(config.system_prompt(), "Talk like a pirate.");
    }
}
