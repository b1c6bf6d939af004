//! Application configuration loaded from the environment
//!
//! Credentials for the hosted model and the search provider are required;
//! a missing one fails fast with [`ConfigError`] before any agent is built.
//! Everything else has a default and may be overridden through `RESEARCH_*`
//! variables.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Environment variable names understood by [`AppConfig::from_env`]
pub mod keys {
    pub const AZURE_API_KEY: &str = "AZURE_OPENAI_API_KEY";
    pub const AZURE_ENDPOINT: &str = "AZURE_OPENAI_ENDPOINT";
    pub const AZURE_DEPLOYMENT: &str = "AZURE_OPENAI_DEPLOYMENT_NAME";
    pub const AZURE_API_VERSION: &str = "AZURE_OPENAI_API_VERSION";
    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
    pub const OPENAI_API_BASE: &str = "OPENAI_API_BASE";
    pub const MODEL: &str = "RESEARCH_MODEL";
    pub const LLM_TIMEOUT: &str = "RESEARCH_LLM_TIMEOUT_SECS";
    pub const TAVILY_API_KEY: &str = "TAVILY_API_KEY";
    pub const TAVILY_API_BASE: &str = "TAVILY_API_BASE";
    pub const SEARCH_MAX_RESULTS: &str = "RESEARCH_SEARCH_MAX_RESULTS";
    pub const MAX_SEARCH_ROUNDS: &str = "RESEARCH_MAX_SEARCH_ROUNDS";
    pub const MAX_HANDOFFS: &str = "RESEARCH_MAX_HANDOFFS";
    pub const MAX_AGENT_ITERATIONS: &str = "RESEARCH_MAX_AGENT_ITERATIONS";
    pub const HOST: &str = "RESEARCH_HOST";
    pub const PORT: &str = "RESEARCH_PORT";
}

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_AZURE_API_VERSION: &str = "2024-10-21";
const DEFAULT_TAVILY_API_BASE: &str = "https://api.tavily.com";
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;

/// Result type for configuration loading
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors raised while loading or validating configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required environment variable is not set (or is blank)
    #[error("missing required setting {0}")]
    Missing(String),

    /// A setting is present but cannot be used
    #[error("invalid value for {key}: {reason}")]
    Invalid {
        /// Offending key
        key: String,
        /// Why the value was rejected
        reason: String,
    },
}

/// Which flavour of OpenAI-compatible endpoint to talk to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LlmBackend {
    /// api.openai.com or any OpenAI-compatible server
    OpenAi {
        /// Bearer token
        api_key: String,
        /// Base URL ending in `/v1`
        api_base: String,
    },
    /// Azure OpenAI deployment
    Azure {
        /// `api-key` header value
        api_key: String,
        /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`
        endpoint: String,
        /// Deployment name
        deployment: String,
        /// `api-version` query parameter
        api_version: String,
    },
}

/// Hosted model settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmSettings {
    pub backend: LlmBackend,
    /// Model identifier sent with each request
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Web search provider settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSettings {
    pub api_key: String,
    pub api_base: String,
    /// Results requested per query
    pub max_results: usize,
}

/// Bounds that keep a research run finite
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkflowLimits {
    /// Maximum number of search hand-offs per run
    pub max_search_rounds: usize,
    /// Hard cap on coordinator hand-offs per run
    pub max_handoffs: usize,
    /// Maximum LLM/tool iterations inside one agent turn
    pub max_agent_iterations: usize,
    /// Max tokens per completion
    pub max_tokens: usize,
    /// Sampling temperature
    pub temperature: f32,
}

impl Default for WorkflowLimits {
    fn default() -> Self {
        Self {
            max_search_rounds: 5,
            max_handoffs: 16,
            max_agent_iterations: 10,
            max_tokens: 4096,
            temperature: 0.7,
        }
    }
}

impl WorkflowLimits {
    /// Validate the limits
    pub fn validate(&self) -> Result<()> {
        if self.max_search_rounds == 0 {
            return Err(invalid(keys::MAX_SEARCH_ROUNDS, "must be greater than 0"));
        }
        // plan + searches + edit must fit
        if self.max_handoffs < self.max_search_rounds.saturating_add(2) {
            return Err(invalid(
                keys::MAX_HANDOFFS,
                "must leave room for planning, every search round and editing",
            ));
        }
        if self.max_agent_iterations == 0 {
            return Err(invalid(keys::MAX_AGENT_ITERATIONS, "must be greater than 0"));
        }
        Ok(())
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
        }
    }
}

impl ServerSettings {
    /// `host:port` string suitable for binding
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub llm: LlmSettings,
    pub search: SearchSettings,
    pub limits: WorkflowLimits,
    pub server: ServerSettings,
}

impl AppConfig {
    /// Load configuration from the process environment
    ///
    /// A `.env` file in the working directory (or a parent) is read first;
    /// variables already set in the environment win.
    pub fn from_env() -> Result<Self> {
        // A missing .env file is normal in deployed environments
        let _ = dotenv::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let backend = if let Some(api_key) = get(keys::AZURE_API_KEY) {
            LlmBackend::Azure {
                api_key,
                endpoint: get(keys::AZURE_ENDPOINT)
                    .ok_or_else(|| ConfigError::Missing(keys::AZURE_ENDPOINT.to_string()))?,
                deployment: get(keys::AZURE_DEPLOYMENT)
                    .ok_or_else(|| ConfigError::Missing(keys::AZURE_DEPLOYMENT.to_string()))?,
                api_version: get(keys::AZURE_API_VERSION)
                    .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string()),
            }
        } else if let Some(api_key) = get(keys::OPENAI_API_KEY) {
            LlmBackend::OpenAi {
                api_key,
                api_base: get(keys::OPENAI_API_BASE)
                    .unwrap_or_else(|| DEFAULT_OPENAI_API_BASE.to_string()),
            }
        } else {
            return Err(ConfigError::Missing(format!(
                "{} or {}",
                keys::AZURE_API_KEY,
                keys::OPENAI_API_KEY
            )));
        };

        let llm = LlmSettings {
            backend,
            model: get(keys::MODEL).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout_secs: parse_or(get(keys::LLM_TIMEOUT), keys::LLM_TIMEOUT, DEFAULT_LLM_TIMEOUT_SECS)?,
        };

        let search = SearchSettings {
            api_key: get(keys::TAVILY_API_KEY)
                .ok_or_else(|| ConfigError::Missing(keys::TAVILY_API_KEY.to_string()))?,
            api_base: get(keys::TAVILY_API_BASE)
                .unwrap_or_else(|| DEFAULT_TAVILY_API_BASE.to_string()),
            max_results: parse_or(get(keys::SEARCH_MAX_RESULTS), keys::SEARCH_MAX_RESULTS, 5)?,
        };

        let defaults = WorkflowLimits::default();
        let limits = WorkflowLimits {
            max_search_rounds: parse_or(
                get(keys::MAX_SEARCH_ROUNDS),
                keys::MAX_SEARCH_ROUNDS,
                defaults.max_search_rounds,
            )?,
            max_handoffs: parse_or(
                get(keys::MAX_HANDOFFS),
                keys::MAX_HANDOFFS,
                defaults.max_handoffs,
            )?,
            max_agent_iterations: parse_or(
                get(keys::MAX_AGENT_ITERATIONS),
                keys::MAX_AGENT_ITERATIONS,
                defaults.max_agent_iterations,
            )?,
            ..defaults
        };

        let server_defaults = ServerSettings::default();
        let server = ServerSettings {
            host: get(keys::HOST).unwrap_or(server_defaults.host),
            port: parse_or(get(keys::PORT), keys::PORT, server_defaults.port)?,
        };

        let config = Self {
            llm,
            search,
            limits,
            server,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        match &self.llm.backend {
            LlmBackend::OpenAi { api_base, .. } => check_url(keys::OPENAI_API_BASE, api_base)?,
            LlmBackend::Azure { endpoint, .. } => check_url(keys::AZURE_ENDPOINT, endpoint)?,
        }
        check_url(keys::TAVILY_API_BASE, &self.search.api_base)?;

        if self.llm.timeout_secs == 0 {
            return Err(invalid(keys::LLM_TIMEOUT, "must be greater than 0"));
        }
        if self.search.max_results == 0 {
            return Err(invalid(keys::SEARCH_MAX_RESULTS, "must be greater than 0"));
        }

        self.limits.validate()
    }

    /// Override the server address (used by command-line flags)
    pub fn with_server(mut self, host: impl Into<String>, port: u16) -> Self {
        self.server = ServerSettings {
            host: host.into(),
            port,
        };
        self
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, key: &str, default: T) -> Result<T> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| invalid(key, &format!("'{raw}' is not a valid number"))),
    }
}

fn check_url(key: &str, value: &str) -> Result<()> {
    let url = Url::parse(value).map_err(|e| invalid(key, &e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(key, "must be an http(s) URL"));
    }
    Ok(())
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_openai_config() {
        let config = AppConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("TAVILY_API_KEY", "tvly-test"),
        ]))
        .unwrap();

        assert_eq!(
            config.llm.backend,
            LlmBackend::OpenAi {
                api_key: "sk-test".to_string(),
                api_base: "https://api.openai.com/v1".to_string(),
            }
        );
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.search.api_base, "https://api.tavily.com");
        assert_eq!(config.limits, WorkflowLimits::default());
        assert_eq!(config.server.bind_address(), "127.0.0.1:8501");
    }

    #[test]
    fn test_azure_takes_precedence() {
        let config = AppConfig::from_lookup(lookup(&[
            ("AZURE_OPENAI_API_KEY", "az-key"),
            ("AZURE_OPENAI_ENDPOINT", "https://res.openai.azure.com"),
            ("AZURE_OPENAI_DEPLOYMENT_NAME", "gpt4o-mini"),
            ("OPENAI_API_KEY", "sk-ignored"),
            ("TAVILY_API_KEY", "tvly-test"),
        ]))
        .unwrap();

        match config.llm.backend {
            LlmBackend::Azure {
                deployment,
                api_version,
                ..
            } => {
                assert_eq!(deployment, "gpt4o-mini");
                assert_eq!(api_version, DEFAULT_AZURE_API_VERSION);
            }
            LlmBackend::OpenAi { .. } => panic!("Expected Azure backend"),
        }
    }

    #[test]
    fn test_missing_llm_credentials() {
        let err = AppConfig::from_lookup(lookup(&[("TAVILY_API_KEY", "tvly-test")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_azure_requires_deployment() {
        let err = AppConfig::from_lookup(lookup(&[
            ("AZURE_OPENAI_API_KEY", "az-key"),
            ("AZURE_OPENAI_ENDPOINT", "https://res.openai.azure.com"),
            ("TAVILY_API_KEY", "tvly-test"),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Missing("AZURE_OPENAI_DEPLOYMENT_NAME".to_string())
        );
    }

    #[test]
    fn test_missing_search_credentials() {
        let err = AppConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("TAVILY_API_KEY".to_string()));
    }

    #[test]
    fn test_blank_value_is_missing() {
        let err = AppConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "   "),
            ("TAVILY_API_KEY", "tvly-test"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
    }

    #[test]
    fn test_invalid_number() {
        let err = AppConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("TAVILY_API_KEY", "tvly-test"),
            ("RESEARCH_PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "RESEARCH_PORT"));
    }

    #[test]
    fn test_invalid_url() {
        let err = AppConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_API_BASE", "localhost:1234"),
            ("TAVILY_API_KEY", "tvly-test"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_limits_validation() {
        let limits = WorkflowLimits {
            max_search_rounds: 5,
            max_handoffs: 6,
            ..Default::default()
        };
        assert!(limits.validate().is_err());

        let limits = WorkflowLimits {
            max_search_rounds: 0,
            ..Default::default()
        };
        assert!(limits.validate().is_err());

        assert!(WorkflowLimits::default().validate().is_ok());
    }

    #[test]
    fn test_huge_search_rounds_rejected() {
        let err = AppConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("TAVILY_API_KEY", "tvly-test"),
            ("RESEARCH_MAX_SEARCH_ROUNDS", &usize::MAX.to_string()),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "RESEARCH_MAX_HANDOFFS"));
    }

    #[test]
    fn test_limit_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("TAVILY_API_KEY", "tvly-test"),
            ("RESEARCH_MAX_SEARCH_ROUNDS", "3"),
            ("RESEARCH_MAX_HANDOFFS", "8"),
        ]))
        .unwrap();
        assert_eq!(config.limits.max_search_rounds, 3);
        assert_eq!(config.limits.max_handoffs, 8);
    }

    #[test]
    fn test_with_server_override() {
        let config = AppConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("TAVILY_API_KEY", "tvly-test"),
        ]))
        .unwrap()
        .with_server("0.0.0.0", 9000);
        assert_eq!(config.server.bind_address(), "0.0.0.0:9000");
    }

    #[test]
    fn test_config_serializes_backend_tag() {
        let backend = LlmBackend::OpenAi {
            api_key: "k".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
        };
        let json = serde_json::to_value(&backend).unwrap();
        assert_eq!(json["kind"], "open_ai");
    }
}
