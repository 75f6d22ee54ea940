use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Deserialize;

#[derive(Clone)]
pub struct Config {
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub data_dir: PathBuf,
    pub prompt_config_path: PathBuf,
    pub evogen_config_path: PathBuf,
    pub model_config_path: PathBuf,
    pub api_key: String,
    pub llm_timeout_secs: u64,
    /// Env vars that were set but unparseable; their defaults were used.
    pub invalid_env: Vec<InvalidEnv>,
}

/// An env var whose value could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidEnv {
    pub key: &'static str,
    pub value: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("log_level", &self.log_level)
            .field("enable_file_logs", &self.enable_file_logs)
            .field("log_dir", &self.log_dir)
            .field("data_dir", &self.data_dir)
            .field("prompt_config_path", &self.prompt_config_path)
            .field("evogen_config_path", &self.evogen_config_path)
            .field("model_config_path", &self.model_config_path)
            .field("api_key", &"***REDACTED***")
            .field("llm_timeout_secs", &self.llm_timeout_secs)
            .field("invalid_env", &self.invalid_env)
            .finish()
    }
}

impl Config {
    /// Reads process configuration. Malformed values fall back to their
    /// defaults and are collected in `invalid_env`, since this runs before
    /// tracing is installed; call [`Config::warn_invalid_env`] afterwards.
    pub fn from_env() -> Self {
        let mut invalid_env = Vec::new();
        Self {
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false, &mut invalid_env),
            log_dir: env_or("LOG_DIR", "./logs"),
            data_dir: PathBuf::from(env_or("DATABASE_PATH", "./data")),
            prompt_config_path: PathBuf::from(env_or(
                "PROMPT_CONFIG_PATH",
                "./config/prompt_config.json",
            )),
            evogen_config_path: PathBuf::from(env_or(
                "EVOGEN_CONFIG_PATH",
                "./config/evogen_config.json",
            )),
            model_config_path: PathBuf::from(env_or(
                "MODEL_CONFIG_PATH",
                "./config/model_config.json",
            )),
            api_key: env_or("OPENAI_API_KEY", ""),
            llm_timeout_secs: env_or_parse("LLM_TIMEOUT_SECS", 60_u64, &mut invalid_env),
            invalid_env,
        }
    }

    pub fn warn_invalid_env(&self) {
        for invalid in &self.invalid_env {
            tracing::warn!(
                key = invalid.key,
                value = %invalid.value,
                "Failed to parse env var, using default"
            );
        }
    }

    pub fn sled_path(&self) -> PathBuf {
        self.data_dir.join("questions.sled")
    }

    pub fn scores_path(&self) -> PathBuf {
        self.data_dir.join("scores.json")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing configuration: {key}")]
    Missing { key: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ConfigError {
    pub fn missing(key: impl Into<String>) -> Self {
        Self::Missing { key: key.into() }
    }
}

/// Which OpenAI-compatible backend serves completions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Openai,
    Ollama,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Openai => "openai",
            Self::Ollama => "ollama",
        }
    }
}

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Deserialize)]
struct RawModelConfig {
    provider: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
    embedding_model: Option<String>,
}

#[derive(Clone)]
pub struct LLMConfig {
    pub provider: ProviderKind,
    pub model: String,
    pub base_url: String,
    pub api_key: String,
    pub embedding_model: Option<String>,
    pub timeout_secs: u64,
}

impl fmt::Debug for LLMConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LLMConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &"***REDACTED***")
            .field("embedding_model", &self.embedding_model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl LLMConfig {
    /// Reads the model config file and merges in the credentials carried by
    /// the process environment.
    pub fn load(config: &Config) -> Result<Self, ConfigError> {
        let raw: RawModelConfig = read_json(&config.model_config_path)?;
        Self::from_parts(raw, &config.api_key, config.llm_timeout_secs)
    }

    fn from_parts(
        raw: RawModelConfig,
        api_key: &str,
        timeout_secs: u64,
    ) -> Result<Self, ConfigError> {
        let provider_name = raw.provider.ok_or_else(|| ConfigError::missing("provider"))?;
        let provider = ProviderKind::from_str(&provider_name)?;
        let model = raw
            .model
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| ConfigError::missing("model"))?;

        let base_url = match (provider, raw.base_url) {
            (_, Some(url)) if !url.trim().is_empty() => url.trim_end_matches('/').to_string(),
            (ProviderKind::Openai, _) => OPENAI_BASE_URL.to_string(),
            (ProviderKind::Ollama, _) => return Err(ConfigError::missing("base_url")),
        };

        if provider == ProviderKind::Openai && api_key.trim().is_empty() {
            return Err(ConfigError::missing("OPENAI_API_KEY"));
        }

        Ok(Self {
            provider,
            model,
            base_url,
            api_key: api_key.to_string(),
            embedding_model: raw.embedding_model.filter(|m| !m.trim().is_empty()),
            timeout_secs,
        })
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::Openai),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Invalid(format!("unknown provider '{other}'"))),
        }
    }
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let display = path.display().to_string();
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::missing(display));
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: display,
                source,
            })
        }
    };
    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: display,
        source,
    })
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &'static str, default: T, invalid: &mut Vec<InvalidEnv>) -> T
where
    T: FromStr,
{
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                invalid.push(InvalidEnv { key, value: raw });
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &'static str, default: bool, invalid: &mut Vec<InvalidEnv>) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => {
                invalid.push(InvalidEnv { key, value: raw });
                default
            }
        },
        Err(_) => default,
    }
}
