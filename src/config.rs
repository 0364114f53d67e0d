//! Configuration for providers and failover behavior
//!
//! Read once at startup, either from a JSON file or from the
//! environment, and never mutated afterwards.

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use log::{debug, info};

use crate::error::ConfigError;
use crate::Provider;

pub const DEFAULT_OPENROUTER_MODEL: &str = "openai/gpt-3.5-turbo";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3";
pub const DEFAULT_OLLAMA_BASE: &str = "http://localhost:11434";

/// Provider configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig
{   /// Provider family
    pub provider: Provider
  , /// Model identifier sent upstream
    pub model: String
  , /// API credential, if the provider needs one
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>
  , /// API base URL (if custom)
    #[serde(default)]
    pub api_base: Option<String>
  , /// Request timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>
  , /// Override of the failover max attempts for this provider
    #[serde(default)]
    pub max_attempts: Option<u32>
}

impl ProviderConfig
{   pub fn new(provider: Provider, model: impl Into<String>) -> Self
    {   ProviderConfig
        {   provider
          , model: model.into()
          , api_key: None
          , api_base: None
          , timeout_secs: None
          , max_attempts: None
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self
    {   self.api_key = Some(key.into());
        self
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self
    {   self.api_base = Some(base.into());
        self
    }
}

/// Failover configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FailoverConfig
{   /// Enable the fallback provider
    pub enabled: bool
  , /// Max attempts against the primary provider
    pub max_attempts: u32
  , /// Smallest delay between attempts in milliseconds
    pub min_backoff_ms: u64
  , /// Largest delay between attempts in milliseconds
    pub max_backoff_ms: u64
  , /// Backoff multiplier for retries
    pub backoff_multiplier: f64
  , /// Random spread applied to each delay (0.0..=1.0)
    pub jitter_factor: f64
  , /// Upper bound on a single attempt in seconds
    pub attempt_timeout_secs: u64
}

impl Default for FailoverConfig
{   fn default() -> Self
    {   FailoverConfig
        {   enabled: true
          , max_attempts: 5
          , min_backoff_ms: 1_000
          , max_backoff_ms: 60_000
          , backoff_multiplier: 2.0
          , jitter_factor: 0.1
          , attempt_timeout_secs: 30
        }
    }
}

fn default_data_dir() -> PathBuf
{   PathBuf::from("data")
}

/// Top level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig
{   /// Providers in priority order: primary, then fallback
    pub providers: Vec<ProviderConfig>
  , /// Failover configuration
    #[serde(default)]
    pub failover: FailoverConfig
  , /// Directory the summarize feature reads named sources from
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf
}

impl Default for AppConfig
{   fn default() -> Self
    {   AppConfig
        {   providers: vec![
              ProviderConfig::new(
                Provider::OpenRouter
              , DEFAULT_OPENROUTER_MODEL
              )
            , ProviderConfig::new(Provider::Local, DEFAULT_OLLAMA_MODEL)
                .with_api_base(DEFAULT_OLLAMA_BASE)
            ]
          , failover: FailoverConfig::default()
          , data_dir: default_data_dir()
        }
    }
}

impl AppConfig
{   /// Load configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>)
      -> Result<Self, ConfigError>
    {   let path = path.as_ref();
        debug!("Loading config from {}", path.display());
        let raw = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        info!(
          "Loaded {} provider(s) from {}",
          config.providers.len(),
          path.display()
        );
        Ok(config)
    }

    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError>
    {   Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
      F: Fn(&str) -> Option<String>
    {   let var = |key: &str| {
          lookup(key).filter(|v| !v.trim().is_empty())
        };

        let primary_kind = match var("ASSISTANT_PRIMARY")
        {   Some(name) => name.parse::<Provider>()?
          , None => Provider::OpenRouter
        };

        let mut openrouter = ProviderConfig::new(
          Provider::OpenRouter
        , var("OPENROUTER_MODEL")
            .unwrap_or_else(|| DEFAULT_OPENROUTER_MODEL.to_string())
        );
        openrouter.api_key = var("OPENROUTER_API_KEY");
        openrouter.api_base = var("OPENROUTER_BASE_URL");

        let mut gemini = ProviderConfig::new(
          Provider::Google
        , var("GEMINI_MODEL")
            .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string())
        );
        gemini.api_key = var("GOOGLE_GEMINI_API_KEY");

        let local = ProviderConfig::new(
          Provider::Local
        , var("OLLAMA_MODEL")
            .unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string())
        )
        .with_api_base(
          var("OLLAMA_BASE_URL")
            .unwrap_or_else(|| DEFAULT_OLLAMA_BASE.to_string())
        );

        let primary = match primary_kind
        {   Provider::OpenRouter => openrouter
          , Provider::Google => gemini
          , Provider::Local => {
              return Err(ConfigError::Invalid(
                "the local provider can only be the fallback".to_string()
              ));
            }
        };

        let mut failover = FailoverConfig::default();
        if let Some(raw) = var("ASSISTANT_MAX_ATTEMPTS")
        {   failover.max_attempts = raw.trim().parse().map_err(|_| {
              ConfigError::Invalid(
                format!("ASSISTANT_MAX_ATTEMPTS is not a number: {}", raw)
              )
            })?;
        }

        let config = AppConfig
        {   providers: vec![primary, local]
          , failover
          , data_dir: var("ASSISTANT_DATA_DIR")
              .map(PathBuf::from)
              .unwrap_or_else(default_data_dir)
        };
        config.validate()?;
        Ok(config)
    }

    /// Check invariants the gateway relies on
    pub fn validate(&self) -> Result<(), ConfigError>
    {   if self.providers.is_empty()
        {   return Err(ConfigError::Invalid(
              "at least one provider is required".to_string()
            ));
        }
        if self.failover.max_attempts == 0
        {   return Err(ConfigError::Invalid(
              "max_attempts must be at least 1".to_string()
            ));
        }
        if self.failover.min_backoff_ms > self.failover.max_backoff_ms
        {   return Err(ConfigError::Invalid(
              "min_backoff_ms exceeds max_backoff_ms".to_string()
            ));
        }
        if self.failover.attempt_timeout_secs == 0
        {   return Err(ConfigError::Invalid(
              "attempt_timeout_secs must be at least 1".to_string()
            ));
        }
        if let Some(empty) = self.providers
          .iter()
          .find(|p| p.model.trim().is_empty())
        {   return Err(ConfigError::Invalid(
              format!("{} has an empty model", empty.provider)
            ));
        }
        Ok(())
    }
}
