//! Generation gateway and feature pipeline.
//!
//! Feature handlers (chat, summarize, translate, code help, email
//! drafting) go through one [`router::ServiceRouter`], which calls a
//! [`features::FeatureProcessor`], which calls the
//! [`gateway::Gateway`], which drives a primary provider adapter with
//! retry and backoff and falls back to a second provider once.
//!
//! ```text
//! assistgate/
//! ├── src/
//! │   ├── lib.rs          # Re-exports, Provider, logging
//! │   ├── error.rs        # Error taxonomy
//! │   ├── config.rs       # Startup configuration
//! │   ├── request.rs      # GenerationRequest / GenerationResponse
//! │   ├── failover.rs     # Retry policy and provider ordering
//! │   ├── gateway.rs      # Retry, backoff, fallback
//! │   ├── context.rs      # Shared HTTP client, spec, gateway
//! │   ├── providers/      # One adapter per upstream family
//! │   ├── features/       # One processor per capability
//! │   └── router.rs       # Feature name -> processor
//! └── tests/
//! ```

pub mod error;
pub mod config;
pub mod providers;
pub mod request;
pub mod failover;
pub mod gateway;
pub mod context;
pub mod features;
pub mod router;

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

pub use context::AssistantContext;
pub use error::{AdapterError, AdapterErrorKind, GatewayError, RouterError};
pub use features::{FeatureProcessor, FeatureResult, Parameters};
pub use gateway::Gateway;
pub use request::{GenerationRequest, GenerationResponse, Usage};
pub use router::ServiceRouter;

/// Upstream provider families with an adapter in [`providers`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Provider
{   /// OpenRouter (OpenAI-compatible chat completions)
    #[serde(alias = "open_router")]
    OpenRouter
  , /// Google AI Studio (Gemini)
    #[serde(alias = "gemini")]
    Google
  , /// Local/self-hosted models served by Ollama
    #[serde(alias = "ollama")]
    Local
}

impl fmt::Display for Provider
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   match self
        {   Provider::OpenRouter => write!(f, "openrouter")
          , Provider::Google => write!(f, "gemini")
          , Provider::Local => write!(f, "ollama")
        }
    }
}

impl FromStr for Provider
{   type Err = error::ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {   match s.trim().to_ascii_lowercase().as_str()
        {   "openrouter" | "open_router" => Ok(Provider::OpenRouter)
          , "google" | "gemini" => Ok(Provider::Google)
          , "local" | "ollama" => Ok(Provider::Local)
          , other => Err(error::ConfigError::UnknownProvider(
              other.to_string()
            ))
        }
    }
}

/// Install an `env_logger` backend honouring `RUST_LOG`.
///
/// Defaults to `info`. Calling it again is a no-op.
pub fn init_logging()
{   let _ = env_logger::Builder::from_env(
      env_logger::Env::default().default_filter_or("info")
    )
    .format_timestamp_millis()
    .try_init();
}
