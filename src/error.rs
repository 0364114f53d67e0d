//! Error taxonomy for adapters, the gateway, the router and config

use std::fmt;
use thiserror::Error;

/// How an adapter failure should be treated by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterErrorKind
{   /// Network failure, timeout, rate limit or provider 5xx
    Transient
  , /// Malformed request or other rejected call
    Permanent
  , /// Reply body did not have the expected shape
    ParseFailure
  , /// Missing or rejected credential
    ConfigurationFailure
}

impl AdapterErrorKind
{   /// Whether another attempt against the same provider may help
    pub fn is_retryable(&self) -> bool
    {   matches!(
          self
        , AdapterErrorKind::Transient | AdapterErrorKind::ParseFailure
        )
    }
}

impl fmt::Display for AdapterErrorKind
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   match self
        {   AdapterErrorKind::Transient => write!(f, "transient")
          , AdapterErrorKind::Permanent => write!(f, "permanent")
          , AdapterErrorKind::ParseFailure => write!(f, "parse failure")
          , AdapterErrorKind::ConfigurationFailure => {
              write!(f, "configuration failure")
            }
        }
    }
}

/// A single failed call through a provider adapter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{provider} {kind}: {message}")]
pub struct AdapterError
{   pub kind: AdapterErrorKind
  , pub provider: String
  , pub message: String
}

impl AdapterError
{   pub fn new(
      kind: AdapterErrorKind
    , provider: impl Into<String>
    , message: impl Into<String>
    ) -> Self
    {   AdapterError
        {   kind
          , provider: provider.into()
          , message: message.into()
        }
    }

    pub fn transient(
      provider: impl Into<String>
    , message: impl Into<String>
    ) -> Self
    {   Self::new(AdapterErrorKind::Transient, provider, message)
    }

    pub fn permanent(
      provider: impl Into<String>
    , message: impl Into<String>
    ) -> Self
    {   Self::new(AdapterErrorKind::Permanent, provider, message)
    }

    pub fn parse(
      provider: impl Into<String>
    , message: impl Into<String>
    ) -> Self
    {   Self::new(AdapterErrorKind::ParseFailure, provider, message)
    }

    pub fn configuration(
      provider: impl Into<String>
    , message: impl Into<String>
    ) -> Self
    {   Self::new(
          AdapterErrorKind::ConfigurationFailure
        , provider
        , message
        )
    }

    pub fn is_retryable(&self) -> bool
    {   self.kind.is_retryable()
    }
}

/// Failure of a whole `generate` call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError
{   #[error("invalid request: {0}")]
    InvalidRequest(String)
  , #[error("request cancelled")]
    Cancelled
  , #[error("request deadline exceeded")]
    DeadlineExceeded
  , #[error(
      "all providers failed: primary after {primary_attempts} \
       attempt(s): {primary}; fallback: {}"
    , describe_fallback(.fallback)
    )]
    Exhausted
    {   primary: AdapterError
      , primary_attempts: u32
      , fallback: Option<AdapterError>
    }
}

fn describe_fallback(fallback: &Option<AdapterError>) -> String
{   match fallback
    {   Some(e) => e.to_string()
      , None => "not configured".to_string()
    }
}

/// Router lookup failure, distinct from a feature-level failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError
{   #[error("unknown feature: {0}")]
    UnknownFeature(String)
}

/// Startup configuration failure
#[derive(Debug, Error)]
pub enum ConfigError
{   #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error)
  , #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error)
  , #[error("unknown provider: {0}")]
    UnknownProvider(String)
  , #[error("invalid configuration: {0}")]
    Invalid(String)
  , #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error)
}
