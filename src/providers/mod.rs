//! LLM provider adapters
//!
//! Each adapter owns its wire format: how the system instruction and
//! prompt are combined, where the text lives in the reply, and how HTTP
//! failures map onto [`AdapterErrorKind`]. Nothing above this module
//! sees provider field names.

pub mod openrouter;
pub mod gemini;
pub mod ollama;

use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use log::{debug, trace, warn};
use reqwest::StatusCode;

use crate::config::ProviderConfig;
use crate::error::{AdapterError, AdapterErrorKind, ConfigError};
use crate::request::{GenerationRequest, GenerationResponse};
use crate::Provider;

pub use gemini::GeminiAdapter;
pub use ollama::OllamaAdapter;
pub use openrouter::OpenRouterAdapter;

const ERROR_BODY_LIMIT: usize = 300;

/// A translation layer between normalized requests and one provider
#[async_trait]
pub trait ProviderAdapter: Send + Sync
{   /// Provider name used in logs and errors
    fn provider(&self) -> &str;

    /// Configured model identifier
    fn model(&self) -> &str;

    /// Perform one call. Never retries on its own.
    async fn generate(
      &self
    , request: &GenerationRequest
    ) -> Result<GenerationResponse, AdapterError>;
}

/// Build the adapter for a configured provider
pub fn build_adapter(
  config: &ProviderConfig
, http: reqwest::Client
) -> Result<Arc<dyn ProviderAdapter>, ConfigError>
{   debug!("Building {} adapter for {}", config.provider, config.model);
    if let Some(base) = &config.api_base
    {   reqwest::Url::parse(base).map_err(|e| {
          ConfigError::Invalid(
            format!("{} api_base {:?}: {}", config.provider, base, e)
          )
        })?;
    }
    let adapter: Arc<dyn ProviderAdapter> = match config.provider
    {   Provider::OpenRouter => Arc::new(
          OpenRouterAdapter::new(http, config.model.clone())
            .with_api_key(config.api_key.clone())
            .with_api_base(config.api_base.clone())
            .with_timeout(config.timeout_secs.map(Duration::from_secs))
        )
      , Provider::Google => Arc::new(
          GeminiAdapter::new(http, config.model.clone())
            .with_api_key(config.api_key.clone())
            .with_api_base(config.api_base.clone())
            .with_timeout(config.timeout_secs.map(Duration::from_secs))
        )
      , Provider::Local => Arc::new(
          OllamaAdapter::new(http, config.model.clone())
            .with_api_base(config.api_base.clone())
            .with_timeout(config.timeout_secs.map(Duration::from_secs))
        )
    };
    Ok(adapter)
}

/// Map a non-success HTTP status onto a retry classification
pub fn classify_status(status: StatusCode) -> AdapterErrorKind
{   match status.as_u16()
    {   401 | 403 => AdapterErrorKind::ConfigurationFailure
      , 408 | 425 | 429 => AdapterErrorKind::Transient
      , code if code >= 500 => AdapterErrorKind::Transient
      , _ => AdapterErrorKind::Permanent
    }
}

/// Map a transport error; the URL is dropped so query keys never leak
pub(crate) fn classify_transport(
  provider: &str
, error: reqwest::Error
) -> AdapterError
{   let kind = if error.is_builder()
    {   AdapterErrorKind::Permanent
    } else
    {   AdapterErrorKind::Transient
    };
    let message = if error.is_timeout()
    {   "request timed out".to_string()
    } else
    {   error.without_url().to_string()
    };
    warn!("{} transport error ({}): {}", provider, kind, message);
    AdapterError::new(kind, provider, message)
}

/// Send a prepared request and return the body of a 2xx reply
pub(crate) async fn send(
  provider: &str
, request: reqwest::RequestBuilder
) -> Result<String, AdapterError>
{   let response = request
      .send()
      .await
      .map_err(|e| classify_transport(provider, e))?;

    let status = response.status();
    trace!("{} response status: {}", provider, status);

    let body = response
      .text()
      .await
      .map_err(|e| classify_transport(provider, e))?;

    if !status.is_success()
    {   let kind = classify_status(status);
        warn!("{} returned {} ({})", provider, status, kind);
        return Err(AdapterError::new(
          kind
        , provider
        , format!("HTTP {}: {}", status, truncate(&body))
        ));
    }
    Ok(body)
}

/// Decode a reply body, mapping malformed JSON to a parse failure
pub(crate) fn decode<T>(provider: &str, body: &str)
  -> Result<T, AdapterError>
where
  T: serde::de::DeserializeOwned
{   serde_json::from_str(body).map_err(|e| {
      warn!("{} reply did not parse: {}", provider, e);
      AdapterError::parse(provider, e.to_string())
    })
}

fn truncate(body: &str) -> String
{   let body = body.trim();
    match body.char_indices().nth(ERROR_BODY_LIMIT)
    {   Some((idx, _)) => format!("{}...", &body[..idx])
      , None => body.to_string()
    }
}
