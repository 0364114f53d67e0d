//! Feature processors
//!
//! A processor validates caller input, builds the system instruction and
//! prompt, calls the gateway once, and shapes the reply into a
//! [`FeatureResult`]. Processing never fails: validation problems,
//! gateway failures and cancellation all come back as a result carrying
//! a readable message plus a machine-readable `error` key.

pub mod chat;
pub mod code;
pub mod email;
pub mod source;
pub mod summarize;
pub mod translate;

use std::time::Instant;
use async_trait::async_trait;
use log::{debug, error, warn};
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::gateway::Gateway;
use crate::request::{GenerationRequest, GenerationResponse};

pub use chat::ChatProcessor;
pub use code::CodeHelpProcessor;
pub use email::EmailDraftProcessor;
pub use source::{DirectorySource, TextSource};
pub use summarize::SummarizeProcessor;
pub use translate::TranslateProcessor;

/// Caller-supplied parameters; unrecognized keys are ignored
pub type Parameters = serde_json::Map<String, Value>;

/// Structured metadata attached to a result
pub type Metadata = serde_json::Map<String, Value>;

/// Metadata key carrying a machine-readable failure description
pub const ERROR_KEY: &str = "error";

/// What a feature hands back to its caller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureResult
{   /// Human-readable text, also in error cases
    pub content: String
  , pub metadata: Metadata
}

impl FeatureResult
{   pub fn success(content: impl Into<String>, metadata: Metadata) -> Self
    {   FeatureResult
        {   content: content.into()
          , metadata
        }
    }

    /// A failure whose `content` explains the problem to the user
    pub fn failure(
      content: impl Into<String>
    , error: impl Into<String>
    ) -> Self
    {   let mut metadata = Metadata::new();
        metadata.insert(ERROR_KEY.to_string(), Value::String(error.into()));
        FeatureResult
        {   content: content.into()
          , metadata
        }
    }

    pub fn error(&self) -> Option<&str>
    {   self.metadata.get(ERROR_KEY).and_then(Value::as_str)
    }

    pub fn is_error(&self) -> bool
    {   self.metadata.contains_key(ERROR_KEY)
    }
}

/// One capability behind the router
#[async_trait]
pub trait FeatureProcessor: Send + Sync
{   /// Name the router registers this processor under
    fn name(&self) -> &'static str;

    /// Process `content`, giving up on the gateway once `cancel` fires
    async fn process_with_cancel(
      &self
    , content: &str
    , parameters: &Parameters
    , cancel: &CancellationToken
    ) -> FeatureResult;

    async fn process(
      &self
    , content: &str
    , parameters: &Parameters
    ) -> FeatureResult
    {   self.process_with_cancel(content, parameters, &CancellationToken::new())
          .await
    }
}

// ===== Parameter helpers =====

/// Non-blank string parameter, trimmed
pub(crate) fn param_str<'a>(
  parameters: &'a Parameters
, key: &str
) -> Option<&'a str>
{   parameters.get(key)
      .and_then(Value::as_str)
      .map(str::trim)
      .filter(|s| !s.is_empty())
}

/// Numeric parameter; numeric strings are accepted
pub(crate) fn param_f64(parameters: &Parameters, key: &str) -> Option<f64>
{   match parameters.get(key)?
    {   Value::Number(n) => n.as_f64()
      , Value::String(s) => s.trim().parse().ok()
      , _ => None
    }
}

pub(crate) fn param_u64(parameters: &Parameters, key: &str) -> Option<u64>
{   param_f64(parameters, key)
      .filter(|n| n.is_finite() && *n >= 0.0)
      .map(|n| n as u64)
}

/// Boolean parameter; "true"/"false" strings are accepted
pub(crate) fn param_bool(parameters: &Parameters, key: &str) -> Option<bool>
{   match parameters.get(key)?
    {   Value::Bool(b) => Some(*b)
      , Value::String(s) => s.trim().parse().ok()
      , _ => None
    }
}

// ===== Gateway boundary =====

/// User-facing texts for the two ways a generation can go wrong
pub(crate) struct Apology
{   /// The gateway failed outright
    pub failed: &'static str
  , /// The gateway answered with nothing useful
    pub empty: &'static str
}

/// A successful generation and how long it took
pub(crate) struct Generated
{   pub response: GenerationResponse
  , pub elapsed_ms: u64
}

impl Generated
{   /// Model, usage and timing, the metadata every feature reports
    pub fn metadata(&self) -> Metadata
    {   let mut metadata = Metadata::new();
        metadata.insert(
          "model".to_string()
        , Value::String(self.response.model_used.clone())
        );
        if let Some(usage) = &self.response.usage
        {   if let Ok(value) = serde_json::to_value(usage)
            {   metadata.insert("usage".to_string(), value);
            }
        }
        metadata.insert(
          "elapsed_ms".to_string()
        , Value::from(self.elapsed_ms)
        );
        metadata
    }
}

/// Call the gateway once and turn its typed failures into a result
///
/// This is the only place gateway errors become user-facing text.
pub(crate) async fn generate(
  feature: &str
, gateway: &Gateway
, request: GenerationRequest
, apology: &Apology
, cancel: &CancellationToken
) -> Result<Generated, FeatureResult>
{   debug!("{}: calling gateway", feature);
    let started = Instant::now();
    let outcome = gateway.generate_with_cancel(request, cancel).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match outcome
    {   Ok(response) if response.has_content() => {
          debug!("{}: generated in {}ms", feature, elapsed_ms);
          Ok(Generated
          {   response
            , elapsed_ms
          })
        }
      , Ok(response) => {
          warn!(
            "{}: {} returned no usable content",
            feature,
            response.model_used
          );
          Err(FeatureResult::failure(apology.empty, "Empty LLM response"))
        }
      , Err(e) => {
          error!("{}: generation failed: {}", feature, e);
          Err(FeatureResult::failure(apology.failed, e.to_string()))
        }
    }
}
