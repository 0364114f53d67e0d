//! Feature name to processor dispatch

use std::collections::HashMap;
use std::sync::Arc;
use log::{debug, error, info};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::RouterError;
use crate::features::{
  ChatProcessor
, CodeHelpProcessor
, EmailDraftProcessor
, FeatureProcessor
, FeatureResult
, Metadata
, Parameters
, SummarizeProcessor
, TextSource
, TranslateProcessor
, ERROR_KEY
};
use crate::gateway::Gateway;

const EMPTY_CONTENT: &str = "No response was produced. Please try again.";

/// Extra names accepted for registered features
const ALIASES: &[(&str, &str)] = &[
  ("code_help", "code")
, ("email_draft", "email")
];

/// Maps feature names to processors and normalizes what they return
#[derive(Clone, Default)]
pub struct ServiceRouter
{   processors: HashMap<&'static str, Arc<dyn FeatureProcessor>>
}

impl ServiceRouter
{   pub fn new() -> Self
    {   ServiceRouter::default()
    }

    /// Router with chat, summarize, translate, code and email registered
    pub fn standard(
      gateway: Arc<Gateway>
    , source: Arc<dyn TextSource>
    ) -> Self
    {   ServiceRouter::new()
          .register(Arc::new(ChatProcessor::new(Arc::clone(&gateway))))
          .register(Arc::new(SummarizeProcessor::new(
            Arc::clone(&gateway)
          , source
          )))
          .register(Arc::new(TranslateProcessor::new(Arc::clone(&gateway))))
          .register(Arc::new(CodeHelpProcessor::new(Arc::clone(&gateway))))
          .register(Arc::new(EmailDraftProcessor::new(gateway)))
    }

    /// Register a processor under its own name, replacing any previous one
    pub fn register(mut self, processor: Arc<dyn FeatureProcessor>) -> Self
    {   debug!("Registering feature {}", processor.name());
        self.processors.insert(processor.name(), processor);
        self
    }

    /// Registered feature names, sorted
    pub fn features(&self) -> Vec<&'static str>
    {   let mut names: Vec<_> = self.processors.keys().copied().collect();
        names.sort_unstable();
        names
    }

    fn lookup(&self, feature: &str) -> Option<&Arc<dyn FeatureProcessor>>
    {   let name = feature.trim().to_ascii_lowercase();
        let name = ALIASES
          .iter()
          .find(|(alias, _)| *alias == name)
          .map(|(_, target)| *target)
          .unwrap_or(name.as_str());
        self.processors.get(name)
    }

    /// Run `feature` on `content`
    ///
    /// An unknown feature is an `Err`; everything the processor has to
    /// say, failures included, comes back as `Ok`.
    pub async fn dispatch(
      &self
    , feature: &str
    , content: &str
    , parameters: &Parameters
    ) -> Result<FeatureResult, RouterError>
    {   self.dispatch_with_cancel(
          feature
        , content
        , parameters
        , &CancellationToken::new()
        ).await
    }

    /// Like [`dispatch`](Self::dispatch), but a cancelled `cancel` stops
    /// the gateway call and comes back as an error result
    pub async fn dispatch_with_cancel(
      &self
    , feature: &str
    , content: &str
    , parameters: &Parameters
    , cancel: &CancellationToken
    ) -> Result<FeatureResult, RouterError>
    {   let processor = self.lookup(feature).ok_or_else(|| {
          error!("No processor registered for {:?}", feature);
          RouterError::UnknownFeature(feature.to_string())
        })?;
        info!("Dispatching {} ({} chars)", processor.name(), content.len());
        let result = processor
          .process_with_cancel(content, parameters, cancel)
          .await;
        Ok(conform(processor.name(), result))
    }
}

impl std::fmt::Debug for ServiceRouter
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {   f.debug_struct("ServiceRouter")
          .field("features", &self.features())
          .finish()
    }
}

/// Force a processor's output into the shape callers rely on
fn conform(feature: &str, result: FeatureResult) -> FeatureResult
{   let FeatureResult { content, metadata } = result;
    let content = if content.trim().is_empty()
    {   EMPTY_CONTENT.to_string()
    } else
    {   content
    };

    if let Some(error) = metadata.get(ERROR_KEY)
    {   debug!("{} returned an error result", feature);
        let error = match error
        {   Value::String(text) => Value::String(text.clone())
          , other => Value::String(other.to_string())
        };
        let mut only_error = Metadata::new();
        only_error.insert(ERROR_KEY.to_string(), error);
        return FeatureResult
        {   content
          , metadata: only_error
        };
    }

    let mut metadata: Metadata = metadata
      .into_iter()
      .filter(|(_, value)| !value.is_null())
      .collect();
    metadata.insert("feature".to_string(), Value::from(feature));
    FeatureResult
    {   content
      , metadata
    }
}
