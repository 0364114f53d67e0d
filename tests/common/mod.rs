#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use assistgate::error::{AdapterError, AdapterErrorKind};
use assistgate::failover::{ProviderEntry, ProviderSpec, RetryPolicy};
use assistgate::providers::ProviderAdapter;
use assistgate::{Gateway, GenerationRequest, GenerationResponse, Parameters};

/// What a stub call should do
#[derive(Debug, Clone)]
pub enum Outcome
{   Reply(String)
  , Fail(AdapterErrorKind)
}

/// Scripted adapter that counts and records its calls
pub struct StubAdapter
{   name: String
  , model: String
  , script: Mutex<VecDeque<Outcome>>
  , otherwise: Outcome
  , delay: Option<Duration>
  , calls: AtomicUsize
  , requests: Mutex<Vec<GenerationRequest>>
}

impl StubAdapter
{   pub fn new(name: &str, model: &str) -> Self
    {   StubAdapter
        {   name: name.to_string()
          , model: model.to_string()
          , script: Mutex::new(VecDeque::new())
          , otherwise: Outcome::Reply(format!("reply from {}", name))
          , delay: None
          , calls: AtomicUsize::new(0)
          , requests: Mutex::new(Vec::new())
        }
    }

    /// Always reply with `text`
    pub fn replying(name: &str, model: &str, text: &str) -> Arc<Self>
    {   Arc::new(
          Self::new(name, model).otherwise(Outcome::Reply(text.to_string()))
        )
    }

    /// Always fail with `kind`
    pub fn failing(name: &str, model: &str, kind: AdapterErrorKind)
      -> Arc<Self>
    {   Arc::new(Self::new(name, model).otherwise(Outcome::Fail(kind)))
    }

    /// Queue an outcome for the next unscripted call
    pub fn then(self, outcome: Outcome) -> Self
    {   self.script.lock().unwrap().push_back(outcome);
        self
    }

    /// Outcome once the script is used up
    pub fn otherwise(mut self, outcome: Outcome) -> Self
    {   self.otherwise = outcome;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self
    {   self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize
    {   self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<GenerationRequest>
    {   self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ProviderAdapter for StubAdapter
{   fn provider(&self) -> &str
    {   &self.name
    }

    fn model(&self) -> &str
    {   &self.model
    }

    async fn generate(
      &self
    , request: &GenerationRequest
    ) -> Result<GenerationResponse, AdapterError>
    {   self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay
        {   tokio::time::sleep(delay).await;
        }
        let outcome = self.script
          .lock()
          .unwrap()
          .pop_front()
          .unwrap_or_else(|| self.otherwise.clone());
        match outcome
        {   Outcome::Reply(text) => {
              Ok(GenerationResponse::new(Some(text), &self.model, None))
            }
          , Outcome::Fail(kind) => Err(AdapterError::new(
              kind
            , &self.name
            , format!("scripted {} failure", kind)
            ))
        }
    }
}

/// Gateway over stubs, retrying immediately up to `attempts` times
pub fn gateway(
  primary: &Arc<StubAdapter>
, fallback: Option<&Arc<StubAdapter>>
, attempts: u32
) -> Arc<Gateway>
{   gateway_with_policy(primary, fallback, RetryPolicy::immediate(attempts))
}

pub fn gateway_with_policy(
  primary: &Arc<StubAdapter>
, fallback: Option<&Arc<StubAdapter>>
, policy: RetryPolicy
) -> Arc<Gateway>
{   let primary: Arc<dyn ProviderAdapter> = primary.clone();
    let mut spec = ProviderSpec::new(
      ProviderEntry::new(primary, policy.clone())
    );
    if let Some(fallback) = fallback
    {   let fallback: Arc<dyn ProviderAdapter> = fallback.clone();
        spec = spec.with_fallback(ProviderEntry::new(
          fallback
        , RetryPolicy { max_attempts: 1, ..policy }
        ));
    }
    Arc::new(Gateway::new(spec))
}

/// Parameters from a JSON object literal
pub fn params(value: serde_json::Value) -> Parameters
{   match value
    {   serde_json::Value::Object(map) => map
      , _ => Parameters::new()
    }
}
