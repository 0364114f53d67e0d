//! Generation gateway: retry with backoff on the primary provider,
//! then one attempt on the fallback.

use log::{debug, error, info, warn};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{AdapterError, GatewayError};
use crate::failover::{ProviderEntry, ProviderSpec};
use crate::request::{GenerationRequest, GenerationResponse};

/// Outcome of a single adapter call
enum Attempt
{   Success(GenerationResponse)
  , Failed(AdapterError)
  , Cancelled
}

/// Outcome of the primary provider's whole retry budget
enum PrimaryFailure
{   Exhausted
    {   error: AdapterError
      , attempts: u32
    }
  , Cancelled
}

/// Executes generation requests against a [`ProviderSpec`]
///
/// Holds no mutable state, so one instance can serve any number of
/// concurrent requests.
#[derive(Debug, Clone)]
pub struct Gateway
{   spec: ProviderSpec
}

impl Gateway
{   pub fn new(spec: ProviderSpec) -> Self
    {   debug!("Creating Gateway with primary {}", spec.primary().label());
        Gateway
        {   spec
        }
    }

    pub fn spec(&self) -> &ProviderSpec
    {   &self.spec
    }

    /// Generate a response, failing only when every provider failed
    pub async fn generate(
      &self
    , request: GenerationRequest
    ) -> Result<GenerationResponse, GatewayError>
    {   self.generate_with_cancel(request, &CancellationToken::new())
          .await
    }

    /// Like [`Gateway::generate`], abandoned once `deadline` passes
    pub async fn generate_before(
      &self
    , request: GenerationRequest
    , deadline: Instant
    ) -> Result<GenerationResponse, GatewayError>
    {   tokio::select!
        {   biased;
            result = self.generate(request) => result
          , _ = tokio::time::sleep_until(deadline) => {
              warn!("Generation deadline exceeded");
              Err(GatewayError::DeadlineExceeded)
            }
        }
    }

    /// Like [`Gateway::generate`], aborted when `cancel` fires
    ///
    /// Cancellation wins over the retry budget: an in-flight attempt is
    /// dropped and neither a retry nor the fallback is started.
    pub async fn generate_with_cancel(
      &self
    , request: GenerationRequest
    , cancel: &CancellationToken
    ) -> Result<GenerationResponse, GatewayError>
    {   if request.prompt.trim().is_empty()
        {   return Err(GatewayError::InvalidRequest(
              "prompt is empty".to_string()
            ));
        }
        if cancel.is_cancelled()
        {   return Err(GatewayError::Cancelled);
        }

        let primary = self.spec.primary();
        let (primary_error, primary_attempts)
          = match self.run_primary(primary, &request, cancel).await
        {   Ok(response) => return Ok(response)
          , Err(PrimaryFailure::Cancelled) => {
              info!("Generation cancelled during primary attempts");
              return Err(GatewayError::Cancelled);
            }
          , Err(PrimaryFailure::Exhausted { error, attempts }) => {
              (error, attempts)
            }
        };

        let fallback = match self.spec.fallback()
        {   Some(fallback) => fallback
          , None => {
              error!(
                "Primary {} failed and no fallback is configured",
                primary.label()
              );
              return Err(GatewayError::Exhausted
              {   primary: primary_error
                , primary_attempts
                , fallback: None
              });
            }
        };

        info!(
          "Primary {} gave up after {} attempt(s); trying fallback {}",
          primary.label(),
          primary_attempts,
          fallback.label()
        );
        match self.attempt(fallback, &request, cancel).await
        {   Attempt::Success(response) => {
              info!("Fallback {} answered", fallback.label());
              Ok(response)
            }
          , Attempt::Cancelled => {
              info!("Generation cancelled during fallback attempt");
              Err(GatewayError::Cancelled)
            }
          , Attempt::Failed(fallback_error) => {
              error!(
                "Fallback {} failed: {}",
                fallback.label(),
                fallback_error
              );
              Err(GatewayError::Exhausted
              {   primary: primary_error
                , primary_attempts
                , fallback: Some(fallback_error)
              })
            }
        }
    }

    /// Run the primary's retry loop; attempts are strictly sequential
    async fn run_primary(
      &self
    , entry: &ProviderEntry
    , request: &GenerationRequest
    , cancel: &CancellationToken
    ) -> Result<GenerationResponse, PrimaryFailure>
    {   let policy = &entry.policy;
        let mut attempt: u32 = 1;
        loop
        {   debug!(
              "Attempt {}/{} via {}",
              attempt,
              policy.max_attempts,
              entry.label()
            );
            let failure = match self.attempt(entry, request, cancel).await
            {   Attempt::Success(response) => {
                  if attempt > 1
                  {   info!(
                        "{} succeeded on attempt {}",
                        entry.label(),
                        attempt
                      );
                  }
                  return Ok(response);
                }
              , Attempt::Cancelled => return Err(PrimaryFailure::Cancelled)
              , Attempt::Failed(failure) => failure
            };

            if !failure.is_retryable()
            {   warn!(
                  "{} failed with {} error, not retrying: {}",
                  entry.label(),
                  failure.kind,
                  failure.message
                );
                return Err(PrimaryFailure::Exhausted
                {   error: failure
                  , attempts: attempt
                });
            }
            if attempt >= policy.max_attempts
            {   warn!(
                  "{} exhausted {} attempt(s): {}",
                  entry.label(),
                  attempt,
                  failure
                );
                return Err(PrimaryFailure::Exhausted
                {   error: failure
                  , attempts: attempt
                });
            }

            let delay = policy.backoff_for_attempt(attempt);
            warn!(
              "{} attempt {} failed ({}); retrying in {:?}",
              entry.label(),
              attempt,
              failure,
              delay
            );
            tokio::select!
            {   biased;
                _ = cancel.cancelled() => {
                  return Err(PrimaryFailure::Cancelled);
                }
              , _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }

    /// One adapter call bounded by the attempt timeout
    async fn attempt(
      &self
    , entry: &ProviderEntry
    , request: &GenerationRequest
    , cancel: &CancellationToken
    ) -> Attempt
    {   let timeout = entry.policy.attempt_timeout;
        tokio::select!
        {   biased;
            _ = cancel.cancelled() => Attempt::Cancelled
          , outcome = tokio::time::timeout(
              timeout
            , entry.adapter.generate(request)
            ) => match outcome
            {   Ok(Ok(response)) => Attempt::Success(response)
              , Ok(Err(failure)) => Attempt::Failed(failure)
              , Err(_) => Attempt::Failed(AdapterError::transient(
                  entry.adapter.provider()
                , format!("attempt timed out after {:?}", timeout)
                ))
            }
        }
    }
}
