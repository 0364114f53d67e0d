//! Retry policy and primary/fallback provider ordering

use std::sync::Arc;
use std::time::Duration;
use log::{debug, warn};
use rand::Rng;

use crate::config::FailoverConfig;
use crate::providers::ProviderAdapter;

/// Retry policy for the primary provider
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy
{   pub max_attempts: u32
  , pub min_backoff: Duration
  , pub max_backoff: Duration
  , pub backoff_multiplier: f64
  , /// Fraction of the delay added or removed at random (0.0..=1.0)
    pub jitter_factor: f64
  , /// Upper bound on a single attempt
    pub attempt_timeout: Duration
}

impl RetryPolicy
{   /// Create a new retry policy
    pub fn new(
      max_attempts: u32
    , min_backoff: Duration
    , max_backoff: Duration
    ) -> Self
    {   RetryPolicy
        {   max_attempts: max_attempts.max(1)
          , min_backoff
          , max_backoff: max_backoff.max(min_backoff)
          , backoff_multiplier: 2.0
          , jitter_factor: 0.1
          , attempt_timeout: Duration::from_secs(30)
        }
    }

    /// A policy that retries without sleeping
    pub fn immediate(max_attempts: u32) -> Self
    {   RetryPolicy
        {   jitter_factor: 0.0
          , ..RetryPolicy::new(
                max_attempts
              , Duration::ZERO
              , Duration::ZERO
              )
        }
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self
    {   self.backoff_multiplier = multiplier.max(1.0);
        self
    }

    pub fn with_jitter_factor(mut self, factor: f64) -> Self
    {   self.jitter_factor = factor.clamp(0.0, 1.0);
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self
    {   self.attempt_timeout = timeout;
        self
    }

    /// Delay before the attempt following `attempt` (1-based)
    ///
    /// Always lands in `[min_backoff, max_backoff]`; an inverted window
    /// collapses to `min_backoff`.
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration
    {   let floor = self.min_backoff.as_secs_f64();
        let ceiling = self.max_backoff.as_secs_f64().max(floor);
        let exponent = attempt.saturating_sub(1).min(63) as i32;
        let base = self.min_backoff.as_secs_f64()
          * self.backoff_multiplier.powi(exponent);
        let capped = base.min(ceiling);
        let jitter = if self.jitter_factor.is_finite()
        {   self.jitter_factor.clamp(0.0, 1.0)
        } else
        {   0.0
        };
        let jittered = if jitter > 0.0 && capped > 0.0
        {   let spread = capped * jitter;
            capped + rand::thread_rng().gen_range(-spread..=spread)
        } else
        {   capped
        };
        let delay = Duration::try_from_secs_f64(jittered.clamp(floor, ceiling))
          .unwrap_or(self.max_backoff.max(self.min_backoff));
        debug!("Backoff after attempt {}: {:?}", attempt, delay);
        delay
    }
}

impl Default for RetryPolicy
{   fn default() -> Self
    {   RetryPolicy::new(
          5
        , Duration::from_secs(1)
        , Duration::from_secs(60)
        )
    }
}

impl From<&FailoverConfig> for RetryPolicy
{   fn from(config: &FailoverConfig) -> Self
    {   RetryPolicy::new(
          config.max_attempts
        , Duration::from_millis(config.min_backoff_ms)
        , Duration::from_millis(config.max_backoff_ms)
        )
        .with_backoff_multiplier(config.backoff_multiplier)
        .with_jitter_factor(config.jitter_factor)
        .with_attempt_timeout(
          Duration::from_secs(config.attempt_timeout_secs)
        )
    }
}

/// One provider slot in a [`ProviderSpec`]
#[derive(Clone)]
pub struct ProviderEntry
{   pub adapter: Arc<dyn ProviderAdapter>
  , pub policy: RetryPolicy
}

impl ProviderEntry
{   pub fn new(
      adapter: Arc<dyn ProviderAdapter>
    , policy: RetryPolicy
    ) -> Self
    {   ProviderEntry
        {   adapter
          , policy
        }
    }

    /// Name and model, for logs
    pub fn label(&self) -> String
    {   format!("{}/{}", self.adapter.provider(), self.adapter.model())
    }
}

impl std::fmt::Debug for ProviderEntry
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>)
      -> std::fmt::Result
    {   f.debug_struct("ProviderEntry")
          .field("provider", &self.label())
          .field("policy", &self.policy)
          .finish()
    }
}

/// Primary provider with its retry budget, plus an optional fallback
///
/// The fallback is tried exactly once after the primary is exhausted,
/// whatever its own policy says.
#[derive(Debug, Clone)]
pub struct ProviderSpec
{   primary: ProviderEntry
  , fallback: Option<ProviderEntry>
}

impl ProviderSpec
{   pub fn new(primary: ProviderEntry) -> Self
    {   debug!("Creating provider spec, primary {}", primary.label());
        ProviderSpec
        {   primary
          , fallback: None
        }
    }

    pub fn with_fallback(mut self, fallback: ProviderEntry) -> Self
    {   debug!("Adding fallback provider {}", fallback.label());
        if fallback.policy.max_attempts > 1
        {   warn!(
              "Fallback {} configured for {} attempts; it runs once",
              fallback.label(),
              fallback.policy.max_attempts
            );
        }
        self.fallback = Some(fallback);
        self
    }

    /// Build from an ordered list: first is primary, second is fallback
    pub fn from_entries(entries: Vec<ProviderEntry>) -> Option<Self>
    {   let mut entries = entries.into_iter();
        let mut spec = ProviderSpec::new(entries.next()?);
        if let Some(fallback) = entries.next()
        {   spec = spec.with_fallback(fallback);
        }
        for ignored in entries
        {   warn!("Ignoring extra provider {}", ignored.label());
        }
        Some(spec)
    }

    pub fn primary(&self) -> &ProviderEntry
    {   &self.primary
    }

    pub fn fallback(&self) -> Option<&ProviderEntry>
    {   self.fallback.as_ref()
    }
}
