//! Process-wide context built once at startup

use std::sync::Arc;
use std::time::Duration;
use log::{debug, info};

use crate::config::AppConfig;
use crate::error::ConfigError;
use crate::failover::{ProviderEntry, ProviderSpec, RetryPolicy};
use crate::features::DirectorySource;
use crate::gateway::Gateway;
use crate::providers::build_adapter;
use crate::router::ServiceRouter;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Owns the configuration and the gateway built over the shared HTTP
/// client
///
/// Everything in it is read-only after construction; clone it or wrap
/// it in an `Arc` to share between tasks.
#[derive(Debug, Clone)]
pub struct AssistantContext
{   config: AppConfig
  , gateway: Arc<Gateway>
}

impl AssistantContext
{   /// Build adapters, spec and gateway from configuration
    pub fn from_config(config: AppConfig) -> Result<Self, ConfigError>
    {   config.validate()?;
        debug!("Building assistant context");

        let http_client = reqwest::Client::builder()
          .connect_timeout(CONNECT_TIMEOUT)
          .build()?;

        let base_policy = RetryPolicy::from(&config.failover);
        let configured = if config.failover.enabled
        {   config.providers.len()
        } else
        {   1
        };

        let mut entries = Vec::with_capacity(configured);
        for (slot, provider) in config.providers
          .iter()
          .take(configured)
          .enumerate()
        {   let adapter = build_adapter(provider, http_client.clone())?;
            let mut policy = base_policy.clone();
            policy.max_attempts = match (slot, provider.max_attempts)
            {   (0, Some(max_attempts)) => max_attempts.max(1)
              , (0, None) => base_policy.max_attempts
              // the fallback is only ever tried once
              , _ => 1
            };
            entries.push(ProviderEntry::new(adapter, policy));
        }

        let spec = ProviderSpec::from_entries(entries).ok_or_else(|| {
          ConfigError::Invalid("at least one provider is required".into())
        })?;
        info!(
          "Gateway ready: primary {}, fallback {}",
          spec.primary().label(),
          spec.fallback()
            .map(|f| f.label())
            .unwrap_or_else(|| "none".to_string())
        );

        Ok(AssistantContext
        {   config
          , gateway: Arc::new(Gateway::new(spec))
        })
    }

    /// Build from environment variables
    pub fn from_env() -> Result<Self, ConfigError>
    {   Self::from_config(AppConfig::from_env()?)
    }

    pub fn config(&self) -> &AppConfig
    {   &self.config
    }

    pub fn gateway(&self) -> Arc<Gateway>
    {   Arc::clone(&self.gateway)
    }

    /// Router over every feature, reading named sources from the
    /// configured data directory
    pub fn router(&self) -> ServiceRouter
    {   let source = Arc::new(
          DirectorySource::new(self.config.data_dir.clone())
        );
        ServiceRouter::standard(self.gateway(), source)
    }
}
