use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use super::types::Config;
use crate::filter::SourceOverrideResolver;
use crate::message::headers;
use crate::number::Region;

impl Config {
    /// Load configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        debug!(path = %path.display(), "loading configuration");

        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        Self::from_yaml(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config =
            serde_yaml::from_str(yaml).context("failed to parse YAML configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let router = &self.router;

        Region::parse(&router.local_country).context("invalid local_country")?;
        Region::parse(&router.smsc_country).context("invalid smsc_country")?;

        SourceOverrideResolver::new(
            &router.source_overrides,
            &headers::country(headers::DESTINATION),
            &headers::e164(headers::ORIGIN),
        )
        .context("invalid source_overrides")?;

        if router.throttle.max_per_period == 0 {
            anyhow::bail!("throttle.max_per_period must be at least 1");
        }

        if router.throttle.period.is_zero() {
            anyhow::bail!("throttle.period must be greater than zero");
        }

        if router.outbound_workers == 0 {
            anyhow::bail!("outbound_workers must be at least 1");
        }

        let queues = [
            &self.queues.outbound,
            &self.queues.dead_letter,
            &self.queues.inbound,
        ];
        let mut names = HashSet::new();
        for name in queues {
            if name.trim().is_empty() {
                anyhow::bail!("queue names must not be empty");
            }
            if !names.insert(name) {
                anyhow::bail!("duplicate queue name: {}", name);
            }
        }

        info!("configuration validated successfully");
        Ok(())
    }
}
