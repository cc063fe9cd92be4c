//! Message routing pipelines.
//!
//! ```text
//!  outbound queue                                          gateway
//!  ──────────────                                          ───────
//!        │ receive                                             │
//!        ▼                                                     │
//!   ┌─────────┐  ┌──────────┐  ┌────────┐  ┌───────┐  ┌──────────┐
//!   │  strip  ├─>│ classify ├─>│ decide ├─>│ route ├─>│ throttle ├─> send ─> confirm
//!   └─────────┘  └────┬─────┘  └───┬────┘  └───┬───┘  └──────────┘     │
//!                     │ fail       │ blacklist  │ fail            fail │
//!                     ▼            ▼            ▼                      ▼
//!                            dead-letter queue (original message)
//!
//!  gateway ─> receive ─> dispatch on SmppMessageType
//!                          ├─ DeliveryReceipt ─> record
//!                          ├─ DeliverSm ───────> translate ─> strip ─> inbound queue
//!                          └─ other ───────────> warn, drop
//! ```
//!
//! Each synchronous stage returns an [`Outcome`]. The routers compose the
//! stages and own the side effects: throttling, gateway send and queue
//! publishes. There is no retry at this layer.

mod inbound;
mod outbound;

pub use inbound::InboundRouter;
pub use outbound::OutboundRouter;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use crate::bootstrap::Shutdown;
use crate::config::RouterConfig;
use crate::error::{ConfigError, RouteError};
use crate::events::Stage;
use crate::filter::{BlacklistFilter, SourceOverrideResolver};
use crate::message::{headers, Message};
use crate::number::{AddressFormatTranslator, PhoneNumberClassifier, Region};

/// Pause before polling again after a broker error.
const RECEIVE_BACKOFF: Duration = Duration::from_secs(1);

/// Result of one pipeline stage.
#[derive(Debug)]
pub enum Outcome {
    /// Hand the message to the next stage.
    Continue(Message),
    /// Route to the dead-letter queue; not a failure.
    DeadLetter(Message),
    /// Discard; a diagnostic has already been recorded.
    Drop,
    /// Abort the run.
    Fail(Stage, RouteError),
}

/// What finally happened to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Accepted by the gateway.
    Sent { gateway_id: String },
    /// Published to the dead-letter queue.
    DeadLettered { stage: Stage },
    /// Published to the inbound queue.
    Published,
    /// Delivery receipt recorded.
    Recorded,
    /// Discarded with a warning.
    Dropped,
}

/// Immutable routing components shared by all workers.
#[derive(Debug, Clone)]
pub struct RoutingRules {
    pub origin: PhoneNumberClassifier,
    pub destination: PhoneNumberClassifier,
    pub blacklist: BlacklistFilter,
    pub overrides: SourceOverrideResolver,
    pub addressing: AddressFormatTranslator,
}

impl RoutingRules {
    pub fn from_config(config: &RouterConfig) -> Result<Self, ConfigError> {
        let local = Region::parse(&config.local_country)?;
        let smsc = Region::parse(&config.smsc_country)?;

        info!(region = %local, "parsing locally supplied numbers");
        info!(region = %smsc, "parsing SMSC supplied numbers");

        let origin = PhoneNumberClassifier::new(headers::ORIGIN, local);
        let destination = PhoneNumberClassifier::new(headers::DESTINATION, local);
        let blacklist =
            BlacklistFilter::new(&config.blacklist_countries, destination.country_header());
        let overrides = SourceOverrideResolver::new(
            &config.source_overrides,
            destination.country_header(),
            origin.e164_header(),
        )?;
        let addressing =
            AddressFormatTranslator::new(smsc, origin.e164_header(), destination.e164_header());

        Ok(Self {
            origin,
            destination,
            blacklist,
            overrides,
            addressing,
        })
    }
}

/// Handles for the running workers.
pub struct PipelineHandles {
    pub inbound: JoinHandle<()>,
    pub outbound: Vec<JoinHandle<()>>,
}

impl PipelineHandles {
    /// Wait for every worker to exit.
    pub async fn join(self) {
        let _ = self.inbound.await;
        for handle in self.outbound {
            let _ = handle.await;
        }
    }
}

/// Start one inbound worker and `outbound_workers` outbound workers.
pub fn start(
    outbound: Arc<OutboundRouter>,
    inbound: Arc<InboundRouter>,
    outbound_workers: usize,
    shutdown: Arc<Shutdown>,
) -> PipelineHandles {
    info!(outbound_workers, "starting routing pipelines");

    let inbound_handle = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            inbound.run(shutdown).await;
            info!("inbound worker stopped");
        })
    };

    let outbound_handles = (0..outbound_workers.max(1))
        .map(|worker| {
            let router = outbound.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                router.run(worker, shutdown).await;
                info!(worker, "outbound worker stopped");
            })
        })
        .collect();

    PipelineHandles {
        inbound: inbound_handle,
        outbound: outbound_handles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_from_default_config() {
        let rules = RoutingRules::from_config(&RouterConfig::default()).unwrap();

        assert_eq!(rules.origin.e164_header(), "SMSOriginE164");
        assert_eq!(rules.destination.country_header(), "SMSDestinationCountryISO2");
        assert_eq!(rules.blacklist.header(), "SMSDestinationCountryISO2");
        assert_eq!(rules.blacklist.len(), 7);
        assert_eq!(rules.overrides.lookup("CA"), Some("+16461234567"));
        assert_eq!(rules.addressing.smsc_region().to_string(), "GB");
    }

    #[test]
    fn test_rules_reject_bad_overrides() {
        let config = RouterConfig {
            source_overrides: "US".to_string(),
            ..RouterConfig::default()
        };
        assert_eq!(
            RoutingRules::from_config(&config).unwrap_err(),
            ConfigError::MissingColon("US".to_string())
        );
    }
}
