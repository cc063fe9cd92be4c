use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::Shutdown;
use crate::broker::SharedQueue;
use crate::config::Config;
use crate::events::SharedSink;
use crate::filter::{RateLimitConfig, RateLimiter};
use crate::gateway::{BindParams, SharedGateway};
use crate::pipeline::{self, InboundRouter, OutboundRouter, PipelineHandles, RoutingRules};

/// Wires configuration, collaborators and workers together.
pub struct Server {
    config: Config,
    outbound: Arc<OutboundRouter>,
    inbound: Arc<InboundRouter>,
    shutdown: Arc<Shutdown>,
}

impl Server {
    /// Build every routing component. Fails on invalid routing
    /// configuration.
    pub fn new(
        config: Config,
        queue: SharedQueue,
        gateway: SharedGateway,
        sink: SharedSink,
    ) -> Result<Self> {
        let rules = Arc::new(
            RoutingRules::from_config(&config.router).context("invalid routing configuration")?,
        );

        let throttle = config.router.throttle;
        info!(
            max_per_period = throttle.max_per_period,
            period_ms = throttle.period.as_millis() as u64,
            "throttling outbound sends"
        );
        let limiter = Arc::new(RateLimiter::new(RateLimitConfig::new(
            throttle.max_per_period,
            throttle.period,
        )));

        info!(
            producer = ?BindParams::producer(&config.gateway),
            consumer = ?BindParams::consumer(&config.gateway),
            gateway = gateway.name(),
            broker = queue.name(),
            "gateway bind parameters"
        );

        let outbound = Arc::new(OutboundRouter::new(
            rules.clone(),
            limiter,
            queue.clone(),
            gateway.clone(),
            sink.clone(),
            config.queues.clone(),
        ));
        let inbound = Arc::new(InboundRouter::new(
            rules.addressing.clone(),
            queue,
            gateway,
            sink,
            &config.queues.inbound,
        ));

        Ok(Self {
            config,
            outbound,
            inbound,
            shutdown: Shutdown::new(),
        })
    }

    pub fn shutdown(&self) -> Arc<Shutdown> {
        self.shutdown.clone()
    }

    /// Run until Ctrl-C.
    pub async fn run(self) -> Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for shutdown signal");
            }
        })
        .await
    }

    /// Run until `signal` completes, then drain.
    pub async fn run_until<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let handles = pipeline::start(
            self.outbound.clone(),
            self.inbound.clone(),
            self.config.router.outbound_workers,
            self.shutdown.clone(),
        );

        info!(
            outbound = %self.config.queues.outbound,
            dead_letter = %self.config.queues.dead_letter,
            inbound = %self.config.queues.inbound,
            "smsrouter running"
        );

        signal.await;
        self.drain(handles).await;
        Ok(())
    }

    async fn drain(&self, handles: PipelineHandles) {
        self.shutdown.start_drain();

        let timeout = self.config.shutdown.drain_timeout;
        let drained = tokio::time::timeout(timeout, async {
            self.shutdown.wait_idle().await;
            handles.join().await;
        })
        .await;

        if drained.is_err() {
            warn!(
                timeout_secs = timeout.as_secs(),
                in_flight = self.shutdown.in_flight(),
                "drain timeout exceeded"
            );
        }

        self.shutdown.terminate();
    }
}
