//! Outbound pipeline: outbound queue → gateway.
//!
//! States: received → classified → decided → {dead-lettered | routed →
//! throttled → sent → confirmed}. Every failure, and a blacklisted
//! destination, puts the message on the dead-letter queue exactly as it was
//! pulled. Nothing is retried here; retries belong to the gateway client.

use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use super::{Disposition, Outcome, RoutingRules, RECEIVE_BACKOFF};
use crate::bootstrap::{Shutdown, ShutdownState};
use crate::broker::{BrokerError, SharedQueue};
use crate::config::QueueConfig;
use crate::error::RouteError;
use crate::events::{RawInput, RouteEvent, SharedSink, Stage};
use crate::filter::RateLimiter;
use crate::gateway::SharedGateway;
use crate::message::{headers, Body, Message};

type StageFn = fn(&OutboundRouter, Message) -> Outcome;

/// Routes messages from the outbound queue to the gateway.
pub struct OutboundRouter {
    rules: Arc<RoutingRules>,
    limiter: Arc<RateLimiter>,
    queue: SharedQueue,
    gateway: SharedGateway,
    sink: SharedSink,
    queues: QueueConfig,
}

impl OutboundRouter {
    pub fn new(
        rules: Arc<RoutingRules>,
        limiter: Arc<RateLimiter>,
        queue: SharedQueue,
        gateway: SharedGateway,
        sink: SharedSink,
        queues: QueueConfig,
    ) -> Self {
        Self {
            rules,
            limiter,
            queue,
            gateway,
            sink,
            queues,
        }
    }

    /// Pull and route messages until shutdown starts or the queue closes.
    pub async fn run(&self, worker: usize, shutdown: Arc<Shutdown>) {
        info!(worker, queue = %self.queues.outbound, "outbound worker started");
        let mut shutdown_rx = shutdown.subscribe();

        loop {
            if shutdown.state() != ShutdownState::Running {
                break;
            }

            let received = tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow_and_update() != ShutdownState::Running {
                        debug!(worker, "outbound worker draining");
                        break;
                    }
                    continue;
                }

                received = self.queue.receive(&self.queues.outbound) => received,
            };

            match received {
                Ok(Some(message)) => {
                    let _in_flight = shutdown.track();
                    if let Err(e) = self.handle(message).await {
                        error!(worker, error = %e, "failed to publish outbound result");
                    }
                }
                Ok(None) => {
                    info!(worker, "outbound queue closed");
                    break;
                }
                Err(e) => {
                    warn!(worker, error = %e, "outbound receive failed");
                    tokio::select! {
                        biased;

                        _ = shutdown_rx.changed() => {}
                        _ = tokio::time::sleep(RECEIVE_BACKOFF) => {}
                    }
                }
            }
        }
    }

    /// Route one message end to end.
    #[instrument(skip_all)]
    pub async fn handle(&self, original: Message) -> Result<Disposition, BrokerError> {
        match self.prepare(original.clone()) {
            Outcome::Continue(message) => self.send(original, message).await,
            Outcome::DeadLetter(_) => {
                self.dead_letter(original, Stage::Decide, "destination country is blacklisted".into())
                    .await
            }
            Outcome::Fail(stage, e) => self.dead_letter(original, stage, e.to_string()).await,
            Outcome::Drop => Ok(Disposition::Dropped),
        }
    }

    /// Run the synchronous stages up to the throttle.
    pub fn prepare(&self, message: Message) -> Outcome {
        const STAGES: [StageFn; 4] = [
            OutboundRouter::strip,
            OutboundRouter::classify,
            OutboundRouter::decide,
            OutboundRouter::route,
        ];

        let mut message = message;
        for stage in STAGES {
            match stage(self, message) {
                Outcome::Continue(next) => message = next,
                other => return other,
            }
        }
        Outcome::Continue(message)
    }

    /// The message may have passed through the gateway before; drop any
    /// protocol headers it still carries.
    fn strip(&self, mut message: Message) -> Outcome {
        let removed = message.remove_headers_with_prefix(headers::GATEWAY_PREFIX);
        if removed > 0 {
            debug!(removed, "stripped residual gateway headers");
        }
        Outcome::Continue(message)
    }

    fn classify(&self, mut message: Message) -> Outcome {
        for classifier in [&self.rules.origin, &self.rules.destination] {
            match classifier.classify(&mut message) {
                Ok(c) if c.country.is_none() => self.sink.emit(RouteEvent::CountryUnresolved {
                    header: classifier.header().to_string(),
                    raw: c.raw,
                }),
                Ok(_) => {}
                Err(e) => return Outcome::Fail(Stage::Classify, e),
            }
        }
        Outcome::Continue(message)
    }

    fn decide(&self, message: Message) -> Outcome {
        let blacklist = &self.rules.blacklist;
        if !blacklist.is_blacklisted(&message) {
            return Outcome::Continue(message);
        }

        self.sink.emit(RouteEvent::Blacklisted {
            header: blacklist.header().to_string(),
            value: message
                .header_text(blacklist.header())
                .unwrap_or_default()
                .to_lowercase(),
        });
        Outcome::DeadLetter(message)
    }

    fn route(&self, mut message: Message) -> Outcome {
        if let Some(source) = self.rules.overrides.apply(&mut message) {
            let country = message
                .header_text(self.rules.destination.country_header())
                .unwrap_or_default();
            self.sink
                .emit(RouteEvent::SourceOverridden { country, source });
        }

        match self.rules.addressing.prepare_outbound(&mut message) {
            Ok(()) => Outcome::Continue(message),
            Err(e) => Outcome::Fail(Stage::Route, e),
        }
    }

    async fn send(&self, original: Message, mut message: Message) -> Result<Disposition, BrokerError> {
        self.limiter.acquire().await;

        // exactly one attempt
        let gateway_id = match self.gateway.send(&message).await {
            Ok(id) => id,
            Err(e) => {
                let e = RouteError::from(e);
                return self.dead_letter(original, Stage::Send, e.to_string()).await;
            }
        };

        let destination = message.header_text(headers::DEST_ADDR).unwrap_or_default();
        let text = format!(
            "The gateway accepted the message for {} and assigned id {}",
            destination, gateway_id
        );
        message.set_header(headers::GATEWAY_ID, gateway_id.as_str());
        message.set_body(Body::Text(text.clone()));

        self.sink.emit(RouteEvent::SendConfirmed {
            destination,
            gateway_id: gateway_id.clone(),
            text,
        });

        Ok(Disposition::Sent { gateway_id })
    }

    async fn dead_letter(
        &self,
        original: Message,
        stage: Stage,
        reason: String,
    ) -> Result<Disposition, BrokerError> {
        let input = RawInput {
            origin: original.header_text(headers::ORIGIN),
            destination: original.header_text(headers::DESTINATION),
        };

        if let Err(e) = self.queue.publish(&self.queues.dead_letter, original).await {
            self.sink.emit(RouteEvent::PublishFailed {
                stage,
                queue: self.queues.dead_letter.clone(),
                reason: format!("{}; dead-letter reason: {}", e, reason),
                input,
            });
            return Err(e);
        }

        self.sink.emit(RouteEvent::DeadLettered {
            stage,
            reason,
            input,
        });

        Ok(Disposition::DeadLettered { stage })
    }
}
