//! Inbound pipeline: gateway → inbound queue.
//!
//! A single sequential worker: each event is fully handled before the next
//! one is pulled, so gateway ordering is preserved on the inbound queue.

use std::sync::Arc;

use tracing::{debug, error, info, instrument};

use super::{Disposition, Outcome};
use crate::bootstrap::{Shutdown, ShutdownState};
use crate::broker::{BrokerError, SharedQueue};
use crate::events::{RawInput, RouteEvent, SharedSink, Stage};
use crate::gateway::{GatewayEventKind, SharedGateway};
use crate::message::{headers, Message};
use crate::number::{AddressFields, AddressFormatTranslator, InboundAddress};

/// Routes gateway events to the inbound queue.
pub struct InboundRouter {
    addressing: AddressFormatTranslator,
    queue: SharedQueue,
    gateway: SharedGateway,
    sink: SharedSink,
    inbound_queue: String,
}

impl InboundRouter {
    pub fn new(
        addressing: AddressFormatTranslator,
        queue: SharedQueue,
        gateway: SharedGateway,
        sink: SharedSink,
        inbound_queue: &str,
    ) -> Self {
        Self {
            addressing,
            queue,
            gateway,
            sink,
            inbound_queue: inbound_queue.to_string(),
        }
    }

    /// Process gateway events one at a time until shutdown starts or the
    /// gateway closes.
    pub async fn run(&self, shutdown: Arc<Shutdown>) {
        info!(queue = %self.inbound_queue, "inbound worker started");
        let mut shutdown_rx = shutdown.subscribe();

        loop {
            if shutdown.state() != ShutdownState::Running {
                break;
            }

            let event = tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow_and_update() != ShutdownState::Running {
                        debug!("inbound worker draining");
                        break;
                    }
                    continue;
                }

                event = self.gateway.receive() => event,
            };

            let Some(event) = event else {
                info!("gateway inbound closed");
                break;
            };

            let _in_flight = shutdown.track();
            if let Err(e) = self.handle(event).await {
                error!(error = %e, "failed to publish inbound message");
            }
        }
    }

    /// Dispatch one gateway event.
    #[instrument(skip_all)]
    pub async fn handle(&self, event: Message) -> Result<Disposition, BrokerError> {
        let kind = event
            .header_text(headers::MESSAGE_TYPE)
            .map(|k| GatewayEventKind::parse(&k));

        match kind {
            Some(GatewayEventKind::DeliveryReceipt) => {
                let gateway_id = event.header_text(headers::GATEWAY_ID);
                let text = format!(
                    "Delivery receipt for gateway id {}",
                    gateway_id.as_deref().unwrap_or("-")
                );
                self.sink.emit(RouteEvent::DeliveryReceipt { gateway_id, text });
                Ok(Disposition::Recorded)
            }
            Some(GatewayEventKind::DeliverSm) => self.mobile_originated(event).await,
            Some(GatewayEventKind::Other(kind)) => {
                self.sink.emit(RouteEvent::UnhandledEvent { kind });
                Ok(Disposition::Dropped)
            }
            None => {
                self.sink.emit(RouteEvent::UnhandledEvent {
                    kind: String::new(),
                });
                Ok(Disposition::Dropped)
            }
        }
    }

    async fn mobile_originated(&self, event: Message) -> Result<Disposition, BrokerError> {
        let message = match self.translate(event) {
            Outcome::Continue(message) => message,
            Outcome::Drop | Outcome::DeadLetter(_) | Outcome::Fail(..) => {
                return Ok(Disposition::Dropped)
            }
        };
        let message = self.normalize(message);

        let origin = message.header_text(&headers::e164(headers::ORIGIN));
        let destination = message.header_text(&headers::e164(headers::DESTINATION));
        let body = message.body().to_string();

        if let Err(e) = self.queue.publish(&self.inbound_queue, message).await {
            self.sink.emit(RouteEvent::PublishFailed {
                stage: Stage::Inbound,
                queue: self.inbound_queue.clone(),
                reason: e.to_string(),
                input: RawInput {
                    origin,
                    destination,
                },
            });
            return Err(e);
        }

        self.sink.emit(RouteEvent::MobileOriginated {
            origin,
            destination,
            body,
        });

        Ok(Disposition::Published)
    }

    /// Derive canonical origin and destination. Degraded addresses are
    /// recorded and left unset; missing address headers drop the event.
    fn translate(&self, mut message: Message) -> Outcome {
        for fields in [AddressFields::origin(), AddressFields::destination()] {
            match self.addressing.resolve_inbound(&mut message, &fields) {
                Ok(InboundAddress::Resolved(_)) => {}
                Ok(InboundAddress::NationalUnparsed(raw)) => {
                    self.sink.emit(RouteEvent::NationalNumberUnparsed {
                        header: fields.addr_header.to_string(),
                        raw,
                    });
                }
                Ok(InboundAddress::UnhandledTon(ton)) => {
                    self.sink.emit(RouteEvent::UnhandledTypeOfNumber {
                        header: fields.ton_header.to_string(),
                        ton,
                    });
                }
                Err(e) => {
                    self.sink.emit(RouteEvent::InboundDropped {
                        reason: format!("{} at {}", e, Stage::Inbound),
                    });
                    return Outcome::Drop;
                }
            }
        }
        Outcome::Continue(message)
    }

    /// Point the origin header at the canonical address and remove gateway
    /// protocol headers.
    fn normalize(&self, mut message: Message) -> Message {
        if let Some(origin) = message.header_text(&headers::e164(headers::ORIGIN)) {
            message.set_header(headers::ORIGIN, origin);
        }
        message.remove_headers_with_prefix(headers::GATEWAY_PREFIX);
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{MemoryQueue, MessageQueue};
    use crate::events::MemorySink;
    use crate::gateway::{deliver_sm, delivery_receipt, MockGateway};
    use crate::number::Region;

    struct Fixture {
        router: InboundRouter,
        queue: Arc<MemoryQueue>,
        sink: Arc<MemorySink>,
    }

    fn fixture() -> Fixture {
        let queue = MemoryQueue::new();
        let sink = MemorySink::new();
        let addressing = AddressFormatTranslator::new(
            Region::parse("GB").unwrap(),
            "SMSOriginE164",
            "SMSDestinationE164",
        );
        let router = InboundRouter::new(
            addressing,
            queue.clone(),
            Arc::new(MockGateway::success()),
            sink.clone(),
            "inbox",
        );
        Fixture {
            router,
            queue,
            sink,
        }
    }

    #[tokio::test]
    async fn test_mobile_originated_published() {
        let f = fixture();
        let event = deliver_sm(2, "07400123456", 1, "41791234567", "hello");

        let result = f.router.handle(event).await.unwrap();
        assert_eq!(result, Disposition::Published);

        let published = f.queue.drain("inbox").await;
        assert_eq!(published.len(), 1);
        let msg = &published[0];
        assert_eq!(msg.header_text("SMSOrigin").as_deref(), Some("+447400123456"));
        assert_eq!(msg.header_text("SMSOriginE164").as_deref(), Some("+447400123456"));
        assert_eq!(msg.header_text("SMSDestinationE164").as_deref(), Some("+41791234567"));
        assert!(msg.headers().all(|(name, _)| !name.starts_with("Smpp")));
        assert_eq!(msg.body().to_string(), "hello");

        match f.sink.events().last() {
            Some(RouteEvent::MobileOriginated { origin, destination, body }) => {
                assert_eq!(origin.as_deref(), Some("+447400123456"));
                assert_eq!(destination.as_deref(), Some("+41791234567"));
                assert_eq!(body, "hello");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unparseable_national_origin_still_published() {
        let f = fixture();
        let event = deliver_sm(2, "xyz", 1, "41791234567", "hello");

        assert_eq!(f.router.handle(event).await.unwrap(), Disposition::Published);

        let published = f.queue.drain("inbox").await;
        assert!(!published[0].has_header("SMSOrigin"));
        assert!(!published[0].has_header("SMSOriginE164"));
        assert!(f
            .sink
            .events()
            .iter()
            .any(|e| matches!(e, RouteEvent::NationalNumberUnparsed { raw, .. } if raw == "xyz")));
    }

    #[tokio::test]
    async fn test_missing_address_header_dropped() {
        let f = fixture();
        let mut event = deliver_sm(1, "41791234567", 1, "447400123456", "hello");
        event.remove_header(headers::DEST_ADDR_TON);

        assert_eq!(f.router.handle(event).await.unwrap(), Disposition::Dropped);
        assert_eq!(f.queue.len("inbox").await, 0);
        assert!(matches!(
            f.sink.events().last(),
            Some(RouteEvent::InboundDropped { .. })
        ));
    }

    #[tokio::test]
    async fn test_delivery_receipt_not_published() {
        let f = fixture();

        let result = f.router.handle(delivery_receipt("MOCK0000000000000001")).await.unwrap();
        assert_eq!(result, Disposition::Recorded);
        assert_eq!(f.queue.len("inbox").await, 0);

        match f.sink.events().last() {
            Some(RouteEvent::DeliveryReceipt { gateway_id, .. }) => {
                assert_eq!(gateway_id.as_deref(), Some("MOCK0000000000000001"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unhandled_event_kind_dropped() {
        let f = fixture();
        let event = Message::text("x").with_header(headers::MESSAGE_TYPE, "AlertNotification");

        assert_eq!(f.router.handle(event).await.unwrap(), Disposition::Dropped);
        assert_eq!(f.queue.len("inbox").await, 0);
        assert_eq!(
            f.sink.events(),
            vec![RouteEvent::UnhandledEvent {
                kind: "AlertNotification".to_string()
            }]
        );
    }

    struct FailingQueue;

    #[async_trait::async_trait]
    impl MessageQueue for FailingQueue {
        async fn receive(&self, queue: &str) -> Result<Option<Message>, BrokerError> {
            Err(BrokerError::Backend(queue.to_string()))
        }

        async fn publish(&self, queue: &str, _message: Message) -> Result<(), BrokerError> {
            Err(BrokerError::Backend(queue.to_string()))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_publish_failure_recorded() {
        let f = fixture();
        let router = InboundRouter {
            queue: Arc::new(FailingQueue),
            ..f.router
        };
        let event = deliver_sm(1, "447400123456", 1, "41791234567", "hello");

        assert!(router.handle(event).await.is_err());

        match f.sink.events().last() {
            Some(RouteEvent::PublishFailed {
                stage,
                queue,
                input,
                ..
            }) => {
                assert_eq!(*stage, Stage::Inbound);
                assert_eq!(queue, "inbox");
                assert_eq!(input.origin.as_deref(), Some("+447400123456"));
                assert_eq!(input.destination.as_deref(), Some("+41791234567"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(!f
            .sink
            .events()
            .iter()
            .any(|e| matches!(e, RouteEvent::MobileOriginated { .. })));
    }
}
