//! Mock gateway for running and testing without an SMSC.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::time::{sleep, Instant};
use tracing::{debug, trace};

use super::{Gateway, GatewayError, GatewayEventKind};
use crate::config::{MockConfig, MockResponse};
use crate::message::{headers, Message};

/// One send attempt seen by the mock.
#[derive(Debug, Clone)]
pub struct SentMessage {
    /// When the send was issued
    pub at: Instant,
    /// Id assigned, `None` if the mock rejected it
    pub gateway_id: Option<String>,
    pub message: Message,
}

/// Gateway that answers sends from configuration and replays injected
/// inbound events.
pub struct MockGateway {
    response: MockResponse,
    latency: Duration,
    message_counter: AtomicU64,
    success_count: AtomicU64,
    error_count: AtomicU64,
    sent: Mutex<Vec<SentMessage>>,
    inbound_tx: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    inbound_rx: AsyncMutex<mpsc::UnboundedReceiver<Message>>,
}

impl MockGateway {
    pub fn new(config: &MockConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            response: config.response.clone(),
            latency: config.latency,
            message_counter: AtomicU64::new(1),
            success_count: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            sent: Mutex::new(Vec::new()),
            inbound_tx: Mutex::new(Some(tx)),
            inbound_rx: AsyncMutex::new(rx),
        }
    }

    /// Accept every send.
    pub fn success() -> Self {
        Self::new(&MockConfig::default())
    }

    /// Reject every send with `code`.
    pub fn error(code: u32) -> Self {
        Self::new(&MockConfig {
            response: MockResponse::Error { code },
            latency: Duration::ZERO,
        })
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Queue an inbound event as if it came from the SMSC.
    pub fn inject(&self, event: Message) -> bool {
        match self.lock_tx().as_ref() {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    /// Close the inbound side; `receive` returns `None` once drained.
    pub fn close_inbound(&self) {
        self.lock_tx().take();
    }

    /// All send attempts so far, in order.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn request_count(&self) -> u64 {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).len() as u64
    }

    pub fn success_count(&self) -> u64 {
        self.success_count.load(Ordering::Relaxed)
    }

    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    fn next_message_id(&self) -> String {
        let id = self.message_counter.fetch_add(1, Ordering::Relaxed);
        format!("MOCK{:016X}", id)
    }

    fn lock_tx(&self) -> std::sync::MutexGuard<'_, Option<mpsc::UnboundedSender<Message>>> {
        self.inbound_tx.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, at: Instant, gateway_id: Option<String>, message: &Message) {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(SentMessage {
                at,
                gateway_id,
                message: message.clone(),
            });
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn send(&self, message: &Message) -> Result<String, GatewayError> {
        let at = Instant::now();

        if !self.latency.is_zero() {
            trace!(latency_ms = self.latency.as_millis() as u64, "simulating latency");
            sleep(self.latency).await;
        }

        match &self.response {
            MockResponse::Success => {
                let id = self.next_message_id();
                self.success_count.fetch_add(1, Ordering::Relaxed);
                self.record(at, Some(id.clone()), message);
                debug!(gateway_id = %id, "mock success");
                Ok(id)
            }
            MockResponse::Error { code } => {
                self.error_count.fetch_add(1, Ordering::Relaxed);
                self.record(at, None, message);
                debug!(code = *code, "mock error");
                Err(GatewayError::Rejected { status: *code })
            }
        }
    }

    async fn receive(&self) -> Option<Message> {
        self.inbound_rx.lock().await.recv().await
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Build a mobile-originated event as the SMPP client would deliver it.
pub fn deliver_sm(
    source_ton: u8,
    source: &str,
    dest_ton: u8,
    dest: &str,
    body: &str,
) -> Message {
    Message::text(body)
        .with_header(headers::MESSAGE_TYPE, GatewayEventKind::DeliverSm.as_str())
        .with_header(headers::SOURCE_ADDR_TON, source_ton)
        .with_header(headers::SOURCE_ADDR, source)
        .with_header(headers::DEST_ADDR_TON, dest_ton)
        .with_header(headers::DEST_ADDR, dest)
}

/// Build a delivery receipt event for `gateway_id`.
pub fn delivery_receipt(gateway_id: &str) -> Message {
    Message::text(format!("id:{} stat:DELIVRD", gateway_id))
        .with_header(headers::MESSAGE_TYPE, GatewayEventKind::DeliveryReceipt.as_str())
        .with_header(headers::GATEWAY_ID, gateway_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_success() {
        let mock = MockGateway::success();
        let id = mock.send(&Message::text("test")).await.unwrap();

        assert!(id.starts_with("MOCK"));
        assert_eq!(mock.request_count(), 1);
        assert_eq!(mock.success_count(), 1);
        assert_eq!(mock.sent()[0].gateway_id.as_deref(), Some(id.as_str()));
    }

    #[tokio::test]
    async fn test_mock_error() {
        let mock = MockGateway::error(0x08);

        let result = mock.send(&Message::text("test")).await;
        assert!(matches!(result, Err(GatewayError::Rejected { status: 0x08 })));
        assert_eq!(mock.error_count(), 1);
        assert_eq!(mock.request_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_latency() {
        let mock = MockGateway::success().with_latency(Duration::from_millis(10));

        let start = Instant::now();
        mock.send(&Message::text("test")).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_inbound_replay() {
        let mock = MockGateway::success();
        assert!(mock.inject(delivery_receipt("MOCK1")));
        assert!(mock.inject(deliver_sm(1, "41791234567", 1, "447400123456", "hi")));
        mock.close_inbound();
        assert!(!mock.inject(Message::text("late")));

        let first = mock.receive().await.unwrap();
        assert_eq!(first.header_text(headers::MESSAGE_TYPE).as_deref(), Some("DeliveryReceipt"));
        let second = mock.receive().await.unwrap();
        assert_eq!(second.header_text(headers::MESSAGE_TYPE).as_deref(), Some("DeliverSm"));
        assert!(mock.receive().await.is_none());
    }
}
