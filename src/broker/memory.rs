//! In-process FIFO queues.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::trace;

use super::{BrokerError, MessageQueue};
use crate::message::Message;

struct Topic {
    tx: mpsc::UnboundedSender<Message>,
    rx: Mutex<mpsc::UnboundedReceiver<Message>>,
}

impl Topic {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }
}

/// Named in-memory queues, created on first use.
#[derive(Default)]
pub struct MemoryQueue {
    topics: RwLock<HashMap<String, Arc<Topic>>>,
}

impl MemoryQueue {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    async fn topic(&self, name: &str) -> Arc<Topic> {
        {
            let topics = self.topics.read().await;
            if let Some(topic) = topics.get(name) {
                return topic.clone();
            }
        }

        let mut topics = self.topics.write().await;
        topics
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Topic::new()))
            .clone()
    }

    /// Take every message currently waiting on `queue`.
    pub async fn drain(&self, queue: &str) -> Vec<Message> {
        let topic = self.topic(queue).await;
        let mut rx = topic.rx.lock().await;
        let mut out = Vec::new();
        while let Ok(message) = rx.try_recv() {
            out.push(message);
        }
        out
    }

    /// Number of messages waiting on `queue`.
    pub async fn len(&self, queue: &str) -> usize {
        let topic = self.topic(queue).await;
        let rx = topic.rx.lock().await;
        rx.len()
    }
}

#[async_trait]
impl MessageQueue for MemoryQueue {
    async fn receive(&self, queue: &str) -> Result<Option<Message>, BrokerError> {
        let topic = self.topic(queue).await;
        let mut rx = topic.rx.lock().await;
        Ok(rx.recv().await)
    }

    async fn publish(&self, queue: &str, message: Message) -> Result<(), BrokerError> {
        let topic = self.topic(queue).await;
        trace!(queue = %queue, "publishing message");
        topic
            .tx
            .send(message)
            .map_err(|_| BrokerError::Closed(queue.to_string()))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
