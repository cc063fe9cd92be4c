//! Message queue abstraction.
//!
//! The broker itself (durability, delivery guarantees) lives outside this
//! crate. The router only needs to pull from and publish to named queues.

mod memory;

pub use memory::MemoryQueue;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::message::Message;

/// Broker error.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// The queue was closed.
    #[error("queue closed: {0}")]
    Closed(String),

    /// Backend-specific failure.
    #[error("broker error: {0}")]
    Backend(String),
}

/// Named-queue message broker.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Wait for the next message on `queue`. `None` once the queue is closed
    /// and empty.
    async fn receive(&self, queue: &str) -> Result<Option<Message>, BrokerError>;

    /// Append a message to `queue`.
    async fn publish(&self, queue: &str, message: Message) -> Result<(), BrokerError>;

    /// Backend name for logging.
    fn name(&self) -> &'static str;
}

/// A shared broker handle.
pub type SharedQueue = Arc<dyn MessageQueue>;
