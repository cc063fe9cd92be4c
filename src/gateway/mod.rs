//! Gateway (SMSC) abstraction.
//!
//! The SMPP client (binding, PDU codec, enquire-link, its own retries) is an
//! external collaborator. The router sends prepared messages through
//! [`Gateway::send`] and pulls gateway events with [`Gateway::receive`].

mod mock;

pub use mock::{deliver_sm, delivery_receipt, MockGateway, SentMessage};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::GatewayConfig;
use crate::message::Message;

/// SMPP TON for international numbers.
pub const TON_INTERNATIONAL: u8 = 1;

/// SMPP NPI for ISDN (E.164).
pub const NPI_ISDN: u8 = 1;

/// Gateway error.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway answered with an error status.
    #[error("rejected by gateway with status 0x{status:08X}")]
    Rejected { status: u32 },

    /// The gateway could not be reached.
    #[error("gateway unavailable: {0}")]
    Unavailable(String),
}

/// Kind of an event received from the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEventKind {
    DeliveryReceipt,
    /// Mobile-originated message.
    DeliverSm,
    Other(String),
}

impl GatewayEventKind {
    pub fn parse(s: &str) -> Self {
        match s {
            "DeliveryReceipt" => Self::DeliveryReceipt,
            "DeliverSm" => Self::DeliverSm,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::DeliveryReceipt => "DeliveryReceipt",
            Self::DeliverSm => "DeliverSm",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for GatewayEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection parameters handed to the SMPP client.
#[derive(Clone, PartialEq, Eq)]
pub struct BindParams {
    pub host: String,
    pub port: u16,
    pub system_id: String,
    pub password: String,
    pub system_type: String,
    pub enquire_link: Duration,
    pub ton: u8,
    pub npi: u8,
    /// Ask the SMSC for delivery receipts on submitted messages
    pub registered_delivery: bool,
}

impl BindParams {
    /// Parameters for the sending side; requests delivery receipts.
    pub fn producer(config: &GatewayConfig) -> Self {
        Self {
            registered_delivery: true,
            ..Self::consumer(config)
        }
    }

    /// Parameters for the receiving side.
    pub fn consumer(config: &GatewayConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            system_id: config.system_id.clone(),
            password: config.password.clone(),
            system_type: config.system_type.clone(),
            enquire_link: config.enquire_link,
            ton: TON_INTERNATIONAL,
            npi: NPI_ISDN,
            registered_delivery: false,
        }
    }
}

impl fmt::Debug for BindParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("system_id", &self.system_id)
            .field("password", &"***")
            .field("system_type", &self.system_type)
            .field("enquire_link", &self.enquire_link)
            .field("ton", &self.ton)
            .field("npi", &self.npi)
            .field("registered_delivery", &self.registered_delivery)
            .finish()
    }
}

/// Gateway operations used by the router.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Submit a message carrying the `Smpp*` address headers. Returns the
    /// gateway-assigned message id.
    async fn send(&self, message: &Message) -> Result<String, GatewayError>;

    /// Next event from the gateway. `None` once the gateway side is closed.
    async fn receive(&self) -> Option<Message>;

    /// Gateway name for logging.
    fn name(&self) -> &'static str;
}

/// A shared gateway handle.
pub type SharedGateway = Arc<dyn Gateway>;
