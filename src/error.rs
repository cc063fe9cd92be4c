//! Error types for the routing pipeline.

use thiserror::Error;

use crate::gateway::GatewayError;

/// Failure of a single message's pipeline run.
///
/// Any of these aborts the outbound run and sends the message to the
/// dead-letter queue.
#[derive(Debug, Error)]
pub enum RouteError {
    /// A required header is absent.
    #[error("missing header: {0}")]
    MissingHeader(String),

    /// A phone number could not be parsed.
    #[error("error while parsing '{raw}': {reason}")]
    InvalidNumber { raw: String, reason: String },

    /// The gateway refused the message.
    #[error("gateway send failed: {0}")]
    GatewaySend(#[from] GatewayError),
}

impl RouteError {
    /// Short name of the error kind for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingHeader(_) => "missing_header",
            Self::InvalidNumber { .. } => "invalid_number",
            Self::GatewaySend(_) => "gateway_send_failure",
        }
    }
}

/// Invalid component configuration. Fatal at construction time.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("colon missing from overrides group '{0}'")]
    MissingColon(String),

    #[error("too many colons in overrides group '{0}'")]
    TooManyColons(String),

    #[error("empty source address in overrides group '{0}'")]
    EmptySource(String),

    #[error("unknown region code: {0}")]
    UnknownRegion(String),
}
