use std::fmt;

/// Pipeline stage a record refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Classify,
    Decide,
    Route,
    Send,
    Inbound,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classify => "classify",
            Self::Decide => "decide",
            Self::Route => "route",
            Self::Send => "send",
            Self::Inbound => "inbound",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity a record should be reported at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

/// Raw producer-supplied addresses, kept for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawInput {
    pub origin: Option<String>,
    pub destination: Option<String>,
}

/// A log-worthy event produced by the routing pipelines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteEvent {
    /// Destination country is on the blacklist.
    Blacklisted { header: String, value: String },

    /// Number parsed but no country could be determined.
    CountryUnresolved { header: String, raw: String },

    /// Source address replaced for the destination country.
    SourceOverridden { country: String, source: String },

    /// Message sent to the dead-letter queue.
    DeadLettered {
        stage: Stage,
        reason: String,
        input: RawInput,
    },

    /// A dead-letter or inbound publish failed; the message is lost.
    PublishFailed {
        stage: Stage,
        queue: String,
        reason: String,
        input: RawInput,
    },

    /// Gateway accepted an outbound message.
    SendConfirmed {
        destination: String,
        gateway_id: String,
        text: String,
    },

    /// Delivery receipt received from the gateway.
    DeliveryReceipt { gateway_id: Option<String>, text: String },

    /// Mobile-originated message published to the inbound queue.
    MobileOriginated {
        origin: Option<String>,
        destination: Option<String>,
        body: String,
    },

    /// National number from the gateway could not be parsed.
    NationalNumberUnparsed { header: String, raw: String },

    /// Type-of-number we do not translate.
    UnhandledTypeOfNumber { header: String, ton: String },

    /// Inbound event dropped before publishing.
    InboundDropped { reason: String },

    /// Inbound event kind we do not handle.
    UnhandledEvent { kind: String },
}

impl RouteEvent {
    pub fn severity(&self) -> Severity {
        match self {
            Self::Blacklisted { .. }
            | Self::SendConfirmed { .. }
            | Self::DeliveryReceipt { .. }
            | Self::MobileOriginated { .. } => Severity::Info,
            Self::SourceOverridden { .. } => Severity::Debug,
            Self::CountryUnresolved { .. }
            | Self::NationalNumberUnparsed { .. }
            | Self::UnhandledTypeOfNumber { .. }
            | Self::InboundDropped { .. }
            | Self::UnhandledEvent { .. } => Severity::Warn,
            Self::PublishFailed { .. } => Severity::Error,
            Self::DeadLettered { stage, .. } => match stage {
                Stage::Decide => Severity::Info,
                _ => Severity::Error,
            },
        }
    }

    /// Short machine-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Blacklisted { .. } => "blacklisted",
            Self::CountryUnresolved { .. } => "country_unresolved",
            Self::SourceOverridden { .. } => "source_overridden",
            Self::DeadLettered { .. } => "dead_lettered",
            Self::PublishFailed { .. } => "publish_failed",
            Self::SendConfirmed { .. } => "send_confirmed",
            Self::DeliveryReceipt { .. } => "delivery_receipt",
            Self::MobileOriginated { .. } => "mobile_originated",
            Self::NationalNumberUnparsed { .. } => "national_number_unparsed",
            Self::UnhandledTypeOfNumber { .. } => "unhandled_type_of_number",
            Self::InboundDropped { .. } => "inbound_dropped",
            Self::UnhandledEvent { .. } => "unhandled_event",
        }
    }
}

impl fmt::Display for RouteEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blacklisted { header, value } => {
                write!(f, "header '{}' value '{}' is blacklisted", header, value)
            }
            Self::CountryUnresolved { header, raw } => {
                write!(f, "no ISO country code for {} number: {}", header, raw)
            }
            Self::SourceOverridden { country, source } => {
                write!(f, "country '{}' uses source: {}", country, source)
            }
            Self::DeadLettered { stage, reason, input } => write!(
                f,
                "dead-lettered at {}: {} (origin={}, destination={})",
                stage,
                reason,
                input.origin.as_deref().unwrap_or("-"),
                input.destination.as_deref().unwrap_or("-"),
            ),
            Self::PublishFailed {
                stage,
                queue,
                reason,
                input,
            } => write!(
                f,
                "message lost at {}, publish to {} failed: {} (origin={}, destination={})",
                stage,
                queue,
                reason,
                input.origin.as_deref().unwrap_or("-"),
                input.destination.as_deref().unwrap_or("-"),
            ),
            Self::SendConfirmed { text, .. } => f.write_str(text),
            Self::DeliveryReceipt { text, .. } => f.write_str(text),
            Self::MobileOriginated {
                origin,
                destination,
                body,
            } => write!(
                f,
                "message from {} to {}: {}",
                origin.as_deref().unwrap_or("-"),
                destination.as_deref().unwrap_or("-"),
                body
            ),
            Self::NationalNumberUnparsed { header, raw } => {
                write!(f, "failed to parse national number in {}: {}", header, raw)
            }
            Self::UnhandledTypeOfNumber { header, ton } => {
                write!(f, "unhandled type of number in {}: {}", header, ton)
            }
            Self::InboundDropped { reason } => write!(f, "inbound event dropped: {}", reason),
            Self::UnhandledEvent { kind } => write!(f, "unhandled event type: {}", kind),
        }
    }
}
