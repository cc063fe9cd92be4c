//! Translation between E.164 headers and gateway-native addresses.
//!
//! Outbound, both addresses are always sent as international numbers with
//! the leading `+` stripped. Inbound, the gateway may hand us international
//! or national numbers; national ones are parsed against the gateway's home
//! region.

use tracing::debug;

use super::{format_e164, parse_number, Region};
use crate::error::RouteError;
use crate::message::{headers, Message};

/// SMPP type-of-number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeOfNumber {
    International,
    National,
    Other(i64),
}

impl TypeOfNumber {
    pub fn code(&self) -> i64 {
        match self {
            Self::International => 1,
            Self::National => 2,
            Self::Other(v) => *v,
        }
    }

    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::International,
            2 => Self::National,
            other => Self::Other(other),
        }
    }
}

/// Gateway-native address: a type-of-number plus the digits as sent on the
/// wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TonAddress {
    pub ton: TypeOfNumber,
    pub digits: String,
}

impl TonAddress {
    /// International address for an E.164 number.
    pub fn from_e164(e164: &str) -> Self {
        Self {
            ton: TypeOfNumber::International,
            digits: e164.strip_prefix('+').unwrap_or(e164).to_string(),
        }
    }
}

/// The three headers describing one side (origin or destination) of an
/// inbound message.
#[derive(Debug, Clone)]
pub struct AddressFields {
    pub ton_header: &'static str,
    pub addr_header: &'static str,
    pub e164_header: String,
}

impl AddressFields {
    pub fn origin() -> Self {
        Self {
            ton_header: headers::SOURCE_ADDR_TON,
            addr_header: headers::SOURCE_ADDR,
            e164_header: headers::e164(headers::ORIGIN),
        }
    }

    pub fn destination() -> Self {
        Self {
            ton_header: headers::DEST_ADDR_TON,
            addr_header: headers::DEST_ADDR,
            e164_header: headers::e164(headers::DESTINATION),
        }
    }
}

/// Outcome of translating one inbound address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundAddress {
    /// Canonical form was written to the E.164 header.
    Resolved(String),
    /// National number that did not parse; E.164 header left unset.
    NationalUnparsed(String),
    /// Type-of-number we don't handle; E.164 header left unset.
    UnhandledTon(String),
}

/// Converts between canonical international addresses and gateway-native
/// address pairs.
#[derive(Debug, Clone)]
pub struct AddressFormatTranslator {
    smsc_region: Region,
    origin_e164: String,
    destination_e164: String,
}

impl AddressFormatTranslator {
    /// `origin_e164` and `destination_e164` name the canonical headers.
    pub fn new(smsc_region: Region, origin_e164: &str, destination_e164: &str) -> Self {
        Self {
            smsc_region,
            origin_e164: origin_e164.to_string(),
            destination_e164: destination_e164.to_string(),
        }
    }

    pub fn smsc_region(&self) -> Region {
        self.smsc_region
    }

    /// Write the gateway source/destination address headers from the
    /// canonical origin and destination headers.
    pub fn prepare_outbound(&self, message: &mut Message) -> Result<(), RouteError> {
        let origin = message
            .header_text(&self.origin_e164)
            .ok_or_else(|| RouteError::MissingHeader(self.origin_e164.clone()))?;
        let destination = message
            .header_text(&self.destination_e164)
            .ok_or_else(|| RouteError::MissingHeader(self.destination_e164.clone()))?;

        let source = TonAddress::from_e164(&origin);
        let dest = TonAddress::from_e164(&destination);

        message.set_header(headers::SOURCE_ADDR_TON, source.ton.code());
        message.set_header(headers::DEST_ADDR_TON, dest.ton.code());
        message.set_header(headers::SOURCE_ADDR, source.digits);
        message.set_header(headers::DEST_ADDR, dest.digits);

        Ok(())
    }

    /// Derive the canonical header for one inbound address.
    ///
    /// Missing TON or address headers are errors; an unparseable national
    /// number or unknown TON only leaves the canonical header unset.
    pub fn resolve_inbound(
        &self,
        message: &mut Message,
        fields: &AddressFields,
    ) -> Result<InboundAddress, RouteError> {
        let ton = message.header(fields.ton_header).cloned().ok_or_else(|| {
            debug!(header = fields.ton_header, "missing header");
            RouteError::MissingHeader(fields.ton_header.to_string())
        })?;
        let address = message.header_text(fields.addr_header).ok_or_else(|| {
            debug!(header = fields.addr_header, "missing header");
            RouteError::MissingHeader(fields.addr_header.to_string())
        })?;

        let resolved = match ton.as_int().map(TypeOfNumber::from_code) {
            Some(TypeOfNumber::International) => {
                InboundAddress::Resolved(format!("+{}", address))
            }
            Some(TypeOfNumber::National) => match parse_number(&address, self.smsc_region) {
                Ok(number) => InboundAddress::Resolved(format_e164(&number)),
                Err(_) => {
                    debug!(address = %address, "failed to parse national number");
                    InboundAddress::NationalUnparsed(address)
                }
            },
            Some(TypeOfNumber::Other(code)) => {
                debug!(ton = code, "unhandled type of number");
                InboundAddress::UnhandledTon(code.to_string())
            }
            None => {
                debug!(ton = %ton, "unhandled type of number");
                InboundAddress::UnhandledTon(ton.to_string())
            }
        };

        if let InboundAddress::Resolved(e164) = &resolved {
            debug!(header = %fields.e164_header, e164 = %e164, "inbound address resolved");
            message.set_header(&fields.e164_header, e164.as_str());
        }

        Ok(resolved)
    }

    /// Resolve origin then destination.
    pub fn resolve_inbound_pair(
        &self,
        message: &mut Message,
    ) -> Result<(InboundAddress, InboundAddress), RouteError> {
        let origin = self.resolve_inbound(message, &AddressFields::origin())?;
        let destination = self.resolve_inbound(message, &AddressFields::destination())?;
        Ok((origin, destination))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::HeaderValue;

    fn translator() -> AddressFormatTranslator {
        AddressFormatTranslator::new(
            Region::parse("GB").unwrap(),
            "SMSOriginE164",
            "SMSDestinationE164",
        )
    }

    fn inbound(ton: i64, addr: &str) -> Message {
        Message::text("hello")
            .with_header(headers::SOURCE_ADDR_TON, ton)
            .with_header(headers::SOURCE_ADDR, addr)
            .with_header(headers::DEST_ADDR_TON, 1i64)
            .with_header(headers::DEST_ADDR, "41791234567")
    }

    #[test]
    fn test_ton_codes() {
        assert_eq!(TypeOfNumber::from_code(1), TypeOfNumber::International);
        assert_eq!(TypeOfNumber::from_code(2), TypeOfNumber::National);
        assert_eq!(TypeOfNumber::from_code(5), TypeOfNumber::Other(5));
        assert_eq!(TypeOfNumber::Other(5).code(), 5);
    }

    #[test]
    fn test_prepare_outbound() {
        let mut msg = Message::text("hi")
            .with_header("SMSOriginE164", "+16461234567")
            .with_header("SMSDestinationE164", "+41791234567");

        translator().prepare_outbound(&mut msg).unwrap();

        assert_eq!(msg.header(headers::SOURCE_ADDR_TON), Some(&HeaderValue::Int(1)));
        assert_eq!(msg.header(headers::DEST_ADDR_TON), Some(&HeaderValue::Int(1)));
        assert_eq!(msg.header_text(headers::SOURCE_ADDR).as_deref(), Some("16461234567"));
        assert_eq!(msg.header_text(headers::DEST_ADDR).as_deref(), Some("41791234567"));
    }

    #[test]
    fn test_prepare_outbound_missing_destination() {
        let mut msg = Message::text("hi").with_header("SMSOriginE164", "+16461234567");

        match translator().prepare_outbound(&mut msg) {
            Err(RouteError::MissingHeader(name)) => assert_eq!(name, "SMSDestinationE164"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(!msg.has_header(headers::SOURCE_ADDR));
    }

    #[test]
    fn test_international_inverse() {
        let t = translator();
        let mut out = Message::text("hi")
            .with_header("SMSOriginE164", "+41791234567")
            .with_header("SMSDestinationE164", "+41791234567");
        t.prepare_outbound(&mut out).unwrap();

        let mut back = Message::text("hi")
            .with_header(headers::SOURCE_ADDR_TON, out.header(headers::SOURCE_ADDR_TON).cloned().unwrap())
            .with_header(headers::SOURCE_ADDR, out.header(headers::SOURCE_ADDR).cloned().unwrap());

        let resolved = t.resolve_inbound(&mut back, &AddressFields::origin()).unwrap();
        assert_eq!(resolved, InboundAddress::Resolved("+41791234567".to_string()));
        assert_eq!(back.header_text("SMSOriginE164").as_deref(), Some("+41791234567"));
    }

    #[test]
    fn test_national_number_uses_smsc_region() {
        let mut msg = inbound(2, "07400123456");
        let (origin, destination) = translator().resolve_inbound_pair(&mut msg).unwrap();

        assert_eq!(origin, InboundAddress::Resolved("+447400123456".to_string()));
        assert_eq!(destination, InboundAddress::Resolved("+41791234567".to_string()));
        assert_eq!(msg.header_text("SMSOriginE164").as_deref(), Some("+447400123456"));
    }

    #[test]
    fn test_unparseable_national_number_is_not_fatal() {
        let mut msg = inbound(2, "abc");
        let (origin, _) = translator().resolve_inbound_pair(&mut msg).unwrap();

        assert_eq!(origin, InboundAddress::NationalUnparsed("abc".to_string()));
        assert!(!msg.has_header("SMSOriginE164"));
        assert!(msg.has_header("SMSDestinationE164"));
    }

    #[test]
    fn test_unhandled_ton() {
        let mut msg = inbound(5, "ALPHA");
        let (origin, _) = translator().resolve_inbound_pair(&mut msg).unwrap();

        assert_eq!(origin, InboundAddress::UnhandledTon("5".to_string()));
        assert!(!msg.has_header("SMSOriginE164"));
    }

    #[test]
    fn test_missing_ton_header() {
        let mut msg = Message::text("x").with_header(headers::SOURCE_ADDR, "41791234567");

        match translator().resolve_inbound(&mut msg, &AddressFields::origin()) {
            Err(RouteError::MissingHeader(name)) => assert_eq!(name, headers::SOURCE_ADDR_TON),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_missing_address_header() {
        let mut msg = Message::text("x").with_header(headers::DEST_ADDR_TON, 1i64);

        match translator().resolve_inbound(&mut msg, &AddressFields::destination()) {
            Err(RouteError::MissingHeader(name)) => assert_eq!(name, headers::DEST_ADDR),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
