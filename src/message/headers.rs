//! Header names forming the router's internal protocol.

/// Raw origin address supplied by the producer.
pub const ORIGIN: &str = "SMSOrigin";

/// Raw destination address supplied by the producer.
pub const DESTINATION: &str = "SMSDestination";

/// Suffix of the derived canonical (E.164) header.
pub const E164_SUFFIX: &str = "E164";

/// Suffix of the derived ISO 3166-1 alpha-2 country header.
pub const COUNTRY_SUFFIX: &str = "CountryISO2";

/// Prefix shared by all gateway-protocol headers.
pub const GATEWAY_PREFIX: &str = "Smpp";

pub const SOURCE_ADDR: &str = "SmppSourceAddr";
pub const SOURCE_ADDR_TON: &str = "SmppSourceAddrTon";
pub const DEST_ADDR: &str = "SmppDestAddr";
pub const DEST_ADDR_TON: &str = "SmppDestAddrTon";

/// Gateway-assigned message id.
pub const GATEWAY_ID: &str = "SmppId";

/// Kind of an event received from the gateway.
pub const MESSAGE_TYPE: &str = "SmppMessageType";

/// `<name>E164`
pub fn e164(name: &str) -> String {
    format!("{}{}", name, E164_SUFFIX)
}

/// `<name>CountryISO2`
pub fn country(name: &str) -> String {
    format!("{}{}", name, COUNTRY_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_names() {
        assert_eq!(e164(ORIGIN), "SMSOriginE164");
        assert_eq!(country(DESTINATION), "SMSDestinationCountryISO2");
        assert!(!ORIGIN.starts_with(GATEWAY_PREFIX));
    }
}
