//! Country classification of raw phone number headers.

use tracing::debug;

use super::{format_e164, parse_number, region_of, Region};
use crate::error::RouteError;
use crate::message::{headers, Message};

/// Result of classifying one number header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Raw header value that was parsed
    pub raw: String,
    /// Canonical E.164 form
    pub e164: String,
    /// ISO2 country, `None` when it could not be resolved
    pub country: Option<String>,
}

/// Parses the raw number in `header` against a default region and stores
/// `<header>E164` and, when resolvable, `<header>CountryISO2`.
#[derive(Debug, Clone)]
pub struct PhoneNumberClassifier {
    header: String,
    e164_header: String,
    country_header: String,
    region: Region,
}

impl PhoneNumberClassifier {
    pub fn new(header: &str, region: Region) -> Self {
        Self {
            header: header.to_string(),
            e164_header: headers::e164(header),
            country_header: headers::country(header),
            region,
        }
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn e164_header(&self) -> &str {
        &self.e164_header
    }

    pub fn country_header(&self) -> &str {
        &self.country_header
    }

    pub fn region(&self) -> Region {
        self.region
    }

    /// Classify the message's number header.
    ///
    /// An unresolvable country is not an error: the country header is left
    /// absent and `country` is `None` in the returned classification.
    pub fn classify(&self, message: &mut Message) -> Result<Classification, RouteError> {
        let raw = message.header_text(&self.header).ok_or_else(|| {
            debug!(header = %self.header, "missing number header");
            RouteError::MissingHeader(self.header.clone())
        })?;

        let number = parse_number(&raw, self.region).map_err(|e| {
            debug!(header = %self.header, raw = %raw, error = %e, "number parse failed");
            e
        })?;

        let e164 = format_e164(&number);
        let country = region_of(&number);

        message.set_header(&self.e164_header, e164.as_str());
        match &country {
            Some(iso2) => message.set_header(&self.country_header, iso2.as_str()),
            None => {
                message.remove_header(&self.country_header);
            }
        }

        debug!(
            header = %self.header,
            e164 = %e164,
            country = ?country,
            "number classified"
        );

        Ok(Classification { raw, e164, country })
    }
}
