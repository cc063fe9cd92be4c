//! Phone number handling.
//!
//! - [`PhoneNumberClassifier`] derives the E.164 form and ISO2 country of a
//!   raw number header.
//! - [`AddressFormatTranslator`] converts between E.164 headers and the
//!   gateway's (type-of-number, digits) address pairs.

mod addressing;
mod classifier;

pub use addressing::{
    AddressFields, AddressFormatTranslator, InboundAddress, TonAddress, TypeOfNumber,
};
pub use classifier::{Classification, PhoneNumberClassifier};

use std::fmt;
use std::str::FromStr;

use phonenumber::country;
use phonenumber::{Mode, PhoneNumber};

use crate::error::{ConfigError, RouteError};

/// ISO 3166-1 alpha-2 region used as the parsing context for numbers that
/// are not written in international form.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region(country::Id);

impl Region {
    /// Parse a region code, case-insensitively.
    pub fn parse(code: &str) -> Result<Self, ConfigError> {
        country::Id::from_str(&code.trim().to_uppercase())
            .map(Region)
            .map_err(|_| ConfigError::UnknownRegion(code.to_string()))
    }

    pub fn id(&self) -> country::Id {
        self.0
    }
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl FromStr for Region {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Parse `raw` in the context of `region`.
pub(crate) fn parse_number(raw: &str, region: Region) -> Result<PhoneNumber, RouteError> {
    phonenumber::parse(Some(region.id()), raw).map_err(|e| RouteError::InvalidNumber {
        raw: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Canonical `+<country code><subscriber>` rendering.
pub(crate) fn format_e164(number: &PhoneNumber) -> String {
    number.format().mode(Mode::E164).to_string()
}

/// ISO2 code of the region the number belongs to, if it can be resolved.
pub(crate) fn region_of(number: &PhoneNumber) -> Option<String> {
    number.country().id().map(|id| format!("{:?}", id))
}
