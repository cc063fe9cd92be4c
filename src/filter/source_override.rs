//! Per-country source address overrides.
//!
//! Some destinations only accept traffic from specific source numbers. The
//! configuration is a `;`-separated list of `<countries>:<source>` groups,
//! e.g. `US,CA:+16461234567;FR:+33612345678`.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::error::ConfigError;
use crate::message::Message;

/// Rewrites the source header when the destination country has an override.
#[derive(Debug, Clone)]
pub struct SourceOverrideResolver {
    overrides: HashMap<String, String>,
    country_header: String,
    source_header: String,
}

impl SourceOverrideResolver {
    /// Parse the overrides string. Trailing empty groups are ignored. Fails
    /// if any other group does not contain exactly one colon or names an
    /// empty source.
    pub fn new(
        overrides: &str,
        country_header: &str,
        source_header: &str,
    ) -> Result<Self, ConfigError> {
        debug!(overrides = %overrides, "parsing source overrides");

        let mut groups: Vec<&str> = overrides.split(';').collect();
        while groups.last().is_some_and(|g| g.trim().is_empty()) {
            groups.pop();
        }

        let mut table = HashMap::new();
        for group in groups {
            let (countries, source) = split_group(group)?;
            for country in countries.split(',').map(str::trim).filter(|c| !c.is_empty()) {
                let country = country.to_uppercase();
                info!(country = %country, source = %source, "source override configured");
                table.insert(country, source.to_string());
            }
        }

        Ok(Self {
            overrides: table,
            country_header: country_header.to_string(),
            source_header: source_header.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }

    /// Override configured for an ISO2 country.
    pub fn lookup(&self, country: &str) -> Option<&str> {
        self.overrides.get(&country.to_uppercase()).map(String::as_str)
    }

    /// Apply the override for the message's country, if any. Returns the
    /// source address written.
    pub fn apply(&self, message: &mut Message) -> Option<String> {
        let Some(country) = message.header_text(&self.country_header) else {
            debug!(header = %self.country_header, "country header not present");
            return None;
        };

        let source = self.lookup(&country)?.to_string();
        debug!(country = %country, source = %source, "overriding source address");
        message.set_header(&self.source_header, source.as_str());
        Some(source)
    }
}

fn split_group(group: &str) -> Result<(&str, &str), ConfigError> {
    let mut parts = group.split(':');
    let countries = parts.next().unwrap_or_default();
    let source = parts
        .next()
        .ok_or_else(|| ConfigError::MissingColon(group.to_string()))?;
    if parts.next().is_some() {
        return Err(ConfigError::TooManyColons(group.to_string()));
    }

    let source = source.trim();
    if source.is_empty() {
        return Err(ConfigError::EmptySource(group.to_string()));
    }
    Ok((countries, source))
}
