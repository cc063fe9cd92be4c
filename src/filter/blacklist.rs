//! Destination country blacklist.

use std::collections::HashSet;

use tracing::debug;

use crate::message::Message;

const SEPARATOR: char = ';';

/// Set of forbidden country tokens, matched case-insensitively against a
/// message header.
#[derive(Debug, Clone)]
pub struct BlacklistFilter {
    tokens: HashSet<String>,
    header: String,
}

impl BlacklistFilter {
    /// Build from a `;`-separated list such as `"CI;GF;GP"`.
    pub fn new(countries: &str, header: &str) -> Self {
        let tokens = countries
            .split(SEPARATOR)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
            .collect();

        Self {
            tokens,
            header: header.to_string(),
        }
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// `true` if the header is present and its value is blacklisted. An
    /// absent header never matches.
    pub fn is_blacklisted(&self, message: &Message) -> bool {
        let Some(value) = message.header_text(&self.header) else {
            return false;
        };

        let value = value.to_lowercase();
        let hit = self.tokens.contains(&value);
        if hit {
            debug!(header = %self.header, value = %value, "header value is blacklisted");
        }
        hit
    }
}
