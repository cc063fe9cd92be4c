//! Message model shared by every pipeline stage.
//!
//! A message is a set of named headers plus an opaque body. Headers are the
//! only channel stages use to hand data to each other: classification writes
//! `<name>E164` / `<name>CountryISO2`, addressing writes the gateway-native
//! `Smpp*` headers, and so on.

pub mod headers;

use std::collections::BTreeMap;
use std::fmt;

/// A single header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    Text(String),
    Int(i64),
}

impl HeaderValue {
    /// Integer view of the value. Text that parses as an integer is accepted.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Int(v) => write!(f, "{}", v),
        }
    }
}

impl From<String> for HeaderValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for HeaderValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<i64> for HeaderValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u8> for HeaderValue {
    fn from(v: u8) -> Self {
        Self::Int(i64::from(v))
    }
}

/// Message payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Text(String),
    Binary(Vec<u8>),
}

impl Body {
    /// Raw bytes of the payload.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(s) => s.as_bytes(),
            Self::Binary(b) => b,
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Binary(b) => f.write_str(&String::from_utf8_lossy(b)),
        }
    }
}

/// A message travelling through the router.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    headers: BTreeMap<String, HeaderValue>,
    body: Body,
}

impl Message {
    /// Create a message with a text body and no headers.
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            headers: BTreeMap::new(),
            body: Body::Text(body.into()),
        }
    }

    /// Create a message with a binary body and no headers.
    pub fn binary(body: Vec<u8>) -> Self {
        Self {
            headers: BTreeMap::new(),
            body: Body::Binary(body),
        }
    }

    /// Builder-style header setter.
    pub fn with_header(mut self, name: &str, value: impl Into<HeaderValue>) -> Self {
        self.set_header(name, value);
        self
    }

    pub fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.headers.get(name)
    }

    /// Header rendered as text.
    pub fn header_text(&self, name: &str) -> Option<String> {
        self.headers.get(name).map(ToString::to_string)
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains_key(name)
    }

    pub fn set_header(&mut self, name: &str, value: impl Into<HeaderValue>) {
        self.headers.insert(name.to_string(), value.into());
    }

    pub fn remove_header(&mut self, name: &str) -> Option<HeaderValue> {
        self.headers.remove(name)
    }

    /// Remove every header whose name starts with `prefix`. Returns how many
    /// were removed.
    pub fn remove_headers_with_prefix(&mut self, prefix: &str) -> usize {
        let before = self.headers.len();
        self.headers.retain(|name, _| !name.starts_with(prefix));
        before - self.headers.len()
    }

    pub fn headers(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn set_body(&mut self, body: Body) {
        self.body = body;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip() {
        let mut msg = Message::text("hello").with_header("SMSOrigin", "+41791234567");
        msg.set_header("SmppSourceAddrTon", 1u8);

        assert_eq!(msg.header_text("SMSOrigin").as_deref(), Some("+41791234567"));
        assert_eq!(msg.header("SmppSourceAddrTon").and_then(HeaderValue::as_int), Some(1));
        assert!(!msg.has_header("SMSDestination"));
    }

    #[test]
    fn test_int_from_text() {
        assert_eq!(HeaderValue::from("2").as_int(), Some(2));
        assert_eq!(HeaderValue::from("two").as_int(), None);
    }

    #[test]
    fn test_remove_prefix() {
        let mut msg = Message::text("x")
            .with_header("SmppId", "abc")
            .with_header("SmppDestAddr", "4179")
            .with_header("SMSOrigin", "+4179");

        assert_eq!(msg.remove_headers_with_prefix("Smpp"), 2);
        assert!(msg.has_header("SMSOrigin"));
        assert_eq!(msg.headers().count(), 1);
    }

    #[test]
    fn test_binary_body_display() {
        let msg = Message::binary(b"raw".to_vec());
        assert_eq!(msg.body().as_bytes(), b"raw");
        assert_eq!(msg.body().to_string(), "raw");
    }
}
