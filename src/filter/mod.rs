//! Outbound filters.
//!
//! - Destination blacklist
//! - Per-country source overrides
//! - Send throttling

mod blacklist;
mod ratelimit;
mod source_override;

pub use blacklist::BlacklistFilter;
pub use ratelimit::{RateLimitConfig, RateLimiter};
pub use source_override::SourceOverrideResolver;
