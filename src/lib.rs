//! Routes SMS between a message queue and an SMPP gateway.
//!
//! Outbound messages are classified, filtered, re-sourced, throttled and
//! sent; failures land on a dead-letter queue. Mobile-originated messages
//! from the gateway are normalized and published to an inbound queue.

pub mod bootstrap;
pub mod broker;
pub mod config;
pub mod error;
pub mod events;
pub mod filter;
pub mod gateway;
pub mod message;
pub mod number;
pub mod pipeline;
pub mod telemetry;
