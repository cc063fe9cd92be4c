use serde::Deserialize;
use std::time::Duration;

/// Root configuration for smsrouter
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Routing rules
    #[serde(default)]
    pub router: RouterConfig,

    /// Queue names
    #[serde(default)]
    pub queues: QueueConfig,

    /// Gateway connection
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Logging
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Shutdown behaviour
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

/// Routing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RouterConfig {
    /// Default region for locally supplied numbers
    #[serde(default = "default_local_country")]
    pub local_country: String,

    /// Default region for national numbers supplied by the SMSC
    #[serde(default = "default_smsc_country")]
    pub smsc_country: String,

    /// `;`-separated forbidden destination countries
    #[serde(default = "default_blacklist_countries")]
    pub blacklist_countries: String,

    /// `;`-separated `countries:source` groups
    #[serde(default = "default_source_overrides")]
    pub source_overrides: String,

    /// Number of outbound workers sharing the throttle
    #[serde(default = "default_outbound_workers")]
    pub outbound_workers: usize,

    /// Outbound send throttle
    #[serde(default)]
    pub throttle: ThrottleConfig,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            local_country: default_local_country(),
            smsc_country: default_smsc_country(),
            blacklist_countries: default_blacklist_countries(),
            source_overrides: default_source_overrides(),
            outbound_workers: default_outbound_workers(),
            throttle: ThrottleConfig::default(),
        }
    }
}

fn default_local_country() -> String {
    "CH".to_string()
}

fn default_smsc_country() -> String {
    "GB".to_string()
}

fn default_blacklist_countries() -> String {
    "CI;GF;GP;MQ;NC;PF;RE".to_string()
}

fn default_source_overrides() -> String {
    "US,CA:+16461234567".to_string()
}

fn default_outbound_workers() -> usize {
    1
}

/// Throttle configuration
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ThrottleConfig {
    /// Window length
    #[serde(default = "default_throttle_period", with = "humantime_serde")]
    pub period: Duration,

    /// Sends allowed per window
    #[serde(default = "default_max_per_period")]
    pub max_per_period: u32,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            period: default_throttle_period(),
            max_per_period: default_max_per_period(),
        }
    }
}

fn default_throttle_period() -> Duration {
    Duration::from_millis(1000)
}

fn default_max_per_period() -> u32 {
    1
}

/// Queue names
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Messages to send to the gateway
    #[serde(default = "default_outbound_queue")]
    pub outbound: String,

    /// Messages that could not or must not be sent
    #[serde(default = "default_dead_letter_queue")]
    pub dead_letter: String,

    /// Messages received from the gateway
    #[serde(default = "default_inbound_queue")]
    pub inbound: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            outbound: default_outbound_queue(),
            dead_letter: default_dead_letter_queue(),
            inbound: default_inbound_queue(),
        }
    }
}

fn default_outbound_queue() -> String {
    "smsrouter.outbox".to_string()
}

fn default_dead_letter_queue() -> String {
    "smsrouter.outbox.failed".to_string()
}

fn default_inbound_queue() -> String {
    "smsrouter.inbox".to_string()
}

/// Gateway connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_host")]
    pub host: String,

    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// SMPP system_id
    #[serde(default)]
    pub system_id: String,

    /// SMPP password
    #[serde(default)]
    pub password: String,

    /// System type
    #[serde(default)]
    pub system_type: String,

    /// Keep-alive interval
    #[serde(default = "default_enquire_link", with = "humantime_serde")]
    pub enquire_link: Duration,

    /// Mock mode - answer sends locally
    #[serde(default)]
    pub mock: Option<MockConfig>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            system_id: String::new(),
            password: String::new(),
            system_type: String::new(),
            enquire_link: default_enquire_link(),
            mock: None,
        }
    }
}

fn default_gateway_host() -> String {
    "localhost".to_string()
}

fn default_gateway_port() -> u16 {
    2775
}

fn default_enquire_link() -> Duration {
    Duration::from_secs(30)
}

/// Mock response configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MockConfig {
    /// Response type
    #[serde(default)]
    pub response: MockResponse,

    /// Simulated latency
    #[serde(default, with = "humantime_serde")]
    pub latency: Duration,
}

/// Mock response type
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MockResponse {
    #[default]
    Success,
    Error { code: u32 },
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// Enable structured JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            json_logs: false,
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Shutdown configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ShutdownConfig {
    /// How long in-flight messages may take to finish once draining
    #[serde(default = "default_drain_timeout", with = "humantime_serde")]
    pub drain_timeout: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            drain_timeout: default_drain_timeout(),
        }
    }
}

fn default_drain_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Humantime serde support module
mod humantime_serde {
    use serde::{self, Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
