//! Configuration types

use chrono::{FixedOffset, NaiveTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::common::errors::{ClientError, Result};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Brokerage gateway configuration
    #[serde(default)]
    pub broker: BrokerConfig,
    /// Chat notification configuration
    #[serde(default)]
    pub notify: NotifyConfig,
    /// Position table configuration (optional, in-memory when absent)
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    /// Session and indicator parameters
    #[serde(default)]
    pub strategy: StrategyConfig,
    /// General application settings
    #[serde(default)]
    pub settings: AppSettings,
}

impl AppConfig {
    /// Check the values the engine relies on
    pub fn validate(&self) -> Result<()> {
        self.strategy.validate()?;
        if self.settings.targets.is_empty() {
            return Err(ClientError::Configuration(
                "at least one target contract is required".to_string(),
            ));
        }
        if self.settings.poll_interval_seconds == 0 {
            return Err(ClientError::Configuration(
                "poll_interval_seconds must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Brokerage gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// API key used for login and request signing
    #[serde(default)]
    pub api_key: Option<String>,
    /// Secret key (base64 encoded)
    #[serde(default)]
    pub secret_key: Option<String>,
    /// Base URL of the gateway REST API
    #[serde(default = "default_broker_url")]
    pub base_url: String,
    /// Route orders to the simulation environment
    #[serde(default = "default_simulation")]
    pub simulation: bool,
    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            secret_key: None,
            base_url: default_broker_url(),
            simulation: default_simulation(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl BrokerConfig {
    /// Credentials, if both halves are configured
    pub fn credentials(&self) -> Option<ApiCredentials> {
        match (&self.api_key, &self.secret_key) {
            (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => {
                Some(ApiCredentials::new(key.clone(), secret.clone()))
            }
            _ => None,
        }
    }
}

fn default_broker_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_simulation() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    30
}

/// Chat notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Push endpoint
    #[serde(default = "default_push_url")]
    pub push_url: String,
    /// Channel access token; notifications are disabled without it
    #[serde(default)]
    pub access_token: Option<String>,
    /// Recipient user id
    #[serde(default)]
    pub recipient: Option<String>,
    /// Push timeout in seconds
    #[serde(default = "default_push_timeout")]
    pub timeout_seconds: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            push_url: default_push_url(),
            access_token: None,
            recipient: None,
            timeout_seconds: default_push_timeout(),
        }
    }
}

fn default_push_url() -> String {
    "https://api.line.me/v2/bot/message/push".to_string()
}

fn default_push_timeout() -> u64 {
    10
}

/// Database configuration for the position table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Connection timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_seconds: u64,
}

fn default_max_connections() -> u32 {
    5
}

fn default_connection_timeout() -> u64 {
    30
}

/// Parameters of one trading session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionParams {
    /// Human readable label used in reports
    pub label: String,
    /// Bar label (local time, `HH:MM:SS`) at which the baseline is sampled
    pub anchor: String,
    /// Entry threshold in index points
    pub gap: Decimal,
    /// Stop-loss distance in index points
    pub stop_loss: Decimal,
}

impl SessionParams {
    /// Parsed anchor time
    pub fn anchor_time(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(&self.anchor, "%H:%M:%S").map_err(|e| {
            ClientError::Configuration(format!("invalid anchor '{}': {}", self.anchor, e))
        })
    }
}

/// Session and indicator parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    #[serde(default = "default_day_session")]
    pub day: SessionParams,
    #[serde(default = "default_night_session")]
    pub night: SessionParams,
    /// First local hour of the day session (inclusive)
    #[serde(default = "default_day_start_hour")]
    pub day_start_hour: u32,
    /// Local hour at which the day session ends (exclusive)
    #[serde(default = "default_day_end_hour")]
    pub day_end_hour: u32,
    /// Moving average window in bars
    #[serde(default = "default_ma_window")]
    pub ma_window: usize,
    /// Bar width in minutes
    #[serde(default = "default_bar_minutes")]
    pub bar_minutes: u32,
    /// Exchange offset from UTC in hours
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            day: default_day_session(),
            night: default_night_session(),
            day_start_hour: default_day_start_hour(),
            day_end_hour: default_day_end_hour(),
            ma_window: default_ma_window(),
            bar_minutes: default_bar_minutes(),
            utc_offset_hours: default_utc_offset_hours(),
        }
    }
}

impl StrategyConfig {
    /// Exchange time zone
    pub fn offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).ok_or_else(|| {
            ClientError::Configuration(format!(
                "utc_offset_hours out of range: {}",
                self.utc_offset_hours
            ))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.ma_window == 0 {
            return Err(ClientError::Configuration("ma_window must be positive".into()));
        }
        if self.bar_minutes == 0 || 1440 % self.bar_minutes != 0 {
            return Err(ClientError::Configuration(format!(
                "bar_minutes must divide a day evenly: {}",
                self.bar_minutes
            )));
        }
        if self.day_start_hour >= self.day_end_hour || self.day_end_hour > 24 {
            return Err(ClientError::Configuration(format!(
                "invalid day session hours: {}..{}",
                self.day_start_hour, self.day_end_hour
            )));
        }
        self.day.anchor_time()?;
        self.night.anchor_time()?;
        self.offset()?;
        Ok(())
    }
}

fn default_day_session() -> SessionParams {
    SessionParams {
        label: "day".to_string(),
        anchor: "05:00:00".to_string(),
        gap: dec!(74),
        stop_loss: dec!(89),
    }
}

fn default_night_session() -> SessionParams {
    SessionParams {
        label: "night".to_string(),
        anchor: "13:45:00".to_string(),
        gap: dec!(61),
        stop_loss: dec!(68),
    }
}

fn default_day_start_hour() -> u32 {
    8
}

fn default_day_end_hour() -> u32 {
    14
}

fn default_ma_window() -> usize {
    21
}

fn default_bar_minutes() -> u32 {
    5
}

fn default_utc_offset_hours() -> i32 {
    8
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Contracts to evaluate
    #[serde(default = "default_targets")]
    pub targets: Vec<String>,
    /// Delay between polling iterations in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            targets: default_targets(),
            poll_interval_seconds: default_poll_interval(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_targets() -> Vec<String> {
    vec!["MXF202603".to_string(), "MXF202604".to_string()]
}

fn default_poll_interval() -> u64 {
    30
}

/// API credentials for the brokerage
#[derive(Debug, Clone)]
pub struct ApiCredentials {
    pub api_key: String,
    pub secret_key: String,
}

impl ApiCredentials {
    pub fn new(api_key: String, secret_key: String) -> Self {
        Self {
            api_key,
            secret_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.strategy.day.gap, dec!(74));
        assert_eq!(config.strategy.night.anchor, "13:45:00");
        assert_eq!(config.settings.poll_interval_seconds, 30);
    }

    #[test]
    fn test_invalid_anchor_rejected() {
        let mut config = AppConfig::default();
        config.strategy.night.anchor = "13:45".to_string();
        assert!(matches!(
            config.validate(),
            Err(ClientError::Configuration(_))
        ));
    }

    #[test]
    fn test_invalid_session_hours_rejected() {
        let mut config = AppConfig::default();
        config.strategy.day_start_hour = 14;
        config.strategy.day_end_hour = 8;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_targets_rejected() {
        let mut config = AppConfig::default();
        config.settings.targets.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_credentials_require_both_halves() {
        let mut broker = BrokerConfig::default();
        assert!(broker.credentials().is_none());
        broker.api_key = Some("key".into());
        assert!(broker.credentials().is_none());
        broker.secret_key = Some("secret".into());
        assert!(broker.credentials().is_some());
    }
}
