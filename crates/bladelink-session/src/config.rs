use std::time::Duration;

use crate::error::{Result, SessionError};

/// TCP port of the device's routing protocol service.
pub const DEFAULT_PORT: u16 = 93;

/// Settings for one device session.
///
/// Supplied by the caller; the manager never reads the environment or
/// persisted settings itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Device host name or IP address.
    pub host: String,
    /// Device TCP port.
    pub port: u16,
    /// How often to send a `<>` heartbeat. Zero disables both the heartbeat
    /// and silence detection.
    pub heartbeat_interval: Duration,
    /// Silence on the inbound side for this long marks the link dead.
    pub heartbeat_timeout: Duration,
    /// Fixed delay before each reconnect attempt.
    pub reconnect_delay: Duration,
    /// Upper bound for a single TCP connect attempt.
    pub connect_timeout: Duration,
    /// Reconnect after socket errors instead of settling in `Disconnected`.
    pub retry_on_error: bool,
    /// Stop retrying after this many consecutive failed attempts.
    /// `None` retries forever.
    pub max_reconnect_attempts: Option<u32>,
    /// Send `<SYS?>` right after connecting.
    pub identify_on_connect: bool,
    /// When set, announce `<SYS|IFID:name>` right after connecting.
    pub client_name: Option<String>,
}

impl SessionConfig {
    /// Config for `host:port` with default timings.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Override the heartbeat interval.
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Whether heartbeats and silence detection run while connected.
    pub fn heartbeat_enabled(&self) -> bool {
        !self.heartbeat_interval.is_zero()
    }

    /// `host:port` for logs and error messages.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Reject settings that cannot produce a working session.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(SessionError::InvalidConfig("host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(SessionError::InvalidConfig("port must be non-zero".into()));
        }
        if self.connect_timeout.is_zero() {
            return Err(SessionError::InvalidConfig(
                "connect timeout must be non-zero".into(),
            ));
        }
        if self.heartbeat_enabled() && self.heartbeat_interval >= self.heartbeat_timeout {
            return Err(SessionError::InvalidConfig(format!(
                "heartbeat interval {:?} must be shorter than timeout {:?}",
                self.heartbeat_interval, self.heartbeat_timeout
            )));
        }
        if let Some(name) = &self.client_name {
            if name.is_empty() || name.contains(['\r', '\n']) {
                return Err(SessionError::InvalidConfig(
                    "client name must be a non-empty single line".into(),
                ));
            }
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            heartbeat_interval: Duration::from_secs(1),
            heartbeat_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(5),
            retry_on_error: true,
            max_reconnect_attempts: None,
            identify_on_connect: true,
            client_name: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_device_timings() {
        let config = SessionConfig::new("10.0.0.5", DEFAULT_PORT);
        assert_eq!(config.heartbeat_timeout, Duration::from_secs(10));
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
        assert!(config.heartbeat_enabled());
        assert!(config.retry_on_error);
        assert_eq!(config.address(), "10.0.0.5:93");
        config.validate().unwrap();
    }

    #[test]
    fn zero_interval_disables_heartbeat() {
        let config = SessionConfig::new("blade", 93).with_heartbeat_interval(Duration::ZERO);
        assert!(!config.heartbeat_enabled());
        config.validate().unwrap();
    }

    #[test]
    fn rejects_unusable_settings() {
        assert!(SessionConfig::new("", 93).validate().is_err());
        assert!(SessionConfig::new("blade", 0).validate().is_err());

        let slow_heartbeat =
            SessionConfig::new("blade", 93).with_heartbeat_interval(Duration::from_secs(10));
        assert!(matches!(
            slow_heartbeat.validate(),
            Err(SessionError::InvalidConfig(_))
        ));

        let bad_name = SessionConfig {
            client_name: Some("two\nlines".into()),
            ..SessionConfig::new("blade", 93)
        };
        assert!(bad_name.validate().is_err());

        let no_connect_timeout = SessionConfig {
            connect_timeout: Duration::ZERO,
            ..SessionConfig::new("blade", 93)
        };
        assert!(no_connect_timeout.validate().is_err());
    }
}
