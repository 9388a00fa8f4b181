//! # Library Configuration
//!
//! Tunables for one loaded library instance. Defaults reproduce the
//! host-facing contract; override via environment variables or explicit
//! construction for testing.

use crate::hex;

/// Namespace prefix of the custom exceptions this library reads.
pub const DEFAULT_ERROR_PREFIX: &str = "HASH$";

/// The single well-known custom exception name.
pub const DEFAULT_ERROR_NAME: &str = "HASH$HASHUDR_ERROR";

/// Default blob segment size in bytes.
pub const DEFAULT_SEGMENT_SIZE: usize = 32768;

/// Largest segment the host's blob API can deliver in one call.
pub const MAX_SEGMENT_SIZE: usize = 65535;

/// Default tracing filter directive.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Configuration for a library instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdrConfig {
    /// Bytes requested per blob segment fetch.
    pub segment_size: usize,
    /// Prefix used to select custom exceptions from the host catalog.
    pub error_prefix: String,
    /// Name of the custom exception that overrides the generic error.
    pub error_name: String,
    /// SipHash key. All zero by default, which makes SipHash keys public
    /// and collision-predictable.
    pub siphash_key: [u8; 16],
    /// `tracing` filter directive used when the module installs a subscriber.
    pub log_filter: String,
}

impl Default for UdrConfig {
    fn default() -> Self {
        Self {
            segment_size: DEFAULT_SEGMENT_SIZE,
            error_prefix: DEFAULT_ERROR_PREFIX.to_string(),
            error_name: DEFAULT_ERROR_NAME.to_string(),
            siphash_key: [0u8; 16],
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl UdrConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `HASHUDR_SEGMENT_SIZE` (default: 32768, range 1..=65535)
    /// - `HASHUDR_ERROR_PREFIX` (default: `HASH$`)
    /// - `HASHUDR_ERROR_NAME` (default: `HASH$HASHUDR_ERROR`)
    /// - `HASHUDR_SIPHASH_KEY` (default: 32 hex zeros)
    /// - `HASHUDR_LOG` (default: `warn`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let segment_size = match lookup("HASHUDR_SEGMENT_SIZE") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|e| ConfigError::Invalid {
                var: "HASHUDR_SEGMENT_SIZE",
                reason: e.to_string(),
            })?,
            None => defaults.segment_size,
        };

        let siphash_key = match lookup("HASHUDR_SIPHASH_KEY") {
            Some(raw) => parse_siphash_key(raw.trim())?,
            None => defaults.siphash_key,
        };

        let config = Self {
            segment_size,
            error_prefix: lookup("HASHUDR_ERROR_PREFIX").unwrap_or(defaults.error_prefix),
            error_name: lookup("HASHUDR_ERROR_NAME").unwrap_or(defaults.error_name),
            siphash_key,
            log_filter: lookup("HASHUDR_LOG").unwrap_or(defaults.log_filter),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants of an explicitly constructed configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.segment_size == 0 || self.segment_size > MAX_SEGMENT_SIZE {
            return Err(ConfigError::Invalid {
                var: "HASHUDR_SEGMENT_SIZE",
                reason: format!(
                    "{} is outside 1..={MAX_SEGMENT_SIZE}",
                    self.segment_size
                ),
            });
        }
        if self.error_prefix.is_empty() {
            return Err(ConfigError::Invalid {
                var: "HASHUDR_ERROR_PREFIX",
                reason: "must not be empty".to_string(),
            });
        }
        if !self.error_name.starts_with(&self.error_prefix) {
            return Err(ConfigError::Invalid {
                var: "HASHUDR_ERROR_NAME",
                reason: format!(
                    "{:?} does not start with prefix {:?}",
                    self.error_name, self.error_prefix
                ),
            });
        }
        Ok(())
    }

    /// Whether SipHash runs with the all-zero key.
    pub fn uses_default_siphash_key(&self) -> bool {
        self.siphash_key == [0u8; 16]
    }
}

fn parse_siphash_key(raw: &str) -> Result<[u8; 16], ConfigError> {
    let bytes = hex::decode(raw).map_err(|reason| ConfigError::Invalid {
        var: "HASHUDR_SIPHASH_KEY",
        reason,
    })?;
    let len = bytes.len();
    bytes.try_into().map_err(|_| ConfigError::Invalid {
        var: "HASHUDR_SIPHASH_KEY",
        reason: format!("expected 16 bytes (32 hex chars), got {len} bytes"),
    })
}

/// Configuration errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}
