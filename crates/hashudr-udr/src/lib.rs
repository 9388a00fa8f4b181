//! # hashudr-udr — The Function Module
//!
//! Exposes `key(hash_selector, value) -> VARCHAR(128)` to the database host.
//! A [`HashUdr`] module bundles what all connections of one loaded library
//! share: the configuration, the [`ConnectionRegistry`] and the
//! [`DigestEngine`].
//!
//! ## Architecture
//!
//! - **Function** (`function.rs`): [`KeyFunction`], the per-call state
//!   machine and the connection binding lifecycle.
//!
//! - **Exception** (`exception.rs`): [`UdrException`], the error surface
//!   handed to the host's status channel.
//!
//! - **Telemetry** (`telemetry.rs`): optional `tracing-subscriber` bootstrap
//!   for hosts that do not install their own. Nothing here calls it
//!   implicitly; the host adapter decides through
//!   [`HashUdr::init_telemetry`].
//!
//! ## Usage
//!
//! ```ignore
//! let module = HashUdr::global();
//! module.init_telemetry();
//! let function = KeyFunction::new(module, status.clone(), context.clone(), input_layout)?;
//! let key = function.execute(status, context, &input_message)?;
//! ```

pub mod exception;
pub mod function;
pub mod telemetry;

use std::fmt;
use std::sync::{Arc, OnceLock};

use hashudr_core::{ConfigError, UdrConfig, UdrError};
use hashudr_digest::DigestEngine;
use hashudr_host::{ExecutionContext, MessageLayout, StatusSink};
use hashudr_registry::{ConnectionRegistry, ConnectionResources};

pub use exception::UdrException;
pub use function::KeyFunction;

/// State shared by every connection of one library instance.
pub struct HashUdr {
    config: UdrConfig,
    registry: ConnectionRegistry,
    engine: DigestEngine,
}

impl HashUdr {
    /// An isolated module with an explicit configuration.
    pub fn with_config(config: UdrConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    /// The process-wide module, created on first use.
    ///
    /// Configuration comes from the environment; an invalid environment is
    /// logged and the defaults are used. No subscriber is installed.
    pub fn global() -> &'static HashUdr {
        static GLOBAL: OnceLock<HashUdr> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            let loaded = UdrConfig::from_env();
            let config = loaded.as_ref().cloned().unwrap_or_default();
            if let Err(err) = &loaded {
                tracing::warn!(error = %err, "invalid hashudr environment, using defaults");
            }
            tracing::info!(segment_size = config.segment_size, "hashudr module loaded");
            Self::build(config)
        })
    }

    fn build(config: UdrConfig) -> Self {
        Self {
            registry: ConnectionRegistry::from_config(&config),
            engine: DigestEngine::from_config(&config),
            config,
        }
    }

    /// Install a `fmt` subscriber using the configured log filter.
    ///
    /// For host adapters whose process has no subscriber of its own.
    /// Returns `false` when one was already installed.
    pub fn init_telemetry(&self) -> bool {
        telemetry::init(&self.config.log_filter)
    }

    pub fn config(&self) -> &UdrConfig {
        &self.config
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn engine(&self) -> &DigestEngine {
        &self.engine
    }

    /// Prepare a `key` function for the connection of `context`.
    pub fn key_function(
        &self,
        status: Arc<dyn StatusSink>,
        context: Arc<dyn ExecutionContext>,
        input: MessageLayout,
    ) -> Result<KeyFunction<'_>, UdrError> {
        KeyFunction::new(self, status, context, input)
    }

    /// Report `error` through `status` and return what was raised.
    pub(crate) fn raise(
        &self,
        error: &UdrError,
        status: &dyn StatusSink,
        resources: Option<&ConnectionResources>,
    ) -> UdrException {
        let exception = UdrException::from_error(error, self.registry.error_name(), resources);
        tracing::warn!(
            connection_id = ?resources.map(ConnectionResources::connection_id),
            error = %error,
            custom = exception.number().is_some(),
            "key call failed"
        );
        status.set_errors(&exception.to_status());
        exception
    }
}

impl fmt::Debug for HashUdr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashUdr")
            .field("segment_size", &self.config.segment_size)
            .field("registry", &self.registry)
            .field("engine", &self.engine)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_config_is_rejected() {
        let config = UdrConfig {
            segment_size: 0,
            ..UdrConfig::default()
        };
        assert!(HashUdr::with_config(config).is_err());
    }

    #[test]
    fn global_is_a_singleton() {
        let a = HashUdr::global() as *const HashUdr;
        let b = HashUdr::global() as *const HashUdr;
        assert_eq!(a, b);
    }

    #[test]
    fn debug_hides_siphash_key() {
        let config = UdrConfig {
            siphash_key: [0x5a; 16],
            ..UdrConfig::default()
        };
        let module = HashUdr::with_config(config).unwrap();
        let rendered = format!("{module:?}");
        assert!(rendered.contains("segment_size: 32768"));
        assert!(!rendered.contains("90, 90"));
    }
}
