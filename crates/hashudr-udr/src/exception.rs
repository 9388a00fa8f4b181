//! # Error Surface
//!
//! Every failure of a call is reported through the host's status channel,
//! never as a returned value. A connection that defines the tracked custom
//! exception gets it (with its number); otherwise the generic named error is
//! raised. In both forms the free text is the failing step's message.

use std::fmt;

use serde::Serialize;

use hashudr_core::UdrError;
use hashudr_host::{StatusCode, StatusVector};
use hashudr_registry::ConnectionResources;

/// The error raised to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UdrException {
    /// The connection's own exception.
    Custom {
        number: i32,
        name: String,
        /// Message text defined in the catalog.
        catalog_message: String,
        message: String,
    },
    /// The library's generic named error.
    Generic { name: String, message: String },
}

impl UdrException {
    /// Select the form for `error`, consulting the connection's snapshot
    /// when a record is available.
    pub fn from_error(
        error: &UdrError,
        error_name: &str,
        resources: Option<&ConnectionResources>,
    ) -> Self {
        let message = error.to_string();
        match resources.and_then(|r| r.lookup_error(error_name)) {
            Some((number, catalog_message)) => Self::Custom {
                number,
                name: error_name.to_string(),
                catalog_message: catalog_message.to_string(),
                message,
            },
            None => Self::Generic {
                name: error_name.to_string(),
                message,
            },
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Custom { name, .. } | Self::Generic { name, .. } => name,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Custom { message, .. } | Self::Generic { message, .. } => message,
        }
    }

    /// Custom exception number, if any.
    pub fn number(&self) -> Option<i32> {
        match self {
            Self::Custom { number, .. } => Some(*number),
            Self::Generic { .. } => None,
        }
    }

    /// Status vector for the host.
    ///
    /// Custom: `Except(number), ExceptionName(name), Random(message)`.
    /// Generic: `ExceptionName(name), Random(message)`.
    pub fn to_status(&self) -> StatusVector {
        let mut status = StatusVector::new();
        if let Self::Custom { number, .. } = self {
            status.push_number(StatusCode::Except, *number);
        }
        status
            .push_text(StatusCode::ExceptionName, self.name())
            .push_text(StatusCode::Random, self.message());
        status
    }
}

impl fmt::Display for UdrException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom {
                number,
                name,
                message,
                ..
            } => write!(f, "{name} ({number}): {message}"),
            Self::Generic { name, message } => write!(f, "{name}: {message}"),
        }
    }
}
