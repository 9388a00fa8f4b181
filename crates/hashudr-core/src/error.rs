//! # Error Types — The Call Failure Taxonomy
//!
//! Every failure a `key` call can end in is a [`UdrError`] variant. The call
//! entry point catches all of them and converts them into the host's error
//! surface; none escapes as a panic.
//!
//! ## Design
//!
//! - The variant identifies the failing step (selector, extraction, blob
//!   read, connection binding). The payload is the human-readable detail that
//!   ends up in the message text reported to the caller.
//! - Host capability failures are carried as [`HostError`] inside the
//!   variant of the step that invoked the host.

use thiserror::Error;

use crate::algorithm::HashAlgorithm;
use crate::identity::ConnectionId;

/// Failure of a single `key` call.
#[derive(Error, Debug)]
pub enum UdrError {
    /// The selector is null, the "none" sentinel, or outside the enumeration.
    #[error("invalid hash method: {0}")]
    InvalidAlgorithm(String),

    /// The selector names a declared but unimplemented algorithm.
    #[error("{} method is not supported ({algorithm})", .algorithm.family())]
    UnsupportedAlgorithm {
        /// The algorithm that was requested.
        algorithm: HashAlgorithm,
    },

    /// Inline text in a character set other than NONE, or a blob whose
    /// sub-type is not binary.
    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// The value parameter is neither [VAR]CHAR nor BLOB.
    #[error("unsupported datatype: {0}")]
    UnsupportedDatatype(String),

    /// Opening, reading or closing the blob failed.
    #[error("error reading blob: {0}")]
    BlobRead(#[source] HostError),

    /// The host could not report the connection's attachment id.
    #[error("connection identity lookup failed: {0}")]
    IdentityLookup(String),

    /// The one-time custom error catalog query failed.
    #[error("custom error catalog query failed: {0}")]
    CatalogQuery(String),

    /// A call arrived for a connection with no resource record.
    #[error("connection resources undefined for {0}")]
    ResourcesUndefined(ConnectionId),

    /// The input message could not be decoded.
    #[error("malformed input message: {0}")]
    MalformedMessage(String),

    /// The computed key does not fit the result slot.
    #[error("key of {0} characters exceeds the result bound of {max}", max = crate::MAX_KEY_LENGTH)]
    KeyOverflow(usize),
}

/// Failure reported by a host capability (query, blob, transaction).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{operation} failed: {message}")]
pub struct HostError {
    /// The host operation that failed (e.g. `"open_blob"`).
    pub operation: &'static str,
    /// The host's description of the failure.
    pub message: String,
}

impl HostError {
    /// Create a host error for the named operation.
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}
