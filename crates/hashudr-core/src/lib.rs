//! # hashudr-core — Foundational Types for hashudr
//!
//! hashudr computes a textual digest ("key") over a value handed to it by a
//! database host, on behalf of many connections that share one loaded
//! library instance. This crate holds the types every other crate agrees on
//! and depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Closed algorithm enumeration.** [`HashAlgorithm`] is the only way to
//!    name a digest. The numeric selector received from the host is converted
//!    exactly once, through [`HashAlgorithm::from_selector`], and every
//!    consumer matches exhaustively.
//!
//! 2. **Newtype identity.** Connections are identified by [`ConnectionId`],
//!    never by a bare `u64`.
//!
//! 3. **One error taxonomy.** [`UdrError`] enumerates every failure a call can
//!    surface. Codec-level errors in other crates are translated into it at
//!    the point where their meaning is known.
//!
//! 4. **Bounded custom error catalog.** [`CustomErrorSet`] is a fixed-size,
//!    name-keyed snapshot; its capacity is a const generic so raising the
//!    bound does not restructure anything.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `hashudr-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod algorithm;
pub mod config;
pub mod custom_error;
pub mod error;
pub mod hex;
pub mod identity;

// Re-export primary types for ergonomic imports.
pub use algorithm::{HashAlgorithm, SELECTOR_NONE};
pub use config::{ConfigError, UdrConfig, DEFAULT_ERROR_NAME, DEFAULT_ERROR_PREFIX};
pub use custom_error::{CustomErrorEntry, CustomErrorSet, TRACKED_ERRORS};
pub use error::{HostError, UdrError};
pub use identity::ConnectionId;

/// Maximum length, in characters, of a key returned to the host.
///
/// The host declares the function result as `VARCHAR(128)`.
pub const MAX_KEY_LENGTH: usize = 128;
