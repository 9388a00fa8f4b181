//! # hashudr-registry — Connection Resource Registry
//!
//! One loaded library instance serves many connections. The registry owns
//! one [`ConnectionResources`] record per connection identity: the custom
//! error snapshot read from the host catalog when the record is created,
//! and the mutable call context of the connection's current call.
//!
//! ## Architecture
//!
//! - **Registry** (`registry.rs`): concurrent map from [`ConnectionId`]
//!   to record, with per-identity critical sections for creation, lookup
//!   and finalization.
//!
//! - **Record** (`record.rs`): the per-connection state.
//!
//! - **Catalog** (`catalog.rs`): the one-time custom error query and the
//!   single decoder of its row buffer.
//!
//! ## Lifecycle
//!
//! ```text
//! resolve_or_create ──▶ [record] ──▶ get / begin_call ... ──▶ finalize (retire)
//!        │
//!        └─ catalog failure: nothing inserted, next call retries
//! ```
//!
//! [`ConnectionId`]: hashudr_core::ConnectionId

pub mod catalog;
pub mod record;
pub mod registry;

pub use record::{CallGuard, ConnectionResources};
pub use registry::ConnectionRegistry;
