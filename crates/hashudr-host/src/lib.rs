//! # hashudr-host — Host Boundary
//!
//! Everything hashudr consumes from the database host, expressed as Rust
//! capabilities rather than raw ABI pointers.
//!
//! ## Architecture
//!
//! - **Context** (`context.rs`): the capability traits. An
//!   [`ExecutionContext`] answers the identity query, supplies the active
//!   transaction, runs read-only queries and opens blobs.
//!
//! - **Message** (`message.rs`): typed access to the host's fixed-width
//!   message buffers (function input and query rows) through a
//!   [`MessageLayout`].
//!
//! - **Info** (`info.rs`): the tagged info-block carrying the attachment id.
//!
//! - **Status** (`status.rs`): the structured error vector handed back to
//!   the host's error channel.
//!
//! - **Blob** (`blob.rs`): the Stream Reader. Reads a blob segment by
//!   segment into one contiguous buffer, releasing the handle on every path.
//!
//! - **Memory** (`memory.rs`, feature `memory`): an in-process host used by
//!   the test suites and the CLI.
//!
//! ## Crate Policy
//!
//! - Depends only on `hashudr-core` internally.
//! - Codec errors stay local ([`LayoutError`], [`InfoError`]); callers
//!   translate them into `UdrError` where their meaning is known.
//! - No `unsafe` code.

pub mod blob;
pub mod context;
pub mod info;
#[cfg(feature = "memory")]
pub mod memory;
pub mod message;
pub mod status;

pub use blob::read_all;
pub use context::{
    BlobId, BlobSource, ExecutionContext, ResultCursor, Segment, StatusSink, TransactionHandle,
};
pub use info::InfoError;
#[cfg(feature = "memory")]
pub use memory::{Failure, HostStats, MemoryHost, RecordingStatus};
pub use message::{FieldDescriptor, LayoutError, MessageLayout, MessageWriter, SqlType};
pub use status::{StatusArg, StatusCode, StatusVector};
