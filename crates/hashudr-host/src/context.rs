//! # Host Capabilities
//!
//! The traits through which hashudr talks to the database host. A host
//! adapter implements them over the real engine API; [`crate::memory`]
//! implements them in-process.
//!
//! All calls are synchronous and block the calling thread. None of them is
//! retried by hashudr.

use hashudr_core::HostError;

use crate::message::MessageLayout;
use crate::status::StatusVector;

/// Opaque handle to a host transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionHandle(u64);

impl TransactionHandle {
    /// Wrap a raw host handle.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw host handle.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Identifier of a stored blob: the host's 8-byte quad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlobId {
    /// Relation-scoped high word.
    pub high: i32,
    /// Record-scoped low word.
    pub low: u32,
}

impl BlobId {
    /// Size of the encoded quad in a message buffer.
    pub const ENCODED_LEN: usize = 8;

    /// Create a blob id from its two words.
    pub const fn new(high: i32, low: u32) -> Self {
        Self { high, low }
    }

    /// Encode as stored in a message buffer (both words little-endian).
    pub fn to_bytes(self) -> [u8; Self::ENCODED_LEN] {
        let mut out = [0u8; Self::ENCODED_LEN];
        out[..4].copy_from_slice(&self.high.to_le_bytes());
        out[4..].copy_from_slice(&self.low.to_le_bytes());
        out
    }

    /// Decode from the message-buffer representation.
    pub fn from_bytes(bytes: [u8; Self::ENCODED_LEN]) -> Self {
        Self {
            high: i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            low: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }
    }
}

/// Outcome of one segment fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    /// A whole segment of `n` bytes was delivered.
    Complete(usize),
    /// `n` bytes were delivered and more data of the same segment follows.
    Partial(usize),
    /// End of blob.
    NoData,
}

/// An open blob handle.
pub trait BlobSource: Send {
    /// Fill the front of `buffer` with the next chunk.
    fn get_segment(&mut self, buffer: &mut [u8]) -> Result<Segment, HostError>;

    /// Close the handle after a successful read.
    fn close(&mut self) -> Result<(), HostError>;

    /// Abandon the handle. Called on every path that does not reach
    /// [`close`](Self::close); must not fail.
    fn cancel(&mut self);
}

/// An open cursor over a read-only query.
pub trait ResultCursor: Send {
    /// Layout of each row buffer.
    fn layout(&self) -> &MessageLayout;

    /// Fetch the next row into `row`. Returns `false` at end of data.
    fn fetch_next(&mut self, row: &mut [u8]) -> Result<bool, HostError>;

    /// Release the cursor.
    fn close(&mut self) -> Result<(), HostError>;
}

/// The host-side context of one call.
pub trait ExecutionContext: Send + Sync {
    /// Answer an info request for the current attachment.
    fn attachment_info(&self, items: &[u8]) -> Result<Vec<u8>, HostError>;

    /// The transaction the call runs in.
    fn transaction(&self) -> Result<TransactionHandle, HostError>;

    /// Execute a read-only statement and open a cursor over its rows.
    fn open_cursor(
        &self,
        transaction: TransactionHandle,
        sql: &str,
    ) -> Result<Box<dyn ResultCursor>, HostError>;

    /// Open a stored blob for reading.
    fn open_blob(
        &self,
        transaction: TransactionHandle,
        blob_id: BlobId,
    ) -> Result<Box<dyn BlobSource>, HostError>;
}

/// The host's error-reporting channel for one call.
pub trait StatusSink: Send + Sync {
    /// Report an error. The host raises it once the call returns.
    fn set_errors(&self, status: &StatusVector);
}
