//! # Stream Reader
//!
//! Materializes a stored blob into one contiguous buffer.
//!
//! ## Security Invariant
//!
//! The blob handle is released on every path: [`BlobSource::close`] after a
//! complete read, [`BlobSource::cancel`] (via the guard's `Drop`) when the
//! read fails part way.

use hashudr_core::config::MAX_SEGMENT_SIZE;
use hashudr_core::{HostError, UdrError};

use crate::context::{BlobId, BlobSource, ExecutionContext, Segment, TransactionHandle};

/// Read the whole blob `blob_id`, `segment_size` bytes per fetch.
///
/// Segment sizes outside `1..=65535` are clamped into that range.
pub fn read_all(
    context: &dyn ExecutionContext,
    transaction: TransactionHandle,
    blob_id: BlobId,
    segment_size: usize,
) -> Result<Vec<u8>, UdrError> {
    let source = context
        .open_blob(transaction, blob_id)
        .map_err(UdrError::BlobRead)?;
    let mut guard = BlobGuard::new(source);

    let mut segment = vec![0u8; segment_size.clamp(1, MAX_SEGMENT_SIZE)];
    let mut data = Vec::new();
    let mut fetches = 0usize;
    loop {
        let n = match guard.source().get_segment(&mut segment).map_err(UdrError::BlobRead)? {
            Segment::Complete(n) | Segment::Partial(n) => n,
            Segment::NoData => break,
        };
        let chunk = segment.get(..n).ok_or_else(|| {
            UdrError::BlobRead(HostError::new(
                "get_segment",
                format!("segment of {n} bytes exceeds buffer of {}", segment.len()),
            ))
        })?;
        data.extend_from_slice(chunk);
        fetches += 1;
    }

    guard.close().map_err(UdrError::BlobRead)?;
    tracing::debug!(bytes = data.len(), fetches, "blob read");
    Ok(data)
}

/// Cancels the handle on drop unless it was closed.
struct BlobGuard {
    source: Box<dyn BlobSource>,
    released: bool,
}

impl BlobGuard {
    fn new(source: Box<dyn BlobSource>) -> Self {
        Self {
            source,
            released: false,
        }
    }

    fn source(&mut self) -> &mut dyn BlobSource {
        self.source.as_mut()
    }

    fn close(&mut self) -> Result<(), HostError> {
        // A failed close counts as released; the host owns the handle state.
        self.released = true;
        self.source.close()
    }
}

impl Drop for BlobGuard {
    fn drop(&mut self) {
        if !self.released {
            self.source.cancel();
        }
    }
}
