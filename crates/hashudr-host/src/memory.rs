//! # In-Memory Host
//!
//! An [`ExecutionContext`] backed by process memory: a fixed attachment id,
//! a custom-error catalog, stored blobs and one active transaction.
//!
//! Every capability call is counted so tests can assert on side effects
//! (how many catalog queries ran, whether a blob handle was released), and
//! each capability can be made to fail through [`MemoryHost::inject`].

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};

use hashudr_core::{CustomErrorEntry, HostError};

use crate::context::{
    BlobId, BlobSource, ExecutionContext, ResultCursor, Segment, StatusSink, TransactionHandle,
};
use crate::info::{self, ATTACHMENT_ID_REQUEST};
use crate::message::{MessageLayout, MessageWriter, SqlType};
use crate::status::StatusVector;

/// Layout of a catalog row: `(name VARCHAR(63), number INTEGER, message VARCHAR(1023))`.
pub fn catalog_layout() -> MessageLayout {
    MessageLayout::builder()
        .field("NAME", SqlType::Varying, 63)
        .field("NUMBER", SqlType::Long, 0)
        .field("MESSAGE", SqlType::Varying, 1023)
        .build()
}

/// A failure to inject into the next matching capability call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// The info request fails.
    Identity,
    /// The info request answers with an unexpected tag.
    GarbledIdentity,
    /// Fetching the active transaction fails.
    Transaction,
    /// The next `times` catalog queries fail.
    Catalog { times: usize },
    /// Fetching a catalog row fails.
    CatalogFetch,
    /// Opening a blob fails.
    BlobOpen,
    /// Segment fetches fail once this many segments were delivered.
    SegmentAfter(usize),
    /// Closing a blob fails.
    BlobClose,
}

#[derive(Debug, Default)]
struct FailurePlan {
    identity: bool,
    garbled_identity: bool,
    transaction: bool,
    catalog: usize,
    catalog_fetch: bool,
    blob_open: bool,
    segment_after: Option<usize>,
    blob_close: bool,
}

#[derive(Debug, Default)]
struct Counters {
    identity_queries: AtomicUsize,
    transaction_lookups: AtomicUsize,
    catalog_queries: AtomicUsize,
    cursors_closed: AtomicUsize,
    blobs_opened: AtomicUsize,
    blobs_closed: AtomicUsize,
    blobs_cancelled: AtomicUsize,
}

/// Point-in-time copy of a host's call counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostStats {
    pub identity_queries: usize,
    pub transaction_lookups: usize,
    /// Catalog queries attempted, failed ones included.
    pub catalog_queries: usize,
    pub cursors_closed: usize,
    pub blobs_opened: usize,
    pub blobs_closed: usize,
    pub blobs_cancelled: usize,
}

/// In-process host for one attachment.
#[derive(Debug)]
pub struct MemoryHost {
    attachment_id: u64,
    transaction: TransactionHandle,
    catalog: Vec<CustomErrorEntry>,
    blobs: RwLock<HashMap<BlobId, Arc<[u8]>>>,
    next_blob: AtomicU32,
    partial_segments: bool,
    catalog_delay: Option<Duration>,
    blob_open_delay: Option<Duration>,
    failures: Mutex<FailurePlan>,
    counters: Arc<Counters>,
}

impl MemoryHost {
    /// A host whose attachment answers the identity query with `attachment_id`.
    pub fn new(attachment_id: u64) -> Self {
        Self {
            attachment_id,
            transaction: TransactionHandle::new(attachment_id.wrapping_mul(1000).wrapping_add(1)),
            catalog: Vec::new(),
            blobs: RwLock::new(HashMap::new()),
            next_blob: AtomicU32::new(1),
            partial_segments: false,
            catalog_delay: None,
            blob_open_delay: None,
            failures: Mutex::new(FailurePlan::default()),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Add a row to the custom-error catalog.
    pub fn with_custom_error(mut self, entry: CustomErrorEntry) -> Self {
        self.catalog.push(entry);
        self
    }

    /// Deliver blob data in half-buffer chunks flagged [`Segment::Partial`].
    pub fn with_partial_segments(mut self, enabled: bool) -> Self {
        self.partial_segments = enabled;
        self
    }

    /// Sleep before answering each catalog query.
    pub fn with_catalog_delay(mut self, delay: Duration) -> Self {
        self.catalog_delay = Some(delay);
        self
    }

    /// Sleep before answering each blob open.
    pub fn with_blob_open_delay(mut self, delay: Duration) -> Self {
        self.blob_open_delay = Some(delay);
        self
    }

    pub fn attachment_id(&self) -> u64 {
        self.attachment_id
    }

    /// Store a blob and return its id.
    pub fn add_blob(&self, data: impl Into<Vec<u8>>) -> BlobId {
        let id = BlobId::new(0, self.next_blob.fetch_add(1, Ordering::Relaxed));
        self.blobs.write().insert(id, Arc::from(data.into()));
        id
    }

    /// Arm a failure.
    pub fn inject(&self, failure: Failure) {
        let mut plan = self.failures.lock();
        match failure {
            Failure::Identity => plan.identity = true,
            Failure::GarbledIdentity => plan.garbled_identity = true,
            Failure::Transaction => plan.transaction = true,
            Failure::Catalog { times } => plan.catalog = times,
            Failure::CatalogFetch => plan.catalog_fetch = true,
            Failure::BlobOpen => plan.blob_open = true,
            Failure::SegmentAfter(n) => plan.segment_after = Some(n),
            Failure::BlobClose => plan.blob_close = true,
        }
    }

    /// Disarm every failure.
    pub fn clear_failures(&self) {
        *self.failures.lock() = FailurePlan::default();
    }

    pub fn stats(&self) -> HostStats {
        let c = &self.counters;
        HostStats {
            identity_queries: c.identity_queries.load(Ordering::SeqCst),
            transaction_lookups: c.transaction_lookups.load(Ordering::SeqCst),
            catalog_queries: c.catalog_queries.load(Ordering::SeqCst),
            cursors_closed: c.cursors_closed.load(Ordering::SeqCst),
            blobs_opened: c.blobs_opened.load(Ordering::SeqCst),
            blobs_closed: c.blobs_closed.load(Ordering::SeqCst),
            blobs_cancelled: c.blobs_cancelled.load(Ordering::SeqCst),
        }
    }
}

impl ExecutionContext for MemoryHost {
    fn attachment_info(&self, items: &[u8]) -> Result<Vec<u8>, HostError> {
        self.counters.identity_queries.fetch_add(1, Ordering::SeqCst);
        let plan = self.failures.lock();
        if plan.identity {
            return Err(HostError::new("attachment_info", "attachment is shutting down"));
        }
        if plan.garbled_identity {
            return Ok(vec![2, 1, 0, 0]);
        }
        if items != ATTACHMENT_ID_REQUEST {
            return Err(HostError::new(
                "attachment_info",
                format!("unsupported info items {items:?}"),
            ));
        }
        Ok(info::encode_attachment_id(self.attachment_id))
    }

    fn transaction(&self) -> Result<TransactionHandle, HostError> {
        self.counters.transaction_lookups.fetch_add(1, Ordering::SeqCst);
        if self.failures.lock().transaction {
            return Err(HostError::new("transaction", "no active transaction"));
        }
        Ok(self.transaction)
    }

    fn open_cursor(
        &self,
        transaction: TransactionHandle,
        sql: &str,
    ) -> Result<Box<dyn ResultCursor>, HostError> {
        self.counters.catalog_queries.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.catalog_delay {
            std::thread::sleep(delay);
        }
        let fail_fetch = {
            let mut plan = self.failures.lock();
            if plan.catalog > 0 {
                plan.catalog -= 1;
                return Err(HostError::new("open_cursor", "catalog is unavailable"));
            }
            plan.catalog_fetch
        };
        if transaction != self.transaction {
            return Err(HostError::new("open_cursor", "unknown transaction"));
        }
        let rows = match starting_with_prefix(sql) {
            Some(prefix) => self
                .catalog
                .iter()
                .filter(|entry| entry.name.starts_with(&prefix))
                .cloned()
                .collect(),
            None => self.catalog.iter().cloned().collect(),
        };
        Ok(Box::new(MemoryCursor {
            layout: catalog_layout(),
            rows,
            fail_fetch,
            counters: Arc::clone(&self.counters),
        }))
    }

    fn open_blob(
        &self,
        transaction: TransactionHandle,
        blob_id: BlobId,
    ) -> Result<Box<dyn BlobSource>, HostError> {
        if let Some(delay) = self.blob_open_delay {
            std::thread::sleep(delay);
        }
        let plan = self.failures.lock();
        if plan.blob_open {
            return Err(HostError::new("open_blob", "blob storage is unavailable"));
        }
        if transaction != self.transaction {
            return Err(HostError::new("open_blob", "unknown transaction"));
        }
        let data = self
            .blobs
            .read()
            .get(&blob_id)
            .cloned()
            .ok_or_else(|| HostError::new("open_blob", format!("no blob {blob_id:?}")))?;
        self.counters.blobs_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryBlob {
            data,
            position: 0,
            delivered: 0,
            fail_after: plan.segment_after,
            fail_close: plan.blob_close,
            partial: self.partial_segments,
            counters: Arc::clone(&self.counters),
        }))
    }
}

/// Extract the literal of a `STARTING WITH '...'` predicate.
fn starting_with_prefix(sql: &str) -> Option<String> {
    const MARKER: &str = "STARTING WITH '";
    let start = sql.to_ascii_uppercase().find(MARKER)? + MARKER.len();
    let mut out = String::new();
    let mut chars = sql.get(start..)?.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\'' {
            if chars.peek() == Some(&'\'') {
                chars.next();
            } else {
                return Some(out);
            }
        }
        out.push(c);
    }
    None
}

struct MemoryCursor {
    layout: MessageLayout,
    rows: VecDeque<CustomErrorEntry>,
    fail_fetch: bool,
    counters: Arc<Counters>,
}

impl ResultCursor for MemoryCursor {
    fn layout(&self) -> &MessageLayout {
        &self.layout
    }

    fn fetch_next(&mut self, row: &mut [u8]) -> Result<bool, HostError> {
        if self.fail_fetch {
            return Err(HostError::new("fetch_next", "lost connection to catalog"));
        }
        let Some(entry) = self.rows.pop_front() else {
            return Ok(false);
        };
        let encode = |e: crate::message::LayoutError| HostError::new("fetch_next", e.to_string());
        let mut writer = MessageWriter::new(&self.layout);
        writer
            .write_text(0, entry.name.as_bytes())
            .map_err(encode)?
            .write_long(1, entry.number)
            .map_err(encode)?
            .write_text(2, entry.message.as_bytes())
            .map_err(encode)?;
        let bytes = writer.into_bytes();
        let target = row.get_mut(..bytes.len()).ok_or_else(|| {
            HostError::new("fetch_next", "row buffer shorter than message length")
        })?;
        target.copy_from_slice(&bytes);
        Ok(true)
    }

    fn close(&mut self) -> Result<(), HostError> {
        self.counters.cursors_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct MemoryBlob {
    data: Arc<[u8]>,
    position: usize,
    delivered: usize,
    fail_after: Option<usize>,
    fail_close: bool,
    partial: bool,
    counters: Arc<Counters>,
}

impl BlobSource for MemoryBlob {
    fn get_segment(&mut self, buffer: &mut [u8]) -> Result<Segment, HostError> {
        if self.fail_after == Some(self.delivered) {
            return Err(HostError::new("get_segment", "I/O error reading blob page"));
        }
        let remaining = self.data.len() - self.position;
        if remaining == 0 {
            return Ok(Segment::NoData);
        }
        let capacity = if self.partial {
            (buffer.len() / 2).max(1)
        } else {
            buffer.len()
        };
        let n = remaining.min(capacity);
        buffer[..n].copy_from_slice(&self.data[self.position..self.position + n]);
        self.position += n;
        self.delivered += 1;
        if self.partial && self.position < self.data.len() {
            Ok(Segment::Partial(n))
        } else {
            Ok(Segment::Complete(n))
        }
    }

    fn close(&mut self) -> Result<(), HostError> {
        if self.fail_close {
            return Err(HostError::new("close_blob", "handle already released"));
        }
        self.counters.blobs_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn cancel(&mut self) {
        self.counters.blobs_cancelled.fetch_add(1, Ordering::SeqCst);
    }
}

/// A [`StatusSink`] that keeps every status vector it receives.
#[derive(Debug, Default)]
pub struct RecordingStatus {
    received: Mutex<Vec<StatusVector>>,
}

impl RecordingStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent status, if any.
    pub fn last(&self) -> Option<StatusVector> {
        self.received.lock().last().cloned()
    }

    pub fn all(&self) -> Vec<StatusVector> {
        self.received.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.received.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.received.lock().is_empty()
    }
}

impl StatusSink for RecordingStatus {
    fn set_errors(&self, status: &StatusVector) {
        self.received.lock().push(status.clone());
    }
}
