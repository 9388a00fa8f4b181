//! # Connection Record
//!
//! Per-connection state owned by the registry. The custom error snapshot
//! is immutable after creation. The call context is replaced on every call
//! and guarded by its own mutex.
//!
//! Calls on one connection are serialized through the record's call gate:
//! a call holds a [`CallGuard`] from the moment it installs its context
//! until it has reported its result. Finalization retires the record under
//! the same gate, so it waits for the in-flight call and no later call can
//! run on the retired record.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use hashudr_core::{ConnectionId, CustomErrorSet, HostError};
use hashudr_host::{ExecutionContext, StatusSink, TransactionHandle};

/// Status sink, execution context and transaction of the current call.
#[derive(Default)]
struct CallContext {
    status: Option<Arc<dyn StatusSink>>,
    context: Option<Arc<dyn ExecutionContext>>,
    transaction: Option<TransactionHandle>,
}

/// Resources of one connection.
pub struct ConnectionResources {
    connection_id: ConnectionId,
    custom_errors: CustomErrorSet,
    call_context: Mutex<CallContext>,
    /// `true` once the record has been retired by finalization.
    call_gate: Mutex<bool>,
}

/// Exclusive access to a record for the duration of one call.
#[must_use = "the call is only exclusive while the guard is held"]
pub struct CallGuard<'r> {
    _gate: MutexGuard<'r, bool>,
}

impl fmt::Debug for CallGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CallGuard")
    }
}

impl ConnectionResources {
    pub fn new(connection_id: ConnectionId, custom_errors: CustomErrorSet) -> Self {
        Self {
            connection_id,
            custom_errors,
            call_context: Mutex::new(CallContext::default()),
            call_gate: Mutex::new(false),
        }
    }

    /// Wait for exclusive access to the record for one call.
    ///
    /// Returns `None` once the record has been retired.
    pub fn begin_call(&self) -> Option<CallGuard<'_>> {
        let gate = self.call_gate.lock();
        if *gate {
            return None;
        }
        Some(CallGuard { _gate: gate })
    }

    /// Retire the record, waiting for an in-flight call to finish first.
    pub fn retire(&self) {
        *self.call_gate.lock() = true;
        let mut call = self.call_context.lock();
        *call = CallContext::default();
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// The custom error snapshot taken at creation.
    pub fn custom_errors(&self) -> &CustomErrorSet {
        &self.custom_errors
    }

    /// Number and message of the custom error `name`, if the connection
    /// defines it.
    pub fn lookup_error(&self, name: &str) -> Option<(i32, &str)> {
        self.custom_errors.lookup(name)
    }

    /// Install the status sink and execution context of a new call.
    ///
    /// `None` keeps the previous value. The cached transaction is always
    /// cleared.
    pub fn refresh_call_context(
        &self,
        status: Option<Arc<dyn StatusSink>>,
        context: Option<Arc<dyn ExecutionContext>>,
    ) {
        let mut call = self.call_context.lock();
        if let Some(status) = status {
            call.status = Some(status);
        }
        if let Some(context) = context {
            call.context = Some(context);
        }
        call.transaction = None;
    }

    pub fn status(&self) -> Option<Arc<dyn StatusSink>> {
        self.call_context.lock().status.clone()
    }

    pub fn context(&self) -> Option<Arc<dyn ExecutionContext>> {
        self.call_context.lock().context.clone()
    }

    /// The transaction of the current call.
    ///
    /// An explicit handle replaces the cached one. Otherwise the cached
    /// handle is returned, or fetched from the execution context and cached
    /// until the next [`refresh_call_context`](Self::refresh_call_context).
    pub fn current_transaction(
        &self,
        explicit: Option<TransactionHandle>,
    ) -> Result<TransactionHandle, HostError> {
        let mut call = self.call_context.lock();
        if let Some(tx) = explicit {
            call.transaction = Some(tx);
            return Ok(tx);
        }
        if let Some(tx) = call.transaction {
            return Ok(tx);
        }
        let context = call
            .context
            .as_ref()
            .ok_or_else(|| HostError::new("transaction", "no execution context bound"))?;
        let tx = context.transaction()?;
        call.transaction = Some(tx);
        Ok(tx)
    }

    /// Whether a transaction handle is cached.
    pub fn has_cached_transaction(&self) -> bool {
        self.call_context.lock().transaction.is_some()
    }
}

impl fmt::Debug for ConnectionResources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let call = self.call_context.lock();
        f.debug_struct("ConnectionResources")
            .field("connection_id", &self.connection_id)
            .field("custom_errors", &self.custom_errors)
            .field("has_status", &call.status.is_some())
            .field("has_context", &call.context.is_some())
            .field("transaction", &call.transaction)
            .finish()
    }
}
