//! # Registry
//!
//! Concurrent map from [`ConnectionId`] to [`ConnectionResources`].
//!
//! ## Concurrency
//!
//! Each identity owns a slot: a mutex around the (possibly not yet
//! created) record. The map's shard lock is held only long enough to find
//! or insert a slot, so identities that share a shard never wait on each
//! other's host I/O. Creation, lookup and finalization of the *same*
//! identity serialize on its slot, which gives:
//!
//! - exactly one catalog query per identity, however many first calls race;
//! - no partially visible record;
//! - finalization never interleaves with an in-flight creation.
//!
//! Lock order is always slot, then shard.
//!
//! ## Ownership
//!
//! Records are handed out as `Arc`s for the duration of one call. Callers
//! go through [`ConnectionRegistry::get`] on every call, never keep a
//! record across calls, and run the call under
//! [`ConnectionResources::begin_call`]. `finalize` retires the record under
//! that same gate, so it never overlaps a call and nothing runs on the
//! record afterwards.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use hashudr_core::config::{DEFAULT_ERROR_NAME, DEFAULT_ERROR_PREFIX};
use hashudr_core::{ConnectionId, UdrConfig, UdrError};
use hashudr_host::info::{decode_attachment_id, ATTACHMENT_ID_REQUEST};
use hashudr_host::ExecutionContext;

use crate::catalog::load_custom_errors;
use crate::record::ConnectionResources;

type Slot = Arc<Mutex<Option<Arc<ConnectionResources>>>>;

/// Owner of every connection record of one library instance.
pub struct ConnectionRegistry {
    slots: DashMap<ConnectionId, Slot>,
    error_prefix: String,
    error_name: String,
}

impl ConnectionRegistry {
    /// An empty registry using the default catalog prefix and error name.
    pub fn new() -> Self {
        Self::with_error_catalog(DEFAULT_ERROR_PREFIX, DEFAULT_ERROR_NAME)
    }

    /// An empty registry configured from `config`.
    pub fn from_config(config: &UdrConfig) -> Self {
        Self::with_error_catalog(&config.error_prefix, &config.error_name)
    }

    fn with_error_catalog(prefix: &str, name: &str) -> Self {
        Self {
            slots: DashMap::new(),
            error_prefix: prefix.to_string(),
            error_name: name.to_string(),
        }
    }

    /// Name of the tracked custom error.
    pub fn error_name(&self) -> &str {
        &self.error_name
    }

    /// Ask the host which connection `context` belongs to.
    pub fn identify(context: &dyn ExecutionContext) -> Result<ConnectionId, UdrError> {
        let response = context
            .attachment_info(&ATTACHMENT_ID_REQUEST)
            .map_err(|e| UdrError::IdentityLookup(e.to_string()))?;
        let raw = decode_attachment_id(&response)
            .map_err(|e| UdrError::IdentityLookup(e.to_string()))?;
        Ok(ConnectionId::new(raw))
    }

    /// Identify the connection of `context` and make sure it has a record.
    ///
    /// The first call for an identity runs the custom error catalog query.
    /// If that fails nothing is inserted and the next call tries again.
    pub fn resolve_or_create(&self, context: &dyn ExecutionContext) -> Result<ConnectionId, UdrError> {
        let id = Self::identify(context)?;
        loop {
            let slot = Arc::clone(self.slots.entry(id).or_default().value());
            let mut record = slot.lock();
            if !self.is_registered(id, &slot) {
                // Finalized or abandoned while we waited; start over.
                continue;
            }
            if record.is_some() {
                tracing::debug!(connection_id = %id, "connection already registered");
                return Ok(id);
            }

            let loaded = context
                .transaction()
                .map_err(|e| UdrError::CatalogQuery(e.to_string()))
                .and_then(|tx| {
                    load_custom_errors(context, tx, &self.error_prefix, &self.error_name)
                });
            return match loaded {
                Ok(custom_errors) => {
                    *record = Some(Arc::new(ConnectionResources::new(id, custom_errors)));
                    tracing::info!(connection_id = %id, "connection resources created");
                    Ok(id)
                }
                Err(err) => {
                    self.slots.remove_if(&id, |_, s| Arc::ptr_eq(s, &slot));
                    tracing::warn!(connection_id = %id, error = %err, "connection resources not created");
                    Err(err)
                }
            };
        }
    }

    /// The record of `id`, if one exists.
    pub fn get(&self, id: ConnectionId) -> Option<Arc<ConnectionResources>> {
        let slot = self.slot(id)?;
        let record = slot.lock();
        record.clone()
    }

    /// Remove and retire the record of `id`. Returns whether one existed.
    ///
    /// Waits for a call in flight on the record; calls that obtained the
    /// record earlier but have not started yet are refused.
    pub fn finalize(&self, id: ConnectionId) -> bool {
        let Some(slot) = self.slot(id) else {
            return false;
        };
        let removed = {
            let mut record = slot.lock();
            let removed = record.take();
            self.slots.remove_if(&id, |_, s| Arc::ptr_eq(s, &slot));
            removed
        };
        let Some(resources) = removed else {
            return false;
        };
        resources.retire();
        tracing::info!(connection_id = %id, "connection resources finalized");
        true
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.all_slots()
            .iter()
            .filter(|slot| slot.lock().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identities with a live record.
    pub fn connections(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<ConnectionId> = self
            .slots
            .iter()
            .map(|entry| *entry.key())
            .collect();
        ids.retain(|id| self.get(*id).is_some());
        ids.sort();
        ids
    }

    fn slot(&self, id: ConnectionId) -> Option<Slot> {
        self.slots.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    fn all_slots(&self) -> Vec<Slot> {
        self.slots
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    fn is_registered(&self, id: ConnectionId, slot: &Slot) -> bool {
        self.slots
            .get(&id)
            .is_some_and(|entry| Arc::ptr_eq(entry.value(), slot))
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("connections", &self.len())
            .field("error_prefix", &self.error_prefix)
            .field("error_name", &self.error_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    use hashudr_core::CustomErrorEntry;
    use hashudr_host::memory::{Failure, MemoryHost};

    #[test]
    fn first_call_creates_record() {
        let registry = ConnectionRegistry::new();
        let host = MemoryHost::new(10)
            .with_custom_error(CustomErrorEntry::new(DEFAULT_ERROR_NAME, 5, "custom"));
        let id = registry.resolve_or_create(&host).unwrap();
        assert_eq!(id, ConnectionId::new(10));
        let record = registry.get(id).unwrap();
        assert_eq!(record.lookup_error(DEFAULT_ERROR_NAME), Some((5, "custom")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn second_call_skips_catalog() {
        let registry = ConnectionRegistry::new();
        let host = MemoryHost::new(10);
        registry.resolve_or_create(&host).unwrap();
        registry.resolve_or_create(&host).unwrap();
        let stats = host.stats();
        assert_eq!(stats.identity_queries, 2);
        assert_eq!(stats.catalog_queries, 1);
    }

    #[test]
    fn finalize_then_get_is_absent() {
        let registry = ConnectionRegistry::new();
        let host = MemoryHost::new(3);
        let id = registry.resolve_or_create(&host).unwrap();
        assert!(registry.finalize(id));
        assert!(registry.get(id).is_none());
        assert!(registry.is_empty());
        assert!(!registry.finalize(id));
    }

    #[test]
    fn finalize_unknown_is_noop() {
        let registry = ConnectionRegistry::new();
        assert!(!registry.finalize(ConnectionId::new(404)));
    }

    #[test]
    fn failed_catalog_fetch_closes_cursor_and_inserts_nothing() {
        let registry = ConnectionRegistry::new();
        let host = MemoryHost::new(6);
        host.inject(Failure::CatalogFetch);
        assert!(matches!(
            registry.resolve_or_create(&host),
            Err(UdrError::CatalogQuery(_))
        ));
        assert_eq!(host.stats().cursors_closed, 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn catalog_failure_inserts_nothing_and_retries() {
        let registry = ConnectionRegistry::new();
        let host = MemoryHost::new(4);
        host.inject(Failure::Catalog { times: 1 });

        let err = registry.resolve_or_create(&host).unwrap_err();
        assert!(matches!(err, UdrError::CatalogQuery(_)));
        assert!(registry.get(ConnectionId::new(4)).is_none());
        assert_eq!(registry.connections(), Vec::<ConnectionId>::new());

        registry.resolve_or_create(&host).unwrap();
        assert!(registry.get(ConnectionId::new(4)).is_some());
        assert_eq!(host.stats().catalog_queries, 2);
    }

    #[test]
    fn identity_failures() {
        let registry = ConnectionRegistry::new();
        let host = MemoryHost::new(4);
        host.inject(Failure::Identity);
        assert!(matches!(
            registry.resolve_or_create(&host),
            Err(UdrError::IdentityLookup(_))
        ));
        host.clear_failures();
        host.inject(Failure::GarbledIdentity);
        assert!(matches!(
            registry.resolve_or_create(&host),
            Err(UdrError::IdentityLookup(_))
        ));
        assert!(registry.is_empty());
        assert_eq!(host.stats().catalog_queries, 0);
    }

    #[test]
    fn transaction_failure_during_creation_is_catalog_error() {
        let registry = ConnectionRegistry::new();
        let host = MemoryHost::new(4);
        host.inject(Failure::Transaction);
        assert!(matches!(
            registry.resolve_or_create(&host),
            Err(UdrError::CatalogQuery(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn configured_error_catalog() {
        let config = UdrConfig {
            error_prefix: "KEY$".to_string(),
            error_name: "KEY$FAILED".to_string(),
            ..UdrConfig::default()
        };
        let registry = ConnectionRegistry::from_config(&config);
        let host = MemoryHost::new(8)
            .with_custom_error(CustomErrorEntry::new("KEY$FAILED", 77, "nope"))
            .with_custom_error(CustomErrorEntry::new(DEFAULT_ERROR_NAME, 5, "default"));
        let id = registry.resolve_or_create(&host).unwrap();
        let record = registry.get(id).unwrap();
        assert_eq!(record.lookup_error("KEY$FAILED"), Some((77, "nope")));
        assert_eq!(record.lookup_error(DEFAULT_ERROR_NAME), None);
        assert_eq!(registry.error_name(), "KEY$FAILED");
    }

    #[test]
    fn concurrent_first_calls_create_one_record() {
        const THREADS: usize = 8;
        let registry = Arc::new(ConnectionRegistry::new());
        let host = Arc::new(MemoryHost::new(55).with_catalog_delay(Duration::from_millis(20)));
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let host = Arc::clone(&host);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    registry.resolve_or_create(host.as_ref()).unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), ConnectionId::new(55));
        }
        assert_eq!(registry.len(), 1);
        assert_eq!(host.stats().catalog_queries, 1);
    }

    #[test]
    fn distinct_connections_proceed_independently() {
        let registry = Arc::new(ConnectionRegistry::new());
        let handles: Vec<_> = (1..=16u64)
            .map(|n| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    let host = MemoryHost::new(n);
                    let id = registry.resolve_or_create(&host).unwrap();
                    assert_eq!(registry.get(id).unwrap().connection_id(), id);
                    id
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.len(), 16);
        assert!(registry.finalize(ConnectionId::new(7)));
        assert_eq!(registry.connections().len(), 15);
    }

    #[test]
    fn finalize_waits_for_in_flight_call() {
        let registry = Arc::new(ConnectionRegistry::new());
        let host = MemoryHost::new(2);
        let id = registry.resolve_or_create(&host).unwrap();
        let in_flight = registry.get(id).unwrap();
        let call = in_flight.begin_call().unwrap();

        let finalizer = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.finalize(id))
        };
        thread::sleep(Duration::from_millis(50));
        assert!(!finalizer.is_finished());
        // Unreachable for new calls even before the in-flight one ends.
        assert!(registry.get(id).is_none());

        drop(call);
        assert!(finalizer.join().unwrap());
        assert!(in_flight.begin_call().is_none());
    }

    #[test]
    fn record_obtained_before_finalize_refuses_the_call() {
        let registry = ConnectionRegistry::new();
        let host = MemoryHost::new(2);
        let id = registry.resolve_or_create(&host).unwrap();
        let stale = registry.get(id).unwrap();
        assert!(registry.finalize(id));
        assert_eq!(stale.connection_id(), id);
        assert!(stale.begin_call().is_none());
    }

    #[test]
    fn debug_reports_count() {
        let registry = ConnectionRegistry::new();
        registry.resolve_or_create(&MemoryHost::new(1)).unwrap();
        assert!(format!("{registry:?}").contains("connections: 1"));
    }
}
