//! # Custom Error Catalog Snapshot
//!
//! A connection may define its own exceptions in the host catalog to
//! override the library's generic error. The registry reads them once per
//! connection into a [`CustomErrorSet`]: a fixed number of slots, each keyed
//! by a well-known exception name.
//!
//! ## Invariants
//!
//! - The set is a point-in-time snapshot; it is never refreshed.
//! - A slot with `number == 0` is undefined and lookups treat it as absent.
//! - Lookup is a linear scan over `N` slots. `N` is tiny (currently 1).

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_ERROR_NAME;

/// Exception names tracked by default, one slot each.
pub const TRACKED_ERRORS: [&str; 1] = [DEFAULT_ERROR_NAME];

/// One custom exception definition read from the host catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomErrorEntry {
    /// Exception name, trimmed.
    pub name: String,
    /// Exception number; `0` means "not defined".
    pub number: i32,
    /// Exception message text.
    pub message: String,
}

impl CustomErrorEntry {
    /// Create an entry.
    pub fn new(name: impl Into<String>, number: i32, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            number,
            message: message.into(),
        }
    }

    /// Whether the host actually defines this exception.
    pub fn is_defined(&self) -> bool {
        self.number != 0
    }
}

/// Fixed-size, name-keyed snapshot of a connection's custom exceptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomErrorSet<const N: usize = 1> {
    slots: [CustomErrorEntry; N],
}

impl<const N: usize> CustomErrorSet<N> {
    /// An empty set with one undefined slot per tracked name.
    pub fn tracking(names: [&str; N]) -> Self {
        Self {
            slots: names.map(|name| CustomErrorEntry::new(name, 0, String::new())),
        }
    }

    /// Store `entry` in the slot carrying its name.
    ///
    /// Returns `false` (and drops the entry) when no slot tracks that name or
    /// the slot is already defined; the first definition wins.
    pub fn fill(&mut self, entry: CustomErrorEntry) -> bool {
        match self
            .slots
            .iter_mut()
            .find(|slot| slot.name == entry.name && !slot.is_defined())
        {
            Some(slot) => {
                *slot = entry;
                true
            }
            None => false,
        }
    }

    /// Whether every slot holds a definition.
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(CustomErrorEntry::is_defined)
    }

    /// Look up a defined exception by name, returning its number and message.
    pub fn lookup(&self, name: &str) -> Option<(i32, &str)> {
        self.slots
            .iter()
            .find(|slot| slot.name == name)
            .filter(|slot| slot.is_defined())
            .map(|slot| (slot.number, slot.message.as_str()))
    }

    /// Exception number for `name`, or `0` when undefined.
    pub fn number(&self, name: &str) -> i32 {
        self.lookup(name).map_or(0, |(number, _)| number)
    }

    /// Iterate over all slots, defined or not.
    pub fn iter(&self) -> impl Iterator<Item = &CustomErrorEntry> {
        self.slots.iter()
    }

    /// Number of slots.
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl Default for CustomErrorSet<1> {
    fn default() -> Self {
        Self::tracking(TRACKED_ERRORS)
    }
}
