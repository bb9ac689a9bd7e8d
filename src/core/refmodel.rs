//! Layer 1: predictive reference model.
//!
//! A minimal address-to-value store queried and mutated at acceptance time,
//! never at completion time. Two same-address accesses observe each other in
//! acceptance order even when their completions reorder.

use std::collections::HashMap;

use super::types::Addr;

/// Last-written-value store.
#[derive(Clone, Debug, Default)]
pub struct RefModel {
    cells: HashMap<Addr, u64>,
}

impl RefModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accepted write. Unconditionally overwrites.
    pub fn on_write(&mut self, addr: Addr, value: u64) {
        self.cells.insert(addr, value);
    }

    /// Predict the outcome of an accepted read: the last written value, or
    /// zero if the address was never written.
    pub fn on_read(&self, addr: Addr) -> u64 {
        self.cells.get(&addr).copied().unwrap_or(0)
    }

    /// Number of addresses ever written.
    pub fn written_cells(&self) -> usize {
        self.cells.len()
    }
}
