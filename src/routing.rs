//! The finger table, predecessor, and next-finger cursor, grouped into a
//! single structure protected by one lock.
//!
//! The teacher's `Routing<T>` grouped a current/predecessor/successor triple
//! plus a finger table behind one struct; this keeps that shape but drops
//! the generic `T`/`Identify` machinery (this ring's addresses are always
//! [`Address`], never a bare `SocketAddr`), and folds the successor into
//! `finger_table[0]` per the spec's data model instead of storing it
//! separately.

use crate::identifier::{in_open_interval, Identifier, M};
use crate::message::Address;

/// The mutable routing state of a node: finger table, predecessor, and the
/// cursor `fix_fingers` uses to know which entry to refresh next.
///
/// Every field here is read by lookups and written by maintenance or
/// `NOTIFY`; callers are expected to guard this behind a single `Mutex` and
/// never hold that lock across network I/O.
pub struct RoutingTable {
    finger_table: Vec<Option<Address>>,
    predecessor: Option<Address>,
    next_finger_cursor: usize,
}

impl RoutingTable {
    /// Builds a fresh table: all fingers unset, no predecessor, cursor at 0.
    pub fn new() -> Self {
        RoutingTable {
            finger_table: vec![None; M as usize],
            predecessor: None,
            next_finger_cursor: 0,
        }
    }

    /// Returns the successor, `finger_table[0]`.
    pub fn successor(&self) -> Option<&Address> {
        self.finger_table[0].as_ref()
    }

    /// Sets the successor, `finger_table[0]`.
    pub fn set_successor(&mut self, addr: Address) {
        self.finger_table[0] = Some(addr);
    }

    /// Returns the predecessor, if set.
    pub fn predecessor(&self) -> Option<&Address> {
        self.predecessor.as_ref()
    }

    /// Sets the predecessor.
    pub fn set_predecessor(&mut self, addr: Address) {
        self.predecessor = Some(addr);
    }

    /// Clears the predecessor (used by `check_predecessor` on failure).
    pub fn clear_predecessor(&mut self) {
        self.predecessor = None;
    }

    /// Returns finger entry `i`.
    pub fn finger(&self, i: usize) -> Option<&Address> {
        self.finger_table[i].as_ref()
    }

    /// Sets finger entry `i`.
    pub fn set_finger(&mut self, i: usize, addr: Address) {
        self.finger_table[i] = Some(addr);
    }

    /// Returns the finger the next `fix_fingers` call should refresh.
    pub fn next_finger_cursor(&self) -> usize {
        self.next_finger_cursor
    }

    /// Advances the cursor cyclically, `(i + 1) mod M`.
    pub fn advance_finger_cursor(&mut self) {
        self.next_finger_cursor = (self.next_finger_cursor + 1) % M as usize;
    }

    /// Scans fingers `M-1` down to `0`, returning the first set finger whose
    /// key lies strictly between `self_key` and `target_id`. Returns `None`
    /// if no finger qualifies, leaving the caller to fall back to its own
    /// address (the terminating case of `find_successor`).
    pub fn closest_preceding_finger(
        &self,
        self_key: Identifier,
        target_id: Identifier,
    ) -> Option<&Address> {
        for i in (0..M as usize).rev() {
            if let Some(addr) = &self.finger_table[i] {
                if in_open_interval(self_key, target_id, addr.key) {
                    return Some(addr);
                }
            }
        }
        None
    }
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self::new()
    }
}
