/*
 * This file is a part of Vaultd
 * Vaultd is a free and open-source in-memory key-value store
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

//! The TTL expiry index (spec.md §4.3)
//!
//! A min-heap of `(deadline, key)` paired with an authoritative
//! `key -> deadline` map. The heap is allowed to carry stale entries
//! left behind by rescheduling or deletion; on pop, each is validated
//! against the map and discarded silently if it no longer matches
//! (tombstone-by-mismatch).

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ExpiryIndex {
    #[serde(skip)]
    heap: BinaryHeap<Reverse<(i64, Vec<u8>)>>,
    deadlines: HashMap<Vec<u8>, i64>,
}

impl ExpiryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current wall-clock time, whole seconds since the epoch.
    pub fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before the epoch")
            .as_secs() as i64
    }

    /// Schedule (or reschedule) `key` to expire at `deadline`. Older
    /// heap entries for the same key are left in place; they become
    /// harmless stale pops once `deadlines[key]` no longer matches them.
    pub fn schedule(&mut self, key: Vec<u8>, deadline: i64) {
        self.heap.push(Reverse((deadline, key.clone())));
        self.deadlines.insert(key, deadline);
    }

    /// Drop any pending deadline for `key` (called on `SET`/`DELETE`).
    /// The map entry is removed; a stale heap entry, if any, self-cleans
    /// on pop.
    pub fn clear(&mut self, key: &[u8]) {
        self.deadlines.remove(key);
    }

    /// True if `key` has a deadline that has already passed.
    pub fn is_expired(&self, key: &[u8], now: i64) -> bool {
        matches!(self.deadlines.get(key), Some(d) if *d <= now)
    }

    /// Pop every heap entry with `deadline <= now`, returning the keys
    /// whose pop still matches the authoritative map (i.e. the ones
    /// that are genuinely due); those are removed from the map as well.
    /// Stale pops (rescheduled or already-deleted keys) are discarded.
    pub fn sweep(&mut self, now: i64) -> Vec<Vec<u8>> {
        let mut due = Vec::new();
        while let Some(Reverse((deadline, _))) = self.heap.peek() {
            if *deadline > now {
                break;
            }
            let Reverse((deadline, key)) = self.heap.pop().unwrap();
            if self.deadlines.get(&key) == Some(&deadline) {
                self.deadlines.remove(&key);
                due.push(key);
            }
        }
        due
    }

    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    /// Clone the authoritative deadline map, used by `SAVE`.
    pub fn deadlines_snapshot(&self) -> HashMap<Vec<u8>, i64> {
        self.deadlines.clone()
    }

    /// Rebuild the heap from the (deserialized) deadline map, used
    /// after `RESTORE`. Deadlines already in the past become
    /// candidates for the very next lazy sweep.
    pub fn rebuild_heap(&mut self) {
        self.heap = self
            .deadlines
            .iter()
            .map(|(k, d)| Reverse((*d, k.clone())))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_and_sweep() {
        let mut idx = ExpiryIndex::new();
        idx.schedule(b"k1".to_vec(), 100);
        assert!(idx.sweep(99).is_empty());
        assert_eq!(idx.sweep(100), vec![b"k1".to_vec()]);
    }

    #[test]
    fn test_reschedule_leaves_stale_heap_entry_harmless() {
        let mut idx = ExpiryIndex::new();
        idx.schedule(b"k1".to_vec(), 100);
        idx.schedule(b"k1".to_vec(), 200);
        // the stale (100, k1) pop must not evict k1 early
        assert!(idx.sweep(150).is_empty());
        assert_eq!(idx.sweep(200), vec![b"k1".to_vec()]);
    }

    #[test]
    fn test_clear_makes_heap_entry_stale() {
        let mut idx = ExpiryIndex::new();
        idx.schedule(b"k1".to_vec(), 100);
        idx.clear(b"k1");
        assert!(idx.sweep(100).is_empty());
    }

    #[test]
    fn test_is_expired() {
        let mut idx = ExpiryIndex::new();
        idx.schedule(b"k1".to_vec(), 100);
        assert!(!idx.is_expired(b"k1", 99));
        assert!(idx.is_expired(b"k1", 100));
    }
}
