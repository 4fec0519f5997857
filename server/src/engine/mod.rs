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

//! # The key-space engine
//!
//! Holds every key's [`entry::Entry`] plus the [`expiry::ExpiryIndex`]
//! behind a single coarse lock, mirroring the discipline the teacher's
//! `coredb::CoreDB` takes one `RwLock<Coretable>` per command and never
//! holds it across an `.await` point. That single lock is sufficient
//! to satisfy the "serialized command execution" contract in
//! spec.md §5 -- no finer-grained (e.g. per-key) locking is needed,
//! and none is attempted.

pub mod commands;
pub mod entry;
pub mod error;
pub mod expiry;
pub mod snapshot;

use entry::Entry;
use error::{EngineError, EngineResult};
use expiry::ExpiryIndex;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use crate::protocol::Value;

/// The guarded state. Never exposed outside the engine; every access
/// goes through a method that takes the lock for exactly the duration
/// of one command.
pub struct Inner {
    pub keyspace: HashMap<Vec<u8>, Entry>,
    pub expiry: ExpiryIndex,
}

impl Inner {
    fn new() -> Self {
        Self {
            keyspace: HashMap::new(),
            expiry: ExpiryIndex::new(),
        }
    }

    /// Lazy sweep (spec.md §4.3): pop every due heap entry, then
    /// additionally check the specific key about to be touched (the
    /// per-key check covers the race where the heap root hasn't been
    /// popped yet but the map already says the key is due).
    fn sweep(&mut self, touched_key: Option<&[u8]>) {
        let now = ExpiryIndex::now();
        for key in self.expiry.sweep(now) {
            self.keyspace.remove(&key);
        }
        if let Some(key) = touched_key {
            if self.expiry.is_expired(key, now) {
                self.keyspace.remove(key);
                self.expiry.clear(key);
            }
        }
    }
}

/// Aggregate counters reported by `INFO` (spec.md §2, §4.2). These
/// live outside the engine mutex since connection bookkeeping
/// (`active_connections`, `connections`) happens at accept/drop time,
/// independent of any single command.
#[derive(Default)]
pub struct Counters {
    pub active_connections: AtomicI64,
    pub connections: AtomicU64,
    pub commands_processed: AtomicU64,
    pub command_errors: AtomicU64,
}

impl Counters {
    pub fn note_connect(&self) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
        self.connections.fetch_add(1, Ordering::Relaxed);
    }
    pub fn note_disconnect(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }
    pub fn note_command(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }
    pub fn note_error(&self) {
        self.command_errors.fetch_add(1, Ordering::Relaxed);
    }
}

struct Shared {
    inner: Mutex<Inner>,
    counters: Counters,
}

/// A cheaply-cloneable handle to the shared engine state.
///
/// Per spec.md §9 ("Global engine state"), this is an owned instance
/// passed to connection handlers by shared reference/clone, not a
/// process-global singleton: `main` constructs exactly one and clones
/// the handle into every spawned connection task.
#[derive(Clone)]
pub struct Engine(Arc<Shared>);

impl Engine {
    pub fn new() -> Self {
        Self(Arc::new(Shared {
            inner: Mutex::new(Inner::new()),
            counters: Counters::default(),
        }))
    }

    pub fn counters(&self) -> &Counters {
        &self.0.counters
    }

    /// Run one in-memory command under the engine's single lock.
    ///
    /// `SAVE`, `RESTORE`, `INFO`, `QUIT` and `SHUTDOWN` are not routed
    /// through here -- see [`Engine::save`], [`Engine::restore`] and
    /// [`Engine::info`], and the dispatcher for the two control-flow
    /// signals (spec.md §4.5, §7).
    pub fn dispatch(&self, name: &str, args: &[Vec<u8>]) -> EngineResult<Value> {
        let mut inner = self.0.inner.lock();
        inner.sweep(args.first().map(|v| v.as_slice()));
        commands::dispatch(name, &mut inner, args)
    }

    /// `INFO() -> mapping`
    pub fn info(&self) -> Value {
        let mut inner = self.0.inner.lock();
        inner.sweep(None);
        let keys = inner.keyspace.len() as i64;
        drop(inner);
        let c = &self.0.counters;
        Value::Map(vec![
            (
                Value::Bulk(Some(b"active_connections".to_vec())),
                Value::Int(c.active_connections.load(Ordering::Relaxed)),
            ),
            (
                Value::Bulk(Some(b"connections".to_vec())),
                Value::Int(c.connections.load(Ordering::Relaxed) as i64),
            ),
            (
                Value::Bulk(Some(b"commands_processed".to_vec())),
                Value::Int(c.commands_processed.load(Ordering::Relaxed) as i64),
            ),
            (
                Value::Bulk(Some(b"command_errors".to_vec())),
                Value::Int(c.command_errors.load(Ordering::Relaxed) as i64),
            ),
            (Value::Bulk(Some(b"keys".to_vec())), Value::Int(keys)),
        ])
    }

    /// `FLUSHALL` is a plain command but also used internally by
    /// `RESTORE` to make way for the restored state.
    fn flushall_locked(inner: &mut Inner) {
        inner.keyspace.clear();
        inner.expiry = ExpiryIndex::new();
    }

    /// `SAVE(path) -> "OK"`
    ///
    /// Clones the current state under the lock, then performs the
    /// (blocking) file write after releasing it -- file I/O is a
    /// suspension point the engine's single-writer discipline
    /// explicitly permits outside the lock (spec.md §5).
    pub fn save(&self, path: &Path) -> EngineResult<Value> {
        let image = {
            let inner = self.0.inner.lock();
            snapshot::SnapshotImage {
                keyspace: inner.keyspace.clone(),
                deadlines: inner.expiry.deadlines_snapshot(),
            }
        };
        snapshot::write_to_disk(path, &image)?;
        Ok(Value::Simple(b"OK".to_vec()))
    }

    /// `RESTORE(path) -> 0|1`
    ///
    /// Replaces the entire key-space and expiry index on success.
    /// Stale (already-past) deadlines become candidates for the very
    /// next lazy sweep, exactly as a freshly-scheduled one would.
    pub fn restore(&self, path: &Path) -> EngineResult<Value> {
        match snapshot::read_from_disk(path)? {
            None => Ok(Value::Int(0)),
            Some(image) => {
                let mut inner = self.0.inner.lock();
                Self::flushall_locked(&mut inner);
                inner.keyspace = image.keyspace;
                for (key, deadline) in image.deadlines {
                    inner.expiry.schedule(key, deadline);
                }
                Ok(Value::Int(1))
            }
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bulk(s: &str) -> Vec<u8> {
        s.as_bytes().to_vec()
    }

    #[test]
    fn test_set_then_get() {
        let engine = Engine::new();
        assert_eq!(
            engine.dispatch("SET", &[bulk("key1"), bulk("value1")]).unwrap(),
            Value::Simple(b"OK".to_vec())
        );
        assert_eq!(
            engine.dispatch("GET", &[bulk("key1")]).unwrap(),
            Value::Bulk(Some(bulk("value1")))
        );
        assert_eq!(
            engine.dispatch("GET", &[bulk("nonexistent")]).unwrap(),
            Value::Bulk(None)
        );
    }

    #[test]
    fn test_set_numeric_value_round_trips_as_int_through_get() {
        let engine = Engine::new();
        engine.dispatch("SET", &[bulk("key2"), bulk("123")]).unwrap();
        assert_eq!(engine.dispatch("GET", &[bulk("key2")]).unwrap(), Value::Int(123));
    }

    #[test]
    fn test_set_non_utf8_bytes_round_trip_through_get() {
        let engine = Engine::new();
        let raw = vec![0x80u8];
        engine.dispatch("SET", &[bulk("key4"), raw.clone()]).unwrap();
        assert_eq!(
            engine.dispatch("GET", &[bulk("key4")]).unwrap(),
            Value::Bulk(Some(raw))
        );
    }

    #[test]
    fn test_delete() {
        let engine = Engine::new();
        engine.dispatch("SET", &[bulk("k1"), bulk("v1")]).unwrap();
        assert_eq!(engine.dispatch("DELETE", &[bulk("k1")]).unwrap(), Value::Int(1));
        assert_eq!(engine.dispatch("GET", &[bulk("k1")]).unwrap(), Value::Bulk(None));
        assert_eq!(
            engine.dispatch("DELETE", &[bulk("nonexistent")]).unwrap(),
            Value::Int(0)
        );
    }

    #[test]
    fn test_lpush_and_lpop_order() {
        let engine = Engine::new();
        assert_eq!(
            engine
                .dispatch("LPUSH", &[bulk("mylist"), bulk("a"), bulk("b"), bulk("c")])
                .unwrap(),
            Value::Int(3)
        );
        assert_eq!(
            engine.dispatch("LPOP", &[bulk("mylist")]).unwrap(),
            Value::Bulk(Some(bulk("c")))
        );
        assert_eq!(
            engine.dispatch("LPOP", &[bulk("mylist")]).unwrap(),
            Value::Bulk(Some(bulk("b")))
        );
        assert_eq!(
            engine.dispatch("LPOP", &[bulk("mylist")]).unwrap(),
            Value::Bulk(Some(bulk("a")))
        );
        assert_eq!(engine.dispatch("LPOP", &[bulk("mylist")]).unwrap(), Value::Bulk(None));
    }

    #[test]
    fn test_wrongtype_never_mutates_keyspace() {
        let engine = Engine::new();
        engine.dispatch("SET", &[bulk("key1"), bulk("v")]).unwrap();
        assert!(matches!(
            engine.dispatch("LPUSH", &[bulk("key1"), bulk("a")]),
            Err(EngineError::WrongType)
        ));
        // unchanged: still a STRING key
        assert_eq!(
            engine.dispatch("GET", &[bulk("key1")]).unwrap(),
            Value::Bulk(Some(bulk("v")))
        );

        engine.dispatch("LPUSH", &[bulk("key2"), bulk("a")]).unwrap();
        assert!(matches!(
            engine.dispatch("HSET", &[bulk("key2"), bulk("f"), bulk("v")]),
            Err(EngineError::WrongType)
        ));
    }

    #[test]
    fn test_hset_always_returns_one() {
        let engine = Engine::new();
        assert_eq!(
            engine.dispatch("HSET", &[bulk("h"), bulk("f"), bulk("v1")]).unwrap(),
            Value::Int(1)
        );
        // replacing the same field still returns 1, per spec.md's explicit
        // open-question resolution -- not inferred from "was it new".
        assert_eq!(
            engine.dispatch("HSET", &[bulk("h"), bulk("f"), bulk("v2")]).unwrap(),
            Value::Int(1)
        );
        assert_eq!(
            engine.dispatch("HGET", &[bulk("h"), bulk("f")]).unwrap(),
            Value::Bulk(Some(bulk("v2")))
        );
    }

    #[test]
    fn test_sadd_counts_only_new_members() {
        let engine = Engine::new();
        assert_eq!(
            engine.dispatch("SADD", &[bulk("s"), bulk("a"), bulk("b")]).unwrap(),
            Value::Int(2)
        );
        assert_eq!(
            engine.dispatch("SADD", &[bulk("s"), bulk("a"), bulk("c")]).unwrap(),
            Value::Int(1)
        );
    }

    #[test]
    fn test_expire_on_missing_key_is_noop() {
        let engine = Engine::new();
        assert_eq!(engine.dispatch("EXPIRE", &[bulk("nope"), bulk("10")]).unwrap(), Value::Int(0));
    }

    #[test]
    fn test_expire_then_set_clears_ttl() {
        let engine = Engine::new();
        engine.dispatch("SET", &[bulk("k1"), bulk("v1")]).unwrap();
        engine.dispatch("EXPIRE", &[bulk("k1"), bulk("1")]).unwrap();
        engine.dispatch("SET", &[bulk("k1"), bulk("v2")]).unwrap();
        {
            let inner = engine.0.inner.lock();
            assert!(!inner.expiry.is_expired(b"k1", i64::MAX));
            assert_eq!(inner.expiry.len(), 0);
        }
    }

    #[test]
    fn test_expire_soundness() {
        let engine = Engine::new();
        engine.dispatch("SET", &[bulk("k1"), bulk("v")]).unwrap();
        {
            let mut inner = engine.0.inner.lock();
            inner.expiry.schedule(bulk("k1"), expiry::ExpiryIndex::now() - 1);
        }
        assert_eq!(engine.dispatch("GET", &[bulk("k1")]).unwrap(), Value::Bulk(None));
        assert_eq!(engine.dispatch("EXISTS", &[bulk("k1")]).unwrap(), Value::Int(0));
    }

    #[test]
    fn test_info_keys_matches_live_keys() {
        let engine = Engine::new();
        engine.dispatch("SET", &[bulk("k1"), bulk("v1")]).unwrap();
        engine.dispatch("SET", &[bulk("k2"), bulk("v2")]).unwrap();
        match engine.info() {
            Value::Map(pairs) => {
                let keys = pairs
                    .into_iter()
                    .find(|(k, _)| *k == Value::Bulk(Some(bulk("keys"))))
                    .map(|(_, v)| v);
                assert_eq!(keys, Some(Value::Int(2)));
            }
            other => panic!("unexpected INFO shape: {:?}", other),
        }
    }

    #[test]
    fn test_info_sweeps_before_counting_keys() {
        let engine = Engine::new();
        engine.dispatch("SET", &[bulk("k1"), bulk("v1")]).unwrap();
        engine.dispatch("SET", &[bulk("k2"), bulk("v2")]).unwrap();
        {
            let mut inner = engine.0.inner.lock();
            inner.expiry.schedule(bulk("k1"), expiry::ExpiryIndex::now() - 1);
        }
        // nothing else touches k1 before INFO; info() must sweep on its own
        match engine.info() {
            Value::Map(pairs) => {
                let keys = pairs
                    .into_iter()
                    .find(|(k, _)| *k == Value::Bulk(Some(bulk("keys"))))
                    .map(|(_, v)| v);
                assert_eq!(keys, Some(Value::Int(1)));
            }
            other => panic!("unexpected INFO shape: {:?}", other),
        }
    }

    #[test]
    fn test_save_restore_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.bin");

        let engine = Engine::new();
        engine.dispatch("SET", &[bulk("k1"), bulk("v1")]).unwrap();
        engine.dispatch("SET", &[bulk("kbin"), vec![0x80]]).unwrap();
        engine
            .dispatch("LPUSH", &[bulk("L"), bulk("a"), bulk("b")])
            .unwrap();

        engine.save(&path).unwrap();
        engine.dispatch("FLUSHALL", &[]).unwrap();
        assert_eq!(engine.dispatch("GET", &[bulk("k1")]).unwrap(), Value::Bulk(None));

        assert_eq!(engine.restore(&path).unwrap(), Value::Int(1));
        assert_eq!(
            engine.dispatch("GET", &[bulk("k1")]).unwrap(),
            Value::Bulk(Some(bulk("v1")))
        );
        assert_eq!(
            engine.dispatch("GET", &[bulk("kbin")]).unwrap(),
            Value::Bulk(Some(vec![0x80]))
        );
        assert_eq!(
            engine.dispatch("LPOP", &[bulk("L")]).unwrap(),
            Value::Bulk(Some(bulk("b")))
        );
    }

    #[test]
    fn test_restore_missing_file_returns_zero() {
        let engine = Engine::new();
        let path = std::path::Path::new("/nonexistent/vaultd-snapshot.bin");
        assert_eq!(engine.restore(path).unwrap(), Value::Int(0));
    }
}
