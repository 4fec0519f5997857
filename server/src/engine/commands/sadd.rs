use super::{require_arity_min, EngineError, EngineResult};
use crate::engine::entry::{Entry, Scalar};
use crate::engine::Inner;
use crate::protocol::Value;
use std::collections::HashSet;

/// `SADD(key, m1, ..., mn) -> count added`
///
/// Creates the set if missing; returns the number of members that
/// were not already present.
pub fn exec(inner: &mut Inner, args: &[Vec<u8>]) -> EngineResult<Value> {
    require_arity_min("SADD", args, 2)?;
    let key = &args[0];
    let entry = inner
        .keyspace
        .entry(key.clone())
        .or_insert_with(|| Entry::Set(HashSet::new()));
    let set = match entry {
        Entry::Set(set) => set,
        _ => return Err(EngineError::WrongType),
    };
    let mut added = 0i64;
    for raw in &args[1..] {
        if set.insert(Scalar::from_bytes(raw.clone())) {
            added += 1;
        }
    }
    Ok(Value::Int(added))
}
