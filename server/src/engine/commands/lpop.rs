use super::{require_arity, EngineError, EngineResult};
use crate::engine::entry::Entry;
use crate::engine::Inner;
use crate::protocol::Value;
use std::collections::VecDeque;

/// `LPOP(key) -> value | null`
///
/// Removes and returns the front of the list. Creates the list if
/// missing (so `LPOP` on an absent key yields null but leaves behind
/// an empty LIST entry, per spec.md §4.2).
pub fn exec(inner: &mut Inner, args: &[Vec<u8>]) -> EngineResult<Value> {
    require_arity("LPOP", args, 1)?;
    let key = &args[0];
    let entry = inner
        .keyspace
        .entry(key.clone())
        .or_insert_with(|| Entry::List(VecDeque::new()));
    let list = match entry {
        Entry::List(list) => list,
        _ => return Err(EngineError::WrongType),
    };
    Ok(match list.pop_front() {
        Some(scalar) => scalar.into_value(),
        None => Value::Bulk(None),
    })
}
