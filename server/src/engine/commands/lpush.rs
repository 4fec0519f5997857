use super::{require_arity_min, EngineError, EngineResult};
use crate::engine::entry::{Entry, Scalar};
use crate::engine::Inner;
use crate::protocol::Value;
use std::collections::VecDeque;

/// `LPUSH(key, v1, ..., vn) -> new length`
///
/// Prepends values in argument order such that the last argument ends
/// up at the front of the list (head-first insertion). Creates the
/// list if the key is missing; fails `WRONGTYPE` if it holds a
/// non-LIST entry.
pub fn exec(inner: &mut Inner, args: &[Vec<u8>]) -> EngineResult<Value> {
    require_arity_min("LPUSH", args, 2)?;
    let key = &args[0];
    let entry = inner
        .keyspace
        .entry(key.clone())
        .or_insert_with(|| Entry::List(VecDeque::new()));
    let list = match entry {
        Entry::List(list) => list,
        _ => return Err(EngineError::WrongType),
    };
    for raw in &args[1..] {
        list.push_front(Scalar::from_bytes(raw.clone()));
    }
    Ok(Value::Int(list.len() as i64))
}
