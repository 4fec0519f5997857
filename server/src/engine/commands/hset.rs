use super::{require_arity, EngineError, EngineResult};
use crate::engine::entry::{Entry, Scalar};
use crate::engine::Inner;
use crate::protocol::Value;
use std::collections::HashMap;

/// `HSET(key, field, value) -> 1`
///
/// Sets the field regardless of prior presence; the return value does
/// not distinguish a new field from a replaced one (spec.md §4.2, and
/// the open question in §9 -- this is asserted literally, not inferred).
pub fn exec(inner: &mut Inner, args: &[Vec<u8>]) -> EngineResult<Value> {
    require_arity("HSET", args, 3)?;
    let key = &args[0];
    let entry = inner
        .keyspace
        .entry(key.clone())
        .or_insert_with(|| Entry::Hash(HashMap::new()));
    let map = match entry {
        Entry::Hash(map) => map,
        _ => return Err(EngineError::WrongType),
    };
    map.insert(args[1].clone(), Scalar::from_bytes(args[2].clone()));
    Ok(Value::Int(1))
}
