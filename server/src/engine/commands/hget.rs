use super::{require_arity, EngineError, EngineResult};
use crate::engine::entry::Entry;
use crate::engine::Inner;
use crate::protocol::Value;

/// `HGET(key, field) -> value | null`
///
/// Read-only: a missing key returns null without creating a container
/// (unlike the write commands, which create the empty container
/// first). A key holding a non-HASH entry still fails `WRONGTYPE`.
pub fn exec(inner: &mut Inner, args: &[Vec<u8>]) -> EngineResult<Value> {
    require_arity("HGET", args, 2)?;
    match inner.keyspace.get(&args[0]) {
        None => Ok(Value::Bulk(None)),
        Some(Entry::Hash(map)) => Ok(match map.get(&args[1]) {
            Some(scalar) => scalar.clone().into_value(),
            None => Value::Bulk(None),
        }),
        Some(_) => Err(EngineError::WrongType),
    }
}
