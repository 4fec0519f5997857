use super::{require_arity, EngineError, EngineResult};
use crate::engine::entry::Entry;
use crate::engine::Inner;
use crate::protocol::Value;

/// `SMEMBERS(key) -> list of members`
///
/// Read-only; order is not specified. A missing key yields an empty
/// set rather than creating one.
pub fn exec(inner: &mut Inner, args: &[Vec<u8>]) -> EngineResult<Value> {
    require_arity("SMEMBERS", args, 1)?;
    match inner.keyspace.get(&args[0]) {
        None => Ok(Value::Set(Vec::new())),
        Some(Entry::Set(set)) => Ok(Value::Set(
            set.iter().cloned().map(|s| s.into_value()).collect(),
        )),
        Some(_) => Err(EngineError::WrongType),
    }
}
