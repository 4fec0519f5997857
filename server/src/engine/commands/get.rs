use super::{require_arity, EngineError, EngineResult};
use crate::engine::entry::Entry;
use crate::engine::Inner;
use crate::protocol::Value;

/// `GET(key) -> value | null`
///
/// Returns the STRING payload. A non-STRING key fails with
/// `WRONGTYPE` rather than returning the raw container (see the open
/// question recorded in SPEC_FULL.md / DESIGN.md).
pub fn exec(inner: &mut Inner, args: &[Vec<u8>]) -> EngineResult<Value> {
    require_arity("GET", args, 1)?;
    match inner.keyspace.get(&args[0]) {
        None => Ok(Value::Bulk(None)),
        Some(Entry::Str(scalar)) => Ok(scalar.clone().into_value()),
        Some(_) => Err(EngineError::WrongType),
    }
}
