use super::{require_arity, EngineError, EngineResult};
use crate::engine::expiry::ExpiryIndex;
use crate::engine::Inner;
use crate::protocol::Value;

/// `EXPIRE(key, seconds) -> 0|1`
///
/// A no-op (returning 0) on a missing key; otherwise schedules
/// `deadline = now + seconds`, replacing any prior deadline. Applies
/// regardless of the key's datatype.
pub fn exec(inner: &mut Inner, args: &[Vec<u8>]) -> EngineResult<Value> {
    require_arity("EXPIRE", args, 2)?;
    if !inner.keyspace.contains_key(&args[0]) {
        return Ok(Value::Int(0));
    }
    let seconds: i64 = std::str::from_utf8(&args[1])
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| EngineError::Arity("EXPIRE".to_owned()))?;
    let deadline = ExpiryIndex::now() + seconds;
    inner.expiry.schedule(args[0].clone(), deadline);
    Ok(Value::Int(1))
}
