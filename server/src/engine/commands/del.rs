use super::{require_arity, EngineResult};
use crate::engine::Inner;
use crate::protocol::Value;

/// `DELETE(key) -> 0|1`
pub fn exec(inner: &mut Inner, args: &[Vec<u8>]) -> EngineResult<Value> {
    require_arity("DELETE", args, 1)?;
    inner.expiry.clear(&args[0]);
    let removed = inner.keyspace.remove(&args[0]).is_some();
    Ok(Value::Int(removed as i64))
}
