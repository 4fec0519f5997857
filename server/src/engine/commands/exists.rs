use super::{require_arity, EngineResult};
use crate::engine::Inner;
use crate::protocol::Value;

/// `EXISTS(key) -> 0|1`
pub fn exec(inner: &mut Inner, args: &[Vec<u8>]) -> EngineResult<Value> {
    require_arity("EXISTS", args, 1)?;
    Ok(Value::Int(inner.keyspace.contains_key(&args[0]) as i64))
}
