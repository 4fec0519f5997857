use super::EngineResult;
use crate::engine::Inner;
use crate::protocol::Value;

/// `FLUSHALL() -> "OK"`
pub fn exec(inner: &mut Inner, _args: &[Vec<u8>]) -> EngineResult<Value> {
    inner.keyspace.clear();
    inner.expiry = crate::engine::expiry::ExpiryIndex::new();
    Ok(Value::Simple(b"OK".to_vec()))
}
