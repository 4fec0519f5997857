use super::{require_arity, EngineResult};
use crate::engine::entry::{Entry, Scalar};
use crate::engine::Inner;
use crate::protocol::Value;

/// `SET(key, value) -> "OK"`
///
/// Stores a STRING entry, clearing any pending TTL and replacing
/// whatever entry (of any type) previously lived at `key`.
pub fn exec(inner: &mut Inner, args: &[Vec<u8>]) -> EngineResult<Value> {
    require_arity("SET", args, 2)?;
    let key = args[0].clone();
    inner.expiry.clear(&key);
    inner
        .keyspace
        .insert(key, Entry::Str(Scalar::from_bytes(args[1].clone())));
    Ok(Value::Simple(b"OK".to_vec()))
}
