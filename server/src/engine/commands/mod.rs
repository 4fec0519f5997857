/*
 * This file is a part of Vaultd
 * Vaultd is a free and open-source in-memory key-value store
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

//! In-memory keyspace commands, one module per command (spec.md §4.2).
//!
//! `SAVE`, `RESTORE`, `INFO`, `QUIT` and `SHUTDOWN` are not here: the
//! first two need blocking file I/O outside the engine lock, and the
//! last three need state (counters, the shutdown signal) this module
//! doesn't carry. See [`super::Engine::dispatch`].

mod del;
mod exists;
mod expire;
mod flushall;
mod get;
mod hget;
mod hset;
mod lpop;
mod lpush;
mod sadd;
mod set;
mod smembers;

use super::error::{EngineError, EngineResult};
use super::Inner;
use crate::protocol::Value;

/// Dispatch a single in-memory command by its uppercased name.
///
/// The caller is responsible for the lazy expiry sweep (spec.md §4.3);
/// by the time this runs, `inner` reflects a keyspace with no expired
/// entries for the key(s) being touched.
pub fn dispatch(name: &str, inner: &mut Inner, args: &[Vec<u8>]) -> EngineResult<Value> {
    match name {
        "GET" => get::exec(inner, args),
        "SET" => set::exec(inner, args),
        "DELETE" => del::exec(inner, args),
        "EXISTS" => exists::exec(inner, args),
        "LPUSH" => lpush::exec(inner, args),
        "LPOP" => lpop::exec(inner, args),
        "HSET" => hset::exec(inner, args),
        "HGET" => hget::exec(inner, args),
        "SADD" => sadd::exec(inner, args),
        "SMEMBERS" => smembers::exec(inner, args),
        "EXPIRE" => expire::exec(inner, args),
        "FLUSHALL" => flushall::exec(inner, args),
        other => Err(EngineError::UnknownCommand(other.to_owned())),
    }
}

/// Shared arity check: fail early rather than let a command index out of bounds.
fn require_arity(name: &str, args: &[Vec<u8>], exact: usize) -> EngineResult<()> {
    if args.len() == exact {
        Ok(())
    } else {
        Err(EngineError::Arity(name.to_owned()))
    }
}

fn require_arity_min(name: &str, args: &[Vec<u8>], min: usize) -> EngineResult<()> {
    if args.len() >= min {
        Ok(())
    } else {
        Err(EngineError::Arity(name.to_owned()))
    }
}
