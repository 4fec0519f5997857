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

//! The entry/scalar data model (spec.md §3)

use crate::protocol::Value;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// The STRING payload: a byte string, UTF-8 string, integer, or float,
/// preserved verbatim through the engine and the codec. HASH fields,
/// LIST elements and SET members also share this representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Scalar {
    Bytes(Vec<u8>),
    Str(String),
    Int(i64),
    Float(f64),
}

impl Scalar {
    /// Lower this scalar into a wire value, using the tag canonical to
    /// its kind so a numeric scalar round-trips as a number, not text.
    pub fn into_value(self) -> Value {
        match self {
            Self::Bytes(b) => Value::Bulk(Some(b)),
            Self::Str(s) => Value::Bulk(Some(s.into_bytes())),
            Self::Int(n) => Value::Int(n),
            Self::Float(n) => Value::Float(n),
        }
    }

    /// Build a scalar from a client-supplied bulk string, guessing the
    /// most specific representation: valid UTF-8 that parses as an
    /// integer or float is stored as such, otherwise as a UTF-8
    /// string, falling back to raw bytes for anything non-UTF-8.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        match std::str::from_utf8(&bytes) {
            Ok(s) => {
                if let Ok(n) = s.parse::<i64>() {
                    Self::Int(n)
                } else if let Ok(f) = s.parse::<f64>() {
                    Self::Float(f)
                } else {
                    Self::Str(s.to_owned())
                }
            }
            Err(_) => Self::Bytes(bytes),
        }
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

impl Eq for Scalar {}

impl std::hash::Hash for Scalar {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            Self::Bytes(b) => {
                0u8.hash(state);
                b.hash(state);
            }
            Self::Str(s) => {
                1u8.hash(state);
                s.hash(state);
            }
            Self::Int(n) => {
                2u8.hash(state);
                n.hash(state);
            }
            Self::Float(f) => {
                3u8.hash(state);
                f.to_bits().hash(state);
            }
        }
    }
}

/// A key's datatype tag and payload (spec.md §3). The tag is immutable
/// once the key holds a non-STRING entry: commands for a different
/// type fail with `WRONGTYPE` rather than silently converting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Entry {
    Str(Scalar),
    Hash(HashMap<Vec<u8>, Scalar>),
    List(VecDeque<Scalar>),
    Set(HashSet<Scalar>),
}

impl Entry {
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "STRING",
            Self::Hash(_) => "HASH",
            Self::List(_) => "LIST",
            Self::Set(_) => "SET",
        }
    }
}
