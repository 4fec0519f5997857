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

//! Utilities shared between the `vaultd` server and its tooling

pub mod util;

/// The size of the per-connection read buffer
pub const BUF_CAP: usize = 8 * 1024; // 8 KB per-connection

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const URL: &str = "https://github.com/vaultd/vaultd";

use std::str::FromStr;

lazy_static::lazy_static! {
    static ref TOKEN_RE: regex::Regex = regex::Regex::from_str(r#"("[^"]*"|'[^']*'|[\S]+)+"#).unwrap();
}

/// Split a netcat-style inline command line into whitespace/quote-aware tokens
///
/// Used by the protocol's inline-command fallback (see `protocol::Value::Inline`)
/// to turn a raw ad-hoc line into a request array.
pub fn split_into_args(line: &str) -> Vec<String> {
    TOKEN_RE
        .find_iter(line)
        .map(|val| val.as_str().replace('\'', "").replace('"', ""))
        .collect()
}

#[test]
fn test_split_into_args() {
    assert_eq!(
        split_into_args("SET key1 \"hello world\""),
        vec!["SET", "key1", "hello world"]
    );
    assert_eq!(split_into_args("PING"), vec!["PING"]);
}
