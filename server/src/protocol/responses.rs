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

//! Pre-formatted error message bodies, shared by the engine and the dispatcher

pub const EMPTY_REQUEST: &str = "EMPTY REQUEST";
pub const MALFORMED: &str = "MALFORMED";
pub const WRONGTYPE: &str = "WRONGTYPE";
pub const IO_ERROR: &str = "IO ERROR";

pub fn unknown_command(name: &str) -> String {
    format!("UNKNOWN COMMAND: {}", name)
}

pub fn arity_error(name: &str) -> String {
    format!("wrong number of arguments for '{}'", name)
}
