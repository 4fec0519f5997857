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

use crate::protocol::responses;
use std::fmt;

/// Errors the key-space engine can raise while executing a command.
///
/// These are caught per-command by the dispatcher (spec.md §7),
/// encoded as `-` frames, and counted in `command_errors`; they never
/// tear down the connection.
#[derive(Debug)]
pub enum EngineError {
    /// the key exists with a different datatype tag than the command expects
    WrongType,
    /// the command's argument count didn't match what it expects
    Arity(String),
    /// an unknown command name
    UnknownCommand(String),
    /// the request array had zero elements
    EmptyRequest,
    /// `SAVE`/`RESTORE` I/O failed for a reason other than a missing file
    Io(std::io::Error),
    /// the persisted snapshot was unreadable (corrupt or foreign format)
    Corrupt(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongType => write!(f, "{}", responses::WRONGTYPE),
            Self::Arity(name) => write!(f, "{}", responses::arity_error(name)),
            Self::UnknownCommand(name) => write!(f, "{}", responses::unknown_command(name)),
            Self::EmptyRequest => write!(f, "{}", responses::EMPTY_REQUEST),
            Self::Io(e) => write!(f, "{}: {}", responses::IO_ERROR, e),
            Self::Corrupt(msg) => write!(f, "{}: corrupt snapshot ({})", responses::IO_ERROR, msg),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
