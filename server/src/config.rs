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

//! Operator-facing CLI surface (spec.md §6), simplified to CLI-only
//! flags since spec.md's Non-goals don't specify a config file format.

use clap::Parser;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 31337;
pub const DEFAULT_MAXCON: usize = 1024;

#[derive(Debug, Parser)]
#[command(name = "vaultd", version, about = "an in-memory, multi-datatype key-value store")]
pub struct Config {
    /// address to bind the listener to
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,
    /// port to bind the listener to
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// maximum number of concurrently connected clients
    #[arg(long, default_value_t = DEFAULT_MAXCON)]
    pub maxcon: usize,
    /// enable verbose (debug-level) logging
    #[arg(long)]
    pub debug: bool,
    /// restore from this snapshot file before accepting connections
    #[arg(long)]
    pub restore: Option<std::path::PathBuf>,
}

impl Config {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
