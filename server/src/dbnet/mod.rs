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

//! TCP listener and per-connection dispatch (spec.md §4.5, §4.6)

pub mod connection;
pub mod listener;

pub use listener::connect;

use tokio::sync::broadcast;

/// Wraps a shutdown broadcast receiver so a connection only ever
/// observes the termination signal once; after that, waiting on it
/// again resolves immediately instead of blocking on a closed channel.
pub struct Terminator {
    terminate: bool,
    signal: broadcast::Receiver<()>,
}

impl Terminator {
    pub fn new(signal: broadcast::Receiver<()>) -> Self {
        Self {
            terminate: false,
            signal,
        }
    }

    pub fn is_termination_signal(&self) -> bool {
        self.terminate
    }

    pub async fn receive_signal(&mut self) {
        if self.terminate {
            return;
        }
        let _ = self.signal.recv().await;
        self.terminate = true;
    }
}
