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

//! Accepts TCP connections and spawns a handler per connection,
//! bounded by a configured maximum-concurrency cap (spec.md §4.6).

use super::connection::{Connection, ConnectionHandler};
use super::Terminator;
use crate::engine::Engine;
use std::cell::Cell;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, Semaphore};
use tokio::time;

/// A simple exponential backoff for the accept loop, so a burst of
/// transient accept errors doesn't spin the CPU.
struct NetBackoff {
    c: Cell<u8>,
}

impl NetBackoff {
    const MAX_BACKOFF: u8 = 64;

    const fn new() -> Self {
        Self { c: Cell::new(1) }
    }

    async fn spin(&self) {
        time::sleep(Duration::from_secs(self.c.get() as u64)).await;
        self.c.set(self.c.get().saturating_mul(2));
    }

    fn should_disconnect(&self) -> bool {
        self.c.get() > Self::MAX_BACKOFF
    }
}

/// The shared state behind every accept iteration: the engine handle,
/// the bound socket, the connection-count semaphore and the shutdown
/// broadcast sender.
pub struct Listener {
    engine: Engine,
    listener: TcpListener,
    climit: Arc<Semaphore>,
    signal: broadcast::Sender<()>,
    terminate_tx: mpsc::Sender<()>,
    terminate_rx: mpsc::Receiver<()>,
}

/// Bind `addr` and build a [`Listener`] with a concurrency cap of `maxcon`.
pub async fn connect(engine: Engine, addr: &str, maxcon: usize) -> std::io::Result<Listener> {
    let listener = TcpListener::bind(addr).await?;
    let (signal, _) = broadcast::channel(1);
    let (terminate_tx, terminate_rx) = mpsc::channel(1);
    Ok(Listener {
        engine,
        listener,
        climit: Arc::new(Semaphore::new(maxcon)),
        signal,
        terminate_tx,
        terminate_rx,
    })
}

impl Listener {
    async fn accept(&self) -> std::io::Result<TcpStream> {
        let backoff = NetBackoff::new();
        loop {
            match self.listener.accept().await {
                Ok((stream, _)) => return Ok(stream),
                Err(e) => {
                    if backoff.should_disconnect() {
                        return Err(e);
                    }
                }
            }
            backoff.spin().await;
        }
    }

    /// Accept connections until `SHUTDOWN` fires, then wait for every
    /// in-flight handler to drain before returning (spec.md §4.6, §5).
    pub async fn run(mut self) -> std::io::Result<()> {
        loop {
            let permit = tokio::select! {
                permit = self.climit.clone().acquire_owned() => permit.expect("semaphore is never closed"),
                _ = self.signal_shutdown_requested() => break,
            };
            permit.forget();

            let stream = match self.accept().await {
                Ok(s) => s,
                Err(e) => {
                    log::error!("accept failed: {}", e);
                    self.climit.add_permits(1);
                    continue;
                }
            };
            self.engine.counters().note_connect();
            log::debug!("accepted a new connection");

            let mut handler = ConnectionHandler::new(
                self.engine.clone(),
                Connection::new(stream),
                self.climit.clone(),
                Terminator::new(self.signal.subscribe()),
                self.signal.clone(),
                self.terminate_tx.clone(),
            );
            tokio::spawn(async move {
                if let Err(e) = handler.run().await {
                    log::error!("connection handler exited with error: {}", e);
                }
            });
        }

        // stop accepting; drain in-flight handlers by waiting for every
        // clone of terminate_tx to be dropped
        drop(self.terminate_tx);
        let _ = self.terminate_rx.recv().await;
        log::info!("all connections drained, shutting down");
        Ok(())
    }

    /// Resolves once a `SHUTDOWN` command fires the broadcast signal.
    /// `self.signal` has no active receivers until the first
    /// connection subscribes, so this subscribes its own to find out.
    async fn signal_shutdown_requested(&self) {
        let mut rx = self.signal.subscribe();
        let _ = rx.recv().await;
    }
}
