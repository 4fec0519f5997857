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

//! A single client connection: read a request frame, resolve it to a
//! command, invoke the engine, write a response frame (spec.md §4.5).

use super::Terminator;
use crate::engine::error::EngineError;
use crate::engine::Engine;
use crate::protocol::{self, responses, ParseError, Value};
use crate::util::error::VaultResult;
use bytes::{Buf, BytesMut};
use libshared::BUF_CAP;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, Semaphore};

/// A buffered socket plus its unparsed read-ahead bytes.
pub struct Connection {
    buffer: BytesMut,
    stream: BufWriter<TcpStream>,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            buffer: BytesMut::with_capacity(BUF_CAP),
            stream: BufWriter::new(stream),
        }
    }

    /// Fill the buffer with whatever the socket has ready. `Ok(true)`
    /// if the peer closed the connection cleanly with no partial frame
    /// left behind.
    async fn read_again(&mut self) -> VaultResult<bool> {
        let n = self.stream.read_buf(&mut self.buffer).await?;
        Ok(n == 0 && self.buffer.is_empty())
    }

    fn try_parse(&self) -> Result<(Value, usize), ParseError> {
        protocol::Parser::parse(&self.buffer)
    }

    /// Block until one complete frame is available, an error frame
    /// needs to be sent back, or the peer disconnects.
    async fn read_request(&mut self) -> VaultResult<ReadOutcome> {
        loop {
            match self.try_parse() {
                Ok((value, consumed)) => {
                    self.buffer.advance(consumed);
                    return Ok(ReadOutcome::Request(value));
                }
                Err(ParseError::Empty) => {
                    if self.buffer.is_empty() {
                        // nothing buffered at all; wait for the peer
                    } else {
                        return Ok(ReadOutcome::ProtocolError);
                    }
                }
                Err(ParseError::NotEnough) => {}
                Err(ParseError::Malformed) => return Ok(ReadOutcome::ProtocolError),
            }
            if self.read_again().await? {
                return Ok(ReadOutcome::Eof);
            }
        }
    }

    async fn write_value(&mut self, value: &Value) -> VaultResult<()> {
        let encoded = protocol::encode_to_vec(value);
        self.stream.write_all(&encoded).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn write_error(&mut self, message: &str) -> VaultResult<()> {
        self.write_value(&Value::Error(message.as_bytes().to_vec())).await
    }
}

enum ReadOutcome {
    Request(Value),
    Eof,
    ProtocolError,
}

/// Turn a decoded request [`Value`] into the uppercased command name
/// and its argument byte-strings, normalizing the inline fallback
/// (spec.md §4.1, §4.5) into the same shape as an array request.
fn normalize_request(value: Value) -> Option<(String, Vec<Vec<u8>>)> {
    let items: Vec<Vec<u8>> = match value {
        Value::Array(items) => items
            .into_iter()
            .map(|v| match v {
                Value::Bulk(Some(b)) => b,
                Value::Bulk(None) => Vec::new(),
                Value::Simple(b) | Value::Error(b) => b,
                Value::Int(n) => n.to_string().into_bytes(),
                Value::Float(n) => n.to_string().into_bytes(),
                // nested containers inside a request array have no
                // sensible scalar form; treat them as empty tokens
                Value::Array(_) | Value::Map(_) | Value::Set(_) | Value::Inline(_) => Vec::new(),
            })
            .collect(),
        Value::Inline(line) => libshared::split_into_args(&String::from_utf8_lossy(&line))
            .into_iter()
            .map(String::into_bytes)
            .collect(),
        // a bare non-array frame (e.g. a lone bulk string) is treated as
        // a single-token request
        Value::Bulk(Some(b)) => vec![b],
        other => vec![protocol::encode_to_vec(&other)],
    };
    let mut iter = items.into_iter();
    let name = iter.next()?;
    let name = String::from_utf8_lossy(&name).to_ascii_uppercase();
    Some((name, iter.collect()))
}

/// What the dispatcher decided to do with one request.
enum Outcome {
    Reply(Value),
    Quit,
    Shutdown,
}

/// Per-connection handler: owns the socket, a reference to the shared
/// engine, its connection-limit permit and the shutdown terminator.
pub struct ConnectionHandler {
    engine: Engine,
    con: Connection,
    climit: Arc<Semaphore>,
    terminator: Terminator,
    shutdown: broadcast::Sender<()>,
    _term_sig_tx: mpsc::Sender<()>,
}

impl ConnectionHandler {
    pub fn new(
        engine: Engine,
        con: Connection,
        climit: Arc<Semaphore>,
        terminator: Terminator,
        shutdown: broadcast::Sender<()>,
        _term_sig_tx: mpsc::Sender<()>,
    ) -> Self {
        Self {
            engine,
            con,
            climit,
            terminator,
            shutdown,
            _term_sig_tx,
        }
    }

    fn dispatch(&self, name: &str, args: &[Vec<u8>]) -> Outcome {
        match name {
            "QUIT" => return Outcome::Quit,
            "SHUTDOWN" => return Outcome::Shutdown,
            "INFO" => return Outcome::Reply(self.engine.info()),
            _ => {}
        }
        // SAVE/RESTORE are intercepted in run() before this is ever called
        match self.engine.dispatch(name, args) {
            Ok(value) => Outcome::Reply(value),
            Err(err) => Outcome::Reply(Value::Error(err.to_string().into_bytes())),
        }
    }

    /// `SAVE`/`RESTORE` need blocking file I/O, which must not run
    /// while the engine's single command lock is held (spec.md §5); run
    /// it on the blocking thread pool instead.
    async fn dispatch_file_command(&self, name: &str, args: &[Vec<u8>]) -> Value {
        if args.len() != 1 {
            return Value::Error(responses::arity_error(name).into_bytes());
        }
        let path = match std::str::from_utf8(&args[0]) {
            Ok(p) => std::path::PathBuf::from(p),
            Err(_) => return Value::Error(EngineError::Corrupt("non-UTF-8 path".into()).to_string().into_bytes()),
        };
        let engine = self.engine.clone();
        let name = name.to_owned();
        let result = tokio::task::spawn_blocking(move || {
            if name == "SAVE" {
                engine.save(&path)
            } else {
                engine.restore(&path)
            }
        })
        .await;
        match result {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => Value::Error(e.to_string().into_bytes()),
            Err(_) => Value::Error(responses::IO_ERROR.as_bytes().to_vec()),
        }
    }

    pub async fn run(&mut self) -> VaultResult<()> {
        log::debug!("connection handler started");
        loop {
            if self.terminator.is_termination_signal() {
                return Ok(());
            }
            let outcome = tokio::select! {
                read = self.con.read_request() => read?,
                _ = self.terminator.receive_signal() => return Ok(()),
            };
            match outcome {
                ReadOutcome::Eof => return Ok(()),
                ReadOutcome::ProtocolError => {
                    self.con.write_error(responses::MALFORMED).await?;
                    return Ok(());
                }
                ReadOutcome::Request(value) => {
                    let Some((name, args)) = normalize_request(value) else {
                        self.engine.counters().note_error();
                        self.engine.counters().note_command();
                        self.con.write_error(responses::EMPTY_REQUEST).await?;
                        continue;
                    };
                    let reply = if name == "SAVE" || name == "RESTORE" {
                        self.dispatch_file_command(&name, &args).await
                    } else {
                        match self.dispatch(&name, &args) {
                            Outcome::Reply(v) => v,
                            Outcome::Quit => return Ok(()),
                            Outcome::Shutdown => {
                                let _ = self.shutdown.send(());
                                return Ok(());
                            }
                        }
                    };
                    if let Value::Error(_) = &reply {
                        self.engine.counters().note_error();
                    }
                    self.engine.counters().note_command();
                    self.con.write_value(&reply).await?;
                }
            }
        }
    }
}

impl Drop for ConnectionHandler {
    fn drop(&mut self) {
        self.engine.counters().note_disconnect();
        // always return the permit, even if we got here via a panic
        self.climit.add_permits(1);
    }
}
