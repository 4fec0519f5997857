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

//! # The wire protocol
//!
//! This module implements a tagged, length-prefixed, line-delimited
//! serialization format for the value algebra the engine speaks: bulk
//! byte strings, integers, floats, arrays, mappings, sets, simple
//! strings and errors. Every frame begins with one tag byte; all line
//! endings are CRLF.
//!
//! Unlike the format this was derived from, the [`Parser`] here holds
//! no raw pointers: it walks an owned/borrowed byte slice by index and
//! returns owned [`Value`]s. This costs a few more allocations per
//! frame, but the parser can be used outside an `unsafe` block and the
//! values it returns carry no borrow on the source buffer.

pub mod responses;
#[cfg(test)]
mod tests;

use std::fmt;

pub const TAG_SIMPLE: u8 = b'+';
pub const TAG_ERROR: u8 = b'-';
pub const TAG_NUMBER: u8 = b':';
pub const TAG_BULK: u8 = b'$';
pub const TAG_ARRAY: u8 = b'*';
pub const TAG_MAP: u8 = b'%';
pub const TAG_SET: u8 = b'&';

/// A decoded (or to-be-encoded) wire value.
///
/// This is the full algebra the codec can carry. `GET`/`HSET`/etc.
/// results are lowered into this type by the dispatcher; requests are
/// always decoded into it first.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `+`: a short status line, e.g. `OK`
    Simple(Vec<u8>),
    /// `-`: an error message line
    Error(Vec<u8>),
    /// `:`: a whole number
    Int(i64),
    /// `:` with a `.` in the line
    Float(f64),
    /// `$`: a length-prefixed byte string, or `None` for a null (`$-1\r\n`)
    Bulk(Option<Vec<u8>>),
    /// `*`: an ordered sequence of nested frames
    Array(Vec<Value>),
    /// `%`: a sequence of nested (key, value) frames
    Map(Vec<(Value, Value)>),
    /// `&`: an unordered sequence of nested frames
    Set(Vec<Value>),
    /// An ad-hoc request whose first byte wasn't a recognised tag: the
    /// rest of the line, verbatim, to be whitespace-tokenized by the
    /// dispatcher (see [`crate::util::split_into_args`]).
    Inline(Vec<u8>),
}

/// Errors that can arise while decoding a [`Value`] from a byte buffer.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ParseError {
    /// The buffer doesn't yet hold a complete frame; the caller should
    /// read more bytes and retry. Not a protocol violation.
    NotEnough,
    /// A length prefix or delimiter didn't parse the way the format
    /// requires (e.g. a non-digit length, a missing CRLF).
    Malformed,
    /// The buffer held nothing at all: the connection presented EOF
    /// before a frame began.
    Empty,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotEnough => f.write_str("not enough data"),
            Self::Malformed => f.write_str("malformed frame"),
            Self::Empty => f.write_str("empty request"),
        }
    }
}

impl std::error::Error for ParseError {}

pub type ParseResult<T> = Result<T, ParseError>;

/// A cursor over a byte slice, used to decode exactly one [`Value`].
///
/// The cursor is always ahead-of-position: it points at the next byte
/// still to be read. [`Parser::parse`] leaves the buffer untouched on
/// failure so the caller can read more and retry from scratch.
pub struct Parser<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn exhausted(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Read up to (not including) the next `\n`, leaving the cursor
    /// just past it. The returned slice excludes the trailing `\r\n`.
    fn read_line(&mut self) -> ParseResult<&'a [u8]> {
        let start = self.pos;
        let mut i = self.pos;
        while i < self.buf.len() {
            if self.buf[i] == b'\n' {
                let mut end = i;
                if end > start && self.buf[end - 1] == b'\r' {
                    end -= 1;
                }
                self.pos = i + 1;
                return Ok(&self.buf[start..end]);
            }
            i += 1;
        }
        Err(ParseError::NotEnough)
    }

    fn read_exact(&mut self, n: usize) -> ParseResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(ParseError::NotEnough);
        }
        let start = self.pos;
        self.pos += n;
        Ok(&self.buf[start..start + n])
    }

    /// Consume the two bytes of a trailing CRLF after a bulk payload.
    fn expect_crlf(&mut self) -> ParseResult<()> {
        let line = self.read_exact(2)?;
        if line == b"\r\n" {
            Ok(())
        } else {
            Err(ParseError::Malformed)
        }
    }

    fn parse_isize(bytes: &[u8]) -> ParseResult<isize> {
        std::str::from_utf8(bytes)
            .ok()
            .and_then(|s| s.parse::<isize>().ok())
            .ok_or(ParseError::Malformed)
    }

    fn parse_usize(bytes: &[u8]) -> ParseResult<usize> {
        std::str::from_utf8(bytes)
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .ok_or(ParseError::Malformed)
    }

    fn parse_number_line(line: &[u8]) -> ParseResult<Value> {
        let text = std::str::from_utf8(line).map_err(|_| ParseError::Malformed)?;
        if text.contains('.') {
            text.parse::<f64>()
                .map(Value::Float)
                .map_err(|_| ParseError::Malformed)
        } else {
            text.parse::<i64>()
                .map(Value::Int)
                .map_err(|_| ParseError::Malformed)
        }
    }

    fn parse_bulk(&mut self) -> ParseResult<Value> {
        let len = Self::parse_isize(self.read_line()?)?;
        if len == -1 {
            return Ok(Value::Bulk(None));
        }
        if len < 0 {
            return Err(ParseError::Malformed);
        }
        let data = self.read_exact(len as usize)?.to_owned();
        self.expect_crlf()?;
        Ok(Value::Bulk(Some(data)))
    }

    fn parse_array(&mut self) -> ParseResult<Value> {
        let count = Self::parse_usize(self.read_line()?)?;
        let mut items = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            items.push(self.parse_value()?);
        }
        Ok(Value::Array(items))
    }

    fn parse_set(&mut self) -> ParseResult<Value> {
        let count = Self::parse_usize(self.read_line()?)?;
        let mut items = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            items.push(self.parse_value()?);
        }
        Ok(Value::Set(items))
    }

    fn parse_map(&mut self) -> ParseResult<Value> {
        let pairs = Self::parse_usize(self.read_line()?)?;
        let mut items = Vec::with_capacity(pairs.min(4096));
        for _ in 0..pairs {
            let k = self.parse_value()?;
            let v = self.parse_value()?;
            items.push((k, v));
        }
        Ok(Value::Map(items))
    }

    /// Parse exactly one value, cursor positioned at its tag byte.
    fn parse_value(&mut self) -> ParseResult<Value> {
        if self.exhausted() {
            return Err(ParseError::NotEnough);
        }
        let tag = self.buf[self.pos];
        self.pos += 1;
        match tag {
            TAG_SIMPLE => Ok(Value::Simple(self.read_line()?.to_owned())),
            TAG_ERROR => Ok(Value::Error(self.read_line()?.to_owned())),
            TAG_NUMBER => Self::parse_number_line(self.read_line()?),
            TAG_BULK => self.parse_bulk(),
            TAG_ARRAY => self.parse_array(),
            TAG_MAP => self.parse_map(),
            TAG_SET => self.parse_set(),
            _ => {
                // unknown leading byte: consume the rest of the line and
                // hand it back as an inline fallback command
                self.pos -= 1;
                let line = self.read_line()?;
                Ok(Value::Inline(line.to_owned()))
            }
        }
    }

    /// Try to decode one complete frame from the front of the buffer.
    ///
    /// On success, returns the value along with the number of bytes
    /// consumed so the caller can advance its read buffer. On
    /// [`ParseError::NotEnough`], no bytes should be treated as
    /// consumed; the caller should read more and call this again.
    pub fn parse(buf: &'a [u8]) -> ParseResult<(Value, usize)> {
        if buf.is_empty() {
            return Err(ParseError::Empty);
        }
        let mut parser = Self::new(buf);
        let value = parser.parse_value()?;
        Ok((value, parser.pos))
    }
}

/// Encode `value` into `out`, appending to whatever is already there.
///
/// This is the inverse of [`Parser::parse`]: the tag chosen for each
/// [`Value`] variant is canonical (a [`Value::Int`] always encodes as
/// `:`, never `$`, etc). [`Value::Inline`] has no wire representation
/// of its own and is never produced by the encoder; encoding one is a
/// logic error on the caller's part.
pub fn encode(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Simple(s) => {
            out.push(TAG_SIMPLE);
            out.extend_from_slice(s);
            out.extend_from_slice(b"\r\n");
        }
        Value::Error(s) => {
            out.push(TAG_ERROR);
            out.extend_from_slice(s);
            out.extend_from_slice(b"\r\n");
        }
        Value::Int(n) => {
            out.push(TAG_NUMBER);
            out.extend_from_slice(n.to_string().as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        Value::Float(n) => {
            out.push(TAG_NUMBER);
            // `{}` drops the decimal point on whole-number floats (3.0 -> "3"),
            // which would decode back as an Int; force one so it always
            // round-trips as a Float.
            if n.fract() == 0.0 && n.is_finite() {
                out.extend_from_slice(format!("{:.1}", n).as_bytes());
            } else {
                out.extend_from_slice(format!("{}", n).as_bytes());
            }
            out.extend_from_slice(b"\r\n");
        }
        Value::Bulk(None) => {
            out.push(TAG_BULK);
            out.extend_from_slice(b"-1\r\n");
        }
        Value::Bulk(Some(data)) => {
            out.push(TAG_BULK);
            out.extend_from_slice(data.len().to_string().as_bytes());
            out.extend_from_slice(b"\r\n");
            out.extend_from_slice(data);
            out.extend_from_slice(b"\r\n");
        }
        Value::Array(items) => {
            out.push(TAG_ARRAY);
            out.extend_from_slice(items.len().to_string().as_bytes());
            out.extend_from_slice(b"\r\n");
            for item in items {
                encode(item, out);
            }
        }
        Value::Set(items) => {
            out.push(TAG_SET);
            out.extend_from_slice(items.len().to_string().as_bytes());
            out.extend_from_slice(b"\r\n");
            for item in items {
                encode(item, out);
            }
        }
        Value::Map(pairs) => {
            out.push(TAG_MAP);
            out.extend_from_slice(pairs.len().to_string().as_bytes());
            out.extend_from_slice(b"\r\n");
            for (k, v) in pairs {
                encode(k, out);
                encode(v, out);
            }
        }
        Value::Inline(_) => {
            // never produced by us as a response; if it ever is, fall back
            // to an empty bulk null rather than emit a bogus frame
            debug_assert!(false, "attempted to encode an inline value");
            out.push(TAG_BULK);
            out.extend_from_slice(b"-1\r\n");
        }
    }
}

/// Convenience: encode a single value into a freshly allocated buffer.
pub fn encode_to_vec(value: &Value) -> Vec<u8> {
    let mut out = Vec::with_capacity(32);
    encode(value, &mut out);
    out
}
