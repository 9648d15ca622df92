//! Wire codec: newline framing over a raw byte stream, plus the tagged
//! decode of server-to-client records.
//!
//! TCP delivers arbitrary slices of the stream, so a receiver must buffer
//! partial reads and only consume a record once its terminating `\n` has
//! arrived. [`FrameBuffer`] implements that rule; [`ServerRecord::decode`]
//! turns a complete line into a strongly-typed record by inspecting the
//! discriminant key exactly once.

use crate::entities::{Beam, Powerup, Projectile, Tank, Wall};
use serde::Serialize;
use std::fmt;

/// Why a received line could not be turned into a record.
#[derive(Debug)]
pub enum DecodeError {
    /// The line was not valid UTF-8.
    NotUtf8,
    /// The line was not valid JSON, or its fields did not match the record.
    Json(serde_json::Error),
    /// The object carried none of the known discriminant keys.
    UnknownShape,
    /// The object carried more than one discriminant key.
    Ambiguous,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::NotUtf8 => write!(f, "line is not valid UTF-8"),
            DecodeError::Json(e) => write!(f, "malformed record: {}", e),
            DecodeError::UnknownShape => write!(f, "record matches no known shape"),
            DecodeError::Ambiguous => write!(f, "record matches multiple shapes"),
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<serde_json::Error> for DecodeError {
    fn from(e: serde_json::Error) -> Self {
        DecodeError::Json(e)
    }
}

/// Accumulates raw bytes and yields complete newline-terminated lines.
///
/// Bytes after the last `\n` stay buffered until more data arrives, so
/// split and merged deliveries both come out as whole records.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: Vec<u8>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends freshly received bytes to the buffer.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pops the next complete line, without its terminator. Returns `None`
    /// while no full line is buffered; a non-UTF-8 line is consumed and
    /// reported as an error so the stream can continue.
    pub fn next_line(&mut self) -> Option<Result<String, DecodeError>> {
        let pos = self.buf.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.buf.drain(..=pos).take(pos).collect();
        Some(String::from_utf8(line).map_err(|_| DecodeError::NotUtf8))
    }

    /// Bytes still waiting for a terminator.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

/// One server-to-client record, decoded from its discriminant key.
#[derive(Debug, Clone)]
pub enum ServerRecord {
    Tank(Tank),
    Projectile(Projectile),
    Wall(Wall),
    Powerup(Powerup),
    Beam(Beam),
}

/// Discriminant keys, one per record shape.
const TAGS: [&str; 5] = ["tank", "proj", "wall", "power", "beam"];

impl ServerRecord {
    /// Decodes one line into a typed record. Exactly one discriminant key
    /// must be present; zero or several is a protocol error.
    pub fn decode(line: &str) -> Result<ServerRecord, DecodeError> {
        let value: serde_json::Value = serde_json::from_str(line)?;
        let obj = value.as_object().ok_or(DecodeError::UnknownShape)?;

        let mut matches = TAGS.iter().filter(|tag| obj.contains_key(**tag));
        let tag = *matches.next().ok_or(DecodeError::UnknownShape)?;
        if matches.next().is_some() {
            return Err(DecodeError::Ambiguous);
        }

        Ok(match tag {
            "tank" => ServerRecord::Tank(serde_json::from_value(value)?),
            "proj" => ServerRecord::Projectile(serde_json::from_value(value)?),
            "wall" => ServerRecord::Wall(serde_json::from_value(value)?),
            "power" => ServerRecord::Powerup(serde_json::from_value(value)?),
            _ => ServerRecord::Beam(serde_json::from_value(value)?),
        })
    }
}

/// Serializes a record as one newline-terminated JSON line.
pub fn to_line<T: Serialize>(record: &T) -> Result<String, serde_json::Error> {
    let mut line = serde_json::to_string(record)?;
    line.push('\n');
    Ok(line)
}
