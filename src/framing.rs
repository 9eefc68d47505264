//! NETCONF message framing (RFC 6242)
//!
//! Two framings exist on the wire:
//! - end-of-message: each message is terminated by `]]>]]>` (base:1.0)
//! - chunked: each message is a sequence of `\n#<len>\n<data>` chunks
//!   closed by `\n##\n` (base:1.1)
//!
//! [`MessageBuffer`] accumulates partial reads and hands out complete
//! messages:
//!
//! ```
//! use rust_ydk::framing::{Framing, MessageBuffer};
//!
//! let mut buffer = MessageBuffer::new(Framing::Chunked);
//! let messages = buffer.push(b"\n#5\nhello\n##\n").unwrap();
//! assert_eq!(messages, vec![b"hello".to_vec()]);
//! ```

use std::fmt;
use std::io::Read;

use bytes::{Buf, Bytes, BytesMut};

use crate::error::{Result, YdkError};

/// Delimiter closing a message in end-of-message framing
pub const END_OF_MESSAGE: &[u8] = b"]]>]]>";

/// Largest chunk size allowed by RFC 6242
pub const MAX_CHUNK_SIZE: u64 = 4_294_967_295;

/// Default cap on one reassembled message
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

/// Digits in the largest chunk size
const MAX_CHUNK_DIGITS: usize = 10;

/// Bytes requested from the transport per read
const READ_SIZE: usize = 16 * 1024;

/// Framing mechanism in use on a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    /// `]]>]]>` delimited, used for hello and base:1.0 sessions
    #[default]
    EndOfMessage,
    /// Chunked framing, used once both peers advertise base:1.1
    Chunked,
}

impl Framing {
    /// Frame one message for the wire.
    ///
    /// In chunked framing the message is sent as a single chunk; an empty
    /// message cannot be chunk-encoded and yields just the end-of-chunks
    /// marker.
    pub fn encode(self, message: &[u8]) -> Vec<u8> {
        match self {
            Framing::EndOfMessage => {
                let mut out = Vec::with_capacity(message.len() + END_OF_MESSAGE.len());
                out.extend_from_slice(message);
                out.extend_from_slice(END_OF_MESSAGE);
                out
            }
            Framing::Chunked => {
                let mut out = Vec::with_capacity(message.len() + 20);
                if !message.is_empty() {
                    out.extend_from_slice(format!("\n#{}\n", message.len()).as_bytes());
                    out.extend_from_slice(message);
                }
                out.extend_from_slice(b"\n##\n");
                out
            }
        }
    }
}

impl fmt::Display for Framing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Framing::EndOfMessage => f.write_str("end-of-message"),
            Framing::Chunked => f.write_str("chunked"),
        }
    }
}

/// Chunked decoding state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkState {
    /// Waiting for `\n#<len>\n` or `\n##\n`
    Header,
    /// Header parsed, `remaining` chunk bytes still to come
    Data { remaining: usize },
}

/// Buffer accumulating incoming bytes and extracting complete messages.
///
/// Bytes live in one `BytesMut`; complete messages are split off its front
/// without copying in end-of-message framing.
#[derive(Debug)]
pub struct MessageBuffer {
    framing: Framing,
    buffer: BytesMut,
    /// Prefix of `buffer` already searched for `]]>]]>`
    scanned: usize,
    /// Chunks of the message being reassembled
    message: BytesMut,
    state: ChunkState,
    max_message_size: usize,
}

impl Default for MessageBuffer {
    fn default() -> Self {
        Self::new(Framing::EndOfMessage)
    }
}

impl MessageBuffer {
    pub fn new(framing: Framing) -> Self {
        Self::with_max_message_size(framing, DEFAULT_MAX_MESSAGE_SIZE)
    }

    pub fn with_max_message_size(framing: Framing, max_message_size: usize) -> Self {
        Self {
            framing,
            buffer: BytesMut::with_capacity(READ_SIZE),
            scanned: 0,
            message: BytesMut::new(),
            state: ChunkState::Header,
            max_message_size,
        }
    }

    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// Switch framing for subsequent messages.
    ///
    /// Bytes already buffered past the last complete message are decoded
    /// with the new framing.
    pub fn set_framing(&mut self, framing: Framing) {
        self.framing = framing;
        self.scanned = 0;
        self.message.clear();
        self.state = ChunkState::Header;
    }

    /// Append raw bytes without extracting messages
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Append raw bytes and extract every complete message.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Bytes>> {
        self.extend(data);
        let mut messages = Vec::new();
        while let Some(message) = self.next_message()? {
            messages.push(message);
        }
        Ok(messages)
    }

    /// Extract the next complete message, `Ok(None)` if more bytes are needed.
    pub fn next_message(&mut self) -> Result<Option<Bytes>> {
        match self.framing {
            Framing::EndOfMessage => self.next_delimited(),
            Framing::Chunked => self.next_chunked(),
        }
    }

    /// Block on `reader` until one complete message is available.
    ///
    /// End of stream before a complete message yields
    /// [`YdkError::ConnectionClosed`].
    pub fn read_message<R: Read + ?Sized>(&mut self, reader: &mut R) -> Result<Bytes> {
        let mut chunk = [0u8; READ_SIZE];
        loop {
            if let Some(message) = self.next_message()? {
                return Ok(message);
            }
            let n = reader.read(&mut chunk)?;
            if n == 0 {
                return Err(YdkError::ConnectionClosed);
            }
            self.extend(&chunk[..n]);
        }
    }

    /// Number of buffered bytes not yet part of a returned message
    pub fn len(&self) -> usize {
        self.buffer.len() + self.message.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
        self.message.clear();
        self.state = ChunkState::Header;
    }

    fn next_delimited(&mut self) -> Result<Option<Bytes>> {
        // a delimiter may straddle the previous scan boundary
        let start = self.scanned.saturating_sub(END_OF_MESSAGE.len() - 1);
        match find(&self.buffer[start..], END_OF_MESSAGE) {
            Some(pos) => {
                let message = self.buffer.split_to(start + pos).freeze();
                self.buffer.advance(END_OF_MESSAGE.len());
                self.scanned = 0;
                Ok(Some(message))
            }
            None if self.buffer.len() > self.max_message_size => Err(self.too_large()),
            None => {
                self.scanned = self.buffer.len();
                Ok(None)
            }
        }
    }

    fn next_chunked(&mut self) -> Result<Option<Bytes>> {
        loop {
            match self.state {
                ChunkState::Header => {
                    let Some(header) = self.parse_chunk_header()? else {
                        return Ok(None);
                    };
                    match header {
                        ChunkHeader::EndOfChunks => {
                            if self.message.is_empty() {
                                return Err(YdkError::Framing(
                                    "end-of-chunks marker before any chunk".into(),
                                ));
                            }
                            return Ok(Some(self.message.split().freeze()));
                        }
                        ChunkHeader::Chunk(size) => {
                            if self.message.len() + size > self.max_message_size {
                                return Err(self.too_large());
                            }
                            self.message.reserve(size);
                            self.state = ChunkState::Data { remaining: size };
                        }
                    }
                }
                ChunkState::Data { remaining } => {
                    let available = remaining.min(self.buffer.len());
                    if available == 0 {
                        return Ok(None);
                    }
                    self.message.extend_from_slice(&self.buffer[..available]);
                    self.buffer.advance(available);
                    self.state = match remaining - available {
                        0 => ChunkState::Header,
                        remaining => ChunkState::Data { remaining },
                    };
                }
            }
        }
    }

    /// Parse and consume a chunk header at the front of the buffer
    fn parse_chunk_header(&mut self) -> Result<Option<ChunkHeader>> {
        let buf = &self.buffer[..];
        if buf.first().is_some_and(|b| *b != b'\n') || buf.get(1).is_some_and(|b| *b != b'#') {
            return Err(YdkError::Framing("expected chunk header".into()));
        }
        if buf.len() < 3 {
            return Ok(None);
        }

        if buf[2] == b'#' {
            return match buf.get(3).copied() {
                None => Ok(None),
                Some(b'\n') => {
                    self.buffer.advance(4);
                    Ok(Some(ChunkHeader::EndOfChunks))
                }
                Some(_) => Err(YdkError::Framing("malformed end-of-chunks marker".into())),
            };
        }

        let Some(newline) = buf[2..].iter().position(|b| *b == b'\n').map(|p| p + 2) else {
            if buf.len() - 2 > MAX_CHUNK_DIGITS {
                return Err(YdkError::Framing("chunk size too long".into()));
            }
            if !buf[2..].iter().all(u8::is_ascii_digit) {
                return Err(YdkError::Framing("non-digit in chunk size".into()));
            }
            return Ok(None);
        };

        let size = parse_chunk_size(&buf[2..newline])?;
        self.buffer.advance(newline + 1);
        Ok(Some(ChunkHeader::Chunk(size)))
    }

    fn too_large(&self) -> YdkError {
        YdkError::Framing(format!(
            "message exceeds maximum size of {} bytes",
            self.max_message_size
        ))
    }
}

enum ChunkHeader {
    Chunk(usize),
    EndOfChunks,
}

fn parse_chunk_size(digits: &[u8]) -> Result<usize> {
    let valid = !digits.is_empty()
        && digits.len() <= MAX_CHUNK_DIGITS
        && digits[0] != b'0'
        && digits.iter().all(u8::is_ascii_digit);
    if !valid {
        return Err(YdkError::Framing(format!(
            "invalid chunk size '{}'",
            String::from_utf8_lossy(digits)
        )));
    }
    let size: u64 = std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| YdkError::Framing("invalid chunk size".into()))?;
    if size > MAX_CHUNK_SIZE {
        return Err(YdkError::Framing(format!("chunk size {} out of range", size)));
    }
    usize::try_from(size).map_err(|_| YdkError::Framing(format!("chunk size {} out of range", size)))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
