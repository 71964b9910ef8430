use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{FrameError, Result};

/// Terminator appended to every outbound frame.
pub const LINE_TERMINATOR: &str = "\r\n";

/// Default upper bound for a single inbound line: 64 KiB.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

/// Newline-delimited frame codec.
///
/// Decoding yields one trimmed line per `\n`; partial trailing data stays in
/// the buffer until the rest arrives. Blank lines are skipped. Bytes are
/// treated as Latin-1, so every byte maps to exactly one `char`.
///
/// Encoding appends CRLF and writes each `char` as a single Latin-1 byte.
#[derive(Debug, Clone)]
pub struct BladeCodec {
    max_line_length: usize,
    /// Offset already scanned for a newline, so partial reads are not rescanned.
    next_index: usize,
    /// Set after an oversized line was dropped; bytes up to the next `\n`
    /// belong to that line and are skipped.
    is_discarding: bool,
}

impl BladeCodec {
    pub fn new() -> Self {
        Self::with_max_line_length(DEFAULT_MAX_LINE_LENGTH)
    }

    pub fn with_max_line_length(max_line_length: usize) -> Self {
        Self {
            max_line_length,
            next_index: 0,
            is_discarding: false,
        }
    }

    pub fn max_line_length(&self) -> usize {
        self.max_line_length
    }

    /// Forget any scan progress. Call when the underlying buffer is replaced.
    pub fn reset(&mut self) {
        self.next_index = 0;
        self.is_discarding = false;
    }
}

impl Default for BladeCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for BladeCodec {
    type Item = String;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        loop {
            let newline = src[self.next_index..].iter().position(|&b| b == b'\n');

            if self.is_discarding {
                match newline {
                    Some(offset) => {
                        src.advance(self.next_index + offset + 1);
                        self.next_index = 0;
                        self.is_discarding = false;
                        continue;
                    }
                    None => {
                        src.clear();
                        self.next_index = 0;
                        return Ok(None);
                    }
                }
            }

            let Some(offset) = newline else {
                self.next_index = src.len();
                if src.len() > self.max_line_length {
                    let len = src.len();
                    src.clear();
                    self.next_index = 0;
                    self.is_discarding = true;
                    return Err(FrameError::LineTooLong {
                        len,
                        max: self.max_line_length,
                    });
                }
                return Ok(None);
            };

            let end = self.next_index + offset;
            self.next_index = 0;
            let line = src.split_to(end + 1);
            if end > self.max_line_length {
                return Err(FrameError::LineTooLong {
                    len: end,
                    max: self.max_line_length,
                });
            }

            let text = latin1_to_string(&line);
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                return Ok(Some(trimmed.to_string()));
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        self.next_index = 0;
        if self.is_discarding {
            self.is_discarding = false;
            src.clear();
        }
        if src.is_empty() {
            return Ok(None);
        }
        let rest = src.split();
        let text = latin1_to_string(&rest);
        let trimmed = text.trim();
        Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
    }
}

impl Encoder<&str> for BladeCodec {
    type Error = FrameError;

    fn encode(&mut self, frame: &str, dst: &mut BytesMut) -> Result<()> {
        encode_line(frame, dst)
    }
}

impl Encoder<String> for BladeCodec {
    type Error = FrameError;

    fn encode(&mut self, frame: String, dst: &mut BytesMut) -> Result<()> {
        encode_line(&frame, dst)
    }
}

/// Append `frame` plus CRLF to `dst` as Latin-1 bytes.
///
/// Nothing is written if the frame cannot be represented.
pub fn encode_line(frame: &str, dst: &mut BytesMut) -> Result<()> {
    ensure_encodable(frame)?;
    let bytes = string_to_latin1(frame)?;
    dst.reserve(bytes.len() + LINE_TERMINATOR.len());
    dst.put_slice(&bytes);
    dst.put_slice(LINE_TERMINATOR.as_bytes());
    Ok(())
}

/// Check that `frame` fits on one Latin-1 line without encoding it.
pub fn ensure_encodable(frame: &str) -> Result<()> {
    if frame.contains(['\r', '\n']) {
        return Err(FrameError::InvalidCommand(
            "frame must not contain line breaks".into(),
        ));
    }
    if let Some(c) = frame.chars().find(|&c| u32::from(c) > 0xFF) {
        return Err(FrameError::InvalidCommand(format!(
            "character {c:?} cannot be encoded as Latin-1"
        )));
    }
    Ok(())
}

fn latin1_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn string_to_latin1(text: &str) -> Result<Vec<u8>> {
    text.chars()
        .map(|c| {
            u8::try_from(u32::from(c)).map_err(|_| {
                FrameError::InvalidCommand(format!(
                    "character {c:?} cannot be encoded as Latin-1"
                ))
            })
        })
        .collect()
}
