//! NDJSON stream decoding (Bytes -> one JSON value per line).

use crate::{BoxStream, Error};
use bytes::Bytes;
use futures::{stream, StreamExt};
use serde_json::Value;

/// Decode a newline-delimited JSON byte stream.
///
/// Lines may be split across chunks; the buffer is kept as raw bytes so multi-byte
/// UTF-8 sequences that straddle a chunk boundary survive. Blank lines are skipped.
/// A malformed line yields an [`Error::Serialization`] item and decoding continues.
pub fn decode_ndjson(input: BoxStream<'static, Bytes>) -> BoxStream<'static, Value> {
    let stream = stream::unfold(
        (input, LineBuffer::default(), false),
        move |(mut input, mut lines, mut finished)| async move {
            loop {
                if let Some(line) = lines.next_line() {
                    let line = trim_ascii(&line);
                    if line.is_empty() {
                        continue;
                    }
                    let item = serde_json::from_slice::<Value>(line).map_err(Error::Serialization);
                    return Some((item, (input, lines, finished)));
                }

                if finished {
                    let rest = lines.take_rest();
                    let rest = trim_ascii(&rest);
                    if rest.is_empty() {
                        return None;
                    }
                    let item = serde_json::from_slice::<Value>(rest).map_err(Error::Serialization);
                    return Some((item, (input, lines, finished)));
                }

                match input.next().await {
                    Some(Ok(bytes)) => lines.push(&bytes),
                    Some(Err(e)) => return Some((Err(e), (input, lines, finished))),
                    None => finished = true,
                }
            }
        },
    );

    Box::pin(stream)
}

/// Byte buffer that hands out complete lines.
///
/// `start` marks the first unconsumed byte and `scanned` how far a newline search has
/// already looked, so a long line arriving in many chunks is only scanned once.
#[derive(Default)]
struct LineBuffer {
    buf: Vec<u8>,
    start: usize,
    scanned: usize,
}

impl LineBuffer {
    fn push(&mut self, bytes: &[u8]) {
        if self.start > 0 {
            self.buf.drain(..self.start);
            self.scanned -= self.start;
            self.start = 0;
        }
        self.buf.extend_from_slice(bytes);
    }

    /// Next complete line without its trailing newline.
    fn next_line(&mut self) -> Option<Vec<u8>> {
        let from = self.start.max(self.scanned);
        match self.buf[from..].iter().position(|b| *b == b'\n') {
            Some(offset) => {
                let end = from + offset;
                let line = self.buf[self.start..end].to_vec();
                self.start = end + 1;
                self.scanned = self.start;
                Some(line)
            }
            None => {
                self.scanned = self.buf.len();
                None
            }
        }
    }

    /// Whatever follows the last newline; leaves the buffer empty.
    fn take_rest(&mut self) -> Vec<u8> {
        let rest = self.buf.split_off(self.start);
        self.buf.clear();
        self.start = 0;
        self.scanned = 0;
        rest
    }
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map(|i| i + 1)
        .unwrap_or(start);
    &bytes[start..end.max(start)]
}
