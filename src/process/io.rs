//! Byte-level I/O primitives for reading engine output.

use std::io::ErrorKind;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::cancel::Cancel;
use crate::{Error, Result};

/// Delay before retrying a read that reported no data on an open stream.
const EMPTY_READ_BACKOFF: Duration = Duration::from_millis(1);

/// Outcome of a single [`CancellableReader::read`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// At least one byte was read into the buffer.
    Data(usize),
    /// The stream ended.
    Eof,
}

/// Turns "no data yet" reads into a blocking, abortable read.
///
/// Pipes may report that nothing is available while the writer is still
/// alive (`WouldBlock`, `Interrupted`). Those reads are retried after a short
/// backoff until data arrives, the stream ends, or the bound [`Cancel`]
/// fires. A cancellation never consumes bytes from the underlying source.
pub struct CancellableReader<R> {
    inner: R,
    cancel: Cancel,
}

impl<R: AsyncRead + Unpin> CancellableReader<R> {
    /// Wrap `inner`, aborting reads when `cancel` fires.
    pub fn new(inner: R, cancel: Cancel) -> Self {
        Self { inner, cancel }
    }

    /// Read into `buf`, waiting until at least one byte or end of stream.
    ///
    /// Returns a timeout-kind error if the bound cancellation fires first.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<ReadOutcome> {
        if buf.is_empty() {
            return Ok(ReadOutcome::Data(0));
        }

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    return Err(Error::timeout("cancelled before engine output arrived"));
                }
                result = self.inner.read(buf) => match result {
                    Ok(0) => return Ok(ReadOutcome::Eof),
                    Ok(n) => return Ok(ReadOutcome::Data(n)),
                    Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {}
                    Err(e) => return Err(Error::io(e)),
                },
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    return Err(Error::timeout("cancelled before engine output arrived"));
                }
                _ = tokio::time::sleep(EMPTY_READ_BACKOFF) => {}
            }
        }
    }

    /// Get a reference to the wrapped reader.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Unwrap, returning the underlying reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Splits a byte stream delivered in arbitrary chunks into lines.
///
/// Bytes after the last newline of a chunk are carried over and prepended
/// to the next chunk, so framing does not depend on where reads happen to
/// split the stream. A trailing `\r` is stripped from each line.
#[derive(Debug, Default, Clone)]
pub struct LineFramer {
    carry: Vec<u8>,
}

impl LineFramer {
    /// Create an empty framer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every line it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            let (head, tail) = rest.split_at(pos);
            if self.carry.is_empty() {
                lines.push(decode(head));
            } else {
                self.carry.extend_from_slice(head);
                lines.push(decode(&self.carry));
                self.carry.clear();
            }
            rest = &tail[1..];
        }

        self.carry.extend_from_slice(rest);
        lines
    }

    /// Flush the carried fragment once the stream has ended.
    pub fn finish(&mut self) -> Option<String> {
        if self.carry.is_empty() {
            return None;
        }
        let line = decode(&self.carry);
        self.carry.clear();
        Some(line)
    }

    /// Bytes received since the last newline.
    pub fn pending(&self) -> &[u8] {
        &self.carry
    }
}

fn decode(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
