//! Line oriented access to the modem's serial link.
//!
//! The modem has no framing beyond line terminators, and a response may span
//! several lines arriving in bursts. A receive cycle therefore collects bytes
//! until the link has been quiet for the configured idle gap.
use core::str::from_utf8;

use embassy_time::{with_timeout, Duration};
use embedded_io::ErrorKind;
use embedded_io_async::{Read, Write};
use heapless::Vec;

use crate::error::Error;

/// Capacity of one receive cycle.
pub const RESPONSE_CAPACITY: usize = 1024;

const READ_CHUNK: usize = 64;

/// Text captured during one receive cycle, untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse {
    bytes: Vec<u8, RESPONSE_CAPACITY>,
}

impl RawResponse {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The response as text. [`Transport::receive`] strips invalid UTF-8, so
    /// this only cuts short a response built some other way.
    pub fn as_str(&self) -> &str {
        match from_utf8(&self.bytes) {
            Ok(s) => s,
            Err(e) => from_utf8(&self.bytes[..e.valid_up_to()]).unwrap_or_default(),
        }
    }

    /// The response without the modem's echo of `command`.
    pub fn body(&self, command: &str) -> &str {
        let text = self.as_str();
        let unechoed = text
            .trim_start_matches(['\r', '\n'])
            .strip_prefix(command)
            .filter(|rest| rest.is_empty() || rest.starts_with(['\r', '\n']));

        unechoed.unwrap_or(text)
    }

    /// Append as much of `data` as fits, returning `false` if anything was
    /// cut off.
    fn extend(&mut self, data: &[u8]) -> bool {
        let room = self.bytes.capacity() - self.bytes.len();
        let take = data.len().min(room);
        // `take` never exceeds the remaining capacity
        let _ = self.bytes.extend_from_slice(&data[..take]);
        take == data.len()
    }

    /// Remove invalid UTF-8 sequences in place, returning the number of
    /// bytes removed.
    fn strip_invalid(&mut self) -> usize {
        if from_utf8(&self.bytes).is_ok() {
            return 0;
        }

        let mut valid: Vec<u8, RESPONSE_CAPACITY> = Vec::new();
        for chunk in self.bytes.utf8_chunks() {
            // never longer than the original
            let _ = valid.extend_from_slice(chunk.valid().as_bytes());
        }
        let removed = self.bytes.len() - valid.len();
        self.bytes = valid;
        removed
    }
}

impl From<&str> for RawResponse {
    fn from(text: &str) -> Self {
        let mut response = Self::default();
        response.extend(text.as_bytes());
        response
    }
}

/// Non-empty, trimmed lines of a response body.
pub fn lines(body: &str) -> impl Iterator<Item = &str> {
    body.lines().map(str::trim).filter(|l| !l.is_empty())
}

fn io_error<E: embedded_io::Error>(e: E) -> Error {
    Error::Transport(e.kind())
}

pub struct Transport<T> {
    io: T,
    idle_gap: Duration,
}

impl<T: Read + Write> Transport<T> {
    pub fn new(io: T, idle_gap: Duration) -> Self {
        Self { io, idle_gap }
    }

    /// Write `text` followed by CRLF.
    pub async fn send_line(&mut self, text: &str) -> Result<(), Error> {
        self.io.write_all(text.as_bytes()).await.map_err(io_error)?;
        self.io.write_all(b"\r\n").await.map_err(io_error)?;
        self.io.flush().await.map_err(io_error)
    }

    /// Collect one response.
    ///
    /// Waits up to `window` for the first bytes, then keeps reading until the
    /// link is idle. Bytes beyond [`RESPONSE_CAPACITY`] are discarded.
    pub async fn receive(&mut self, window: Duration) -> Result<RawResponse, Error> {
        let mut chunk = [0u8; READ_CHUNK];
        let mut response = RawResponse::default();

        let n = with_timeout(window, self.io.read(&mut chunk))
            .await?
            .map_err(io_error)?;
        if n == 0 {
            return Err(Error::Transport(ErrorKind::BrokenPipe));
        }

        let mut complete = response.extend(&chunk[..n]);
        loop {
            match with_timeout(self.idle_gap, self.io.read(&mut chunk)).await {
                Ok(Ok(0)) | Err(_) => break,
                Ok(Ok(n)) => complete &= response.extend(&chunk[..n]),
                Ok(Err(e)) => return Err(io_error(e)),
            }
        }

        if !complete {
            warn!(
                "Response exceeded {} bytes, remainder dropped",
                RESPONSE_CAPACITY
            );
        }
        let invalid = response.strip_invalid();
        if invalid > 0 {
            warn!("Dropped {} bytes of invalid UTF-8", invalid);
        }
        trace!("Received {} bytes", response.as_bytes().len());
        Ok(response)
    }

    /// Discard everything pending on the link, returning the byte count.
    pub async fn drain(&mut self) -> Result<usize, Error> {
        let mut chunk = [0u8; READ_CHUNK];
        let mut dropped = 0;
        loop {
            match with_timeout(self.idle_gap, self.io.read(&mut chunk)).await {
                Ok(Ok(0)) | Err(_) => return Ok(dropped),
                Ok(Ok(n)) => dropped += n,
                Ok(Err(e)) => return Err(io_error(e)),
            }
        }
    }
}
