//! Readable file stream

use std::path::Path;

use bytes::Bytes;
use encoding_rs::{Decoder, UTF_8};
use tracing::debug;

use super::{FileHandle, StreamCore, StreamStatus};
use crate::config::StreamConfig;
use crate::error::{StreamError, StreamResult};
use crate::runtime::{EventMask, RunLoop, StreamClient, Token};

/// Sequential reader over a file, reporting events to a run loop.
///
/// Each [`read`](ReadableStream::read) performs at most one transfer of
/// `buffer_capacity` bytes. Callers drain the file by reading until
/// [`has_bytes_available`](ReadableStream::has_bytes_available) turns false,
/// or use [`chunks`](ReadableStream::chunks) to iterate to the end.
pub struct ReadableStream {
    core: StreamCore,
    handle: Option<FileHandle>,
    /// Holds an incomplete UTF-8 sequence between reads
    decoder: Decoder,
}

impl ReadableStream {
    /// Bind a reader to `locator` (a `file://` URI or a path) without opening it
    pub fn new(locator: &str, config: &StreamConfig) -> StreamResult<Self> {
        Ok(Self {
            core: StreamCore::new(locator, config)?,
            handle: None,
            decoder: UTF_8.new_decoder_without_bom_handling(),
        })
    }

    pub fn locator(&self) -> &str {
        self.core.locator()
    }

    pub fn path(&self) -> &Path {
        self.core.path()
    }

    pub fn token(&self) -> Token {
        self.core.token()
    }

    pub fn status(&self) -> StreamStatus {
        self.core.status()
    }

    /// The failure that moved the stream into [`StreamStatus::Error`]
    pub fn error(&self) -> Option<&StreamError> {
        self.core.error()
    }

    /// Replace the event client and the events it receives
    pub fn set_client(&mut self, mask: EventMask, client: Box<dyn StreamClient>) {
        self.core.set_client(mask, client);
    }

    /// Register with `run_loop` under the configured mode
    pub fn schedule(&mut self, run_loop: &RunLoop) {
        self.core.schedule(run_loop);
    }

    /// Stop receiving events; queued events for this stream are dropped
    pub fn unschedule(&mut self) {
        self.core.unschedule();
    }

    pub fn is_scheduled(&self) -> bool {
        self.core.is_scheduled()
    }

    /// Open the bound file, returning whether it succeeded
    pub fn open(&mut self) -> bool {
        match self.try_open() {
            Ok(()) => true,
            Err(e) => {
                debug!(locator = self.core.locator(), error = %e, "open refused");
                false
            }
        }
    }

    /// Open the bound file for reading
    ///
    /// Only a stream that was never opened can be opened; any other state
    /// yields [`StreamError::InvalidState`] and is left as it was.
    pub fn try_open(&mut self) -> StreamResult<()> {
        self.core.begin_open()?;

        let handle = match FileHandle::open_read(self.core.path()) {
            Ok(handle) => handle,
            Err(source) => {
                let err = StreamError::OpenFailed {
                    path: self.core.path().to_path_buf(),
                    source: source.into(),
                };
                return Err(self.core.fail(err));
            }
        };

        self.handle = Some(handle);
        self.core.mark_open();
        self.signal_availability()
    }

    /// Release the file; closing twice is a no-op
    pub fn close(&mut self) {
        if self.core.mark_closed() {
            self.handle = None;
        }
    }

    /// Whether the next read would return data
    pub fn has_bytes_available(&self) -> bool {
        if !self.core.status().is_open() {
            return false;
        }
        self.handle
            .as_ref()
            .and_then(|handle| handle.has_remaining().ok())
            .unwrap_or(false)
    }

    /// One bounded read into `buf`, returning the byte count (0 at end)
    ///
    /// Reads at most `min(buf.len(), buffer_capacity)` bytes.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> StreamResult<usize> {
        self.core.ensure_open()?;
        let capacity = buf.len().min(self.core.config().buffer_capacity());
        let handle = self.handle.as_mut().ok_or(StreamError::NotOpen)?;

        let read = match handle.read(&mut buf[..capacity]) {
            Ok(read) => read,
            Err(e) => return Err(self.core.fail(e.into())),
        };
        self.signal_availability()?;
        Ok(read)
    }

    /// One bounded read, decoded as UTF-8
    ///
    /// Returns `None` when the stream is not open or the read failed, and an
    /// empty string at end of stream. A multi-byte character split by the
    /// buffer boundary is returned whole by the following call, so one result
    /// may hold up to 3 bytes more than `buffer_capacity`.
    pub fn read(&mut self) -> Option<String> {
        let mut buf = vec![0u8; self.core.config().buffer_capacity()];
        let read = match self.read_bytes(&mut buf) {
            Ok(read) => read,
            Err(e) => {
                debug!(locator = self.core.locator(), error = %e, "read failed");
                return None;
            }
        };
        let last = self.core.status() == StreamStatus::AtEnd;
        Some(self.decode(&buf[..read], last))
    }

    /// Iterate over the remaining contents in chunks of at most `buffer_capacity` bytes
    pub fn chunks(&mut self) -> Chunks<'_> {
        Chunks {
            stream: self,
            done: false,
        }
    }

    /// Drain the stream and decode everything that remains
    pub fn read_to_string(&mut self) -> StreamResult<String> {
        let mut bytes = Vec::new();
        for chunk in self.chunks() {
            bytes.extend_from_slice(&chunk?);
        }
        Ok(self.decode(&bytes, true))
    }

    fn decode(&mut self, bytes: &[u8], last: bool) -> String {
        let capacity = self
            .decoder
            .max_utf8_buffer_length(bytes.len())
            .unwrap_or(bytes.len() * 3 + 4);
        let mut text = String::with_capacity(capacity);
        // Output is sized for the worst case, so the whole input is consumed
        let (_result, _read, _replaced) = self.decoder.decode_to_string(bytes, &mut text, last);
        if last {
            self.decoder = UTF_8.new_decoder_without_bom_handling();
        }
        text
    }

    /// Post hasBytesAvailable or endEncountered for the current position
    fn signal_availability(&mut self) -> StreamResult<()> {
        let Some(handle) = self.handle.as_ref() else {
            return Ok(());
        };
        match handle.has_remaining() {
            Ok(false) => self.core.mark_at_end(),
            Ok(true) => self.core.mark_available(),
            Err(e) => return Err(self.core.fail(e.into())),
        }
        Ok(())
    }
}

/// Finite iterator over a reader's remaining bytes.
///
/// Ends at end of stream or after yielding the first error. Restarting
/// requires a fresh stream.
pub struct Chunks<'a> {
    stream: &'a mut ReadableStream,
    done: bool,
}

impl Iterator for Chunks<'_> {
    type Item = StreamResult<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut buf = vec![0u8; self.stream.core.config().buffer_capacity()];
        match self.stream.read_bytes(&mut buf) {
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(read) => {
                buf.truncate(read);
                Some(Ok(Bytes::from(buf)))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
