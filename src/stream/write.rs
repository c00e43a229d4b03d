//! Writable file stream

use std::path::Path;

use tracing::debug;

use super::{FileHandle, StreamCore, StreamStatus};
use crate::config::StreamConfig;
use crate::error::{StreamError, StreamResult};
use crate::runtime::{EventMask, RunLoop, StreamClient, StreamEvent, Token};

/// Sequential writer to a file, reporting events to a run loop.
///
/// A single transfer moves at most `buffer_capacity` bytes.
/// [`write`](WritableStream::write) and [`write_all`](WritableStream::write_all)
/// keep transferring until the whole payload is on disk.
pub struct WritableStream {
    core: StreamCore,
    handle: Option<FileHandle>,
    append: bool,
}

impl WritableStream {
    /// Bind a writer to `locator` (a `file://` URI or a path) without opening it
    pub fn new(locator: &str, config: &StreamConfig) -> StreamResult<Self> {
        Ok(Self {
            core: StreamCore::new(locator, config)?,
            handle: None,
            append: false,
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

    /// Append to existing contents instead of truncating on open
    ///
    /// Only takes effect before `open`; returns whether it was accepted.
    pub fn set_append(&mut self, append: bool) -> bool {
        if self.core.status() != StreamStatus::NotOpen {
            return false;
        }
        self.append = append;
        true
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

    /// Create (or truncate, or append to) the bound file
    pub fn try_open(&mut self) -> StreamResult<()> {
        self.core.begin_open()?;

        let handle = match FileHandle::open_write(self.core.path(), self.append) {
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
        self.core.post(StreamEvent::CanAcceptBytes);
        Ok(())
    }

    /// Release the file; closing twice is a no-op
    pub fn close(&mut self) {
        if !self.core.mark_closed() {
            return;
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.sync_data() {
                debug!(locator = self.core.locator(), error = %e, "sync on close failed");
            }
        }
    }

    /// Whether a write would be accepted now
    pub fn can_accept_bytes(&self) -> bool {
        self.core.status() == StreamStatus::Open && self.handle.is_some()
    }

    /// One bounded write, returning how many bytes were taken
    ///
    /// Writes at most `buffer_capacity` bytes of `buf`; the caller must
    /// offer the rest again.
    pub fn write_bytes(&mut self, buf: &[u8]) -> StreamResult<usize> {
        let written = self.transfer(buf)?;
        if written > 0 {
            self.core.post(StreamEvent::CanAcceptBytes);
        }
        Ok(written)
    }

    /// Write every byte of `bytes`, transfer by transfer
    ///
    /// Posts a single canAcceptBytes once the payload is written. A transfer
    /// that makes no progress fails the stream with
    /// [`StreamError::PartialWrite`].
    pub fn write_all(&mut self, bytes: &[u8]) -> StreamResult<usize> {
        self.core.ensure_open()?;

        match transfer_all(bytes, |chunk| self.transfer(chunk)) {
            Ok(written) => {
                if written > 0 {
                    self.core.post(StreamEvent::CanAcceptBytes);
                }
                Ok(written)
            }
            Err(err @ StreamError::PartialWrite { .. }) => Err(self.core.fail(err)),
            // Transfer failures already moved the stream into Error
            Err(err) => Err(err),
        }
    }

    /// One bounded write without notifying the client
    fn transfer(&mut self, buf: &[u8]) -> StreamResult<usize> {
        self.core.ensure_open()?;
        let len = buf.len().min(self.core.config().buffer_capacity());
        let handle = self.handle.as_mut().ok_or(StreamError::NotOpen)?;
        if len == 0 {
            return Ok(0);
        }

        match handle.write(&buf[..len]) {
            Ok(written) => Ok(written),
            Err(e) => Err(self.core.fail(e.into())),
        }
    }

    /// Encode `content` as UTF-8 and write all of it
    ///
    /// Returns true only when the whole payload was written.
    pub fn write(&mut self, content: &str) -> bool {
        match self.write_all(content.as_bytes()) {
            Ok(_) => true,
            Err(e) => {
                debug!(locator = self.core.locator(), error = %e, "write failed");
                false
            }
        }
    }
}

/// Feed `bytes` to `transfer` until all of it is taken
fn transfer_all<F>(bytes: &[u8], mut transfer: F) -> StreamResult<usize>
where
    F: FnMut(&[u8]) -> StreamResult<usize>,
{
    let mut written = 0;
    while written < bytes.len() {
        let n = transfer(&bytes[written..])?;
        if n == 0 {
            return Err(StreamError::PartialWrite {
                written,
                expected: bytes.len(),
            });
        }
        written += n;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("loopstream_write_{}_{}", name, std::process::id()))
    }

    #[test]
    fn test_write_hello_world() {
        let path = temp_path("hello");
        let mut stream = WritableStream::new(path.to_str().unwrap(), &StreamConfig::default()).unwrap();

        assert!(stream.open());
        assert!(stream.can_accept_bytes());
        assert!(stream.write("hello World"));
        stream.close();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello World");

        // Cleanup
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_single_transfer_is_bounded() {
        let path = temp_path("bounded");
        let config = StreamConfig::new().with_buffer_capacity(8).unwrap();
        let mut stream = WritableStream::new(path.to_str().unwrap(), &config).unwrap();

        assert!(stream.open());
        assert_eq!(stream.write_bytes(b"0123456789abcdef!").unwrap(), 8);
        assert_eq!(stream.write_all(b"0123456789abcdef!").unwrap(), 17);
        stream.close();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "012345670123456789abcdef!"
        );

        // Cleanup
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_large_payload_written_completely() {
        let path = temp_path("large");
        let content = "é-".repeat(3000);
        let mut stream = WritableStream::new(path.to_str().unwrap(), &StreamConfig::default()).unwrap();

        assert!(stream.open());
        assert!(content.len() > 1024);
        assert!(stream.write(&content));
        stream.close();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), content);

        // Cleanup
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_write_requires_open_stream() {
        let path = temp_path("unopened");
        let mut stream = WritableStream::new(path.to_str().unwrap(), &StreamConfig::default()).unwrap();

        assert!(!stream.write("data"));
        assert!(!stream.write(""));
        assert!(matches!(stream.write_bytes(b"data"), Err(StreamError::NotOpen)));
        assert!(!stream.can_accept_bytes());
        assert!(!path.exists());

        assert!(stream.open());
        stream.close();
        assert!(!stream.write("data"));
        assert!(matches!(stream.write_all(b"data"), Err(StreamError::Closed)));

        // Cleanup
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_append_mode() {
        let path = temp_path("append");
        std::fs::write(&path, "first,").unwrap();

        let mut stream = WritableStream::new(path.to_str().unwrap(), &StreamConfig::default()).unwrap();
        assert!(stream.set_append(true));
        assert!(stream.open());
        assert!(!stream.set_append(false));
        assert!(stream.write("second"));
        stream.close();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first,second");

        // Cleanup
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_open_truncates() {
        let path = temp_path("truncate");
        std::fs::write(&path, "old contents").unwrap();

        let mut stream = WritableStream::new(path.to_str().unwrap(), &StreamConfig::default()).unwrap();
        assert!(stream.open());
        assert!(stream.write("new"));
        stream.close();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");

        // Cleanup
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_open_in_missing_directory() {
        let path = temp_path("no_such_dir").join("file.txt");
        let mut stream = WritableStream::new(path.to_str().unwrap(), &StreamConfig::default()).unwrap();

        assert!(!stream.open());
        assert_eq!(stream.status(), StreamStatus::Error);
        assert!(!stream.write("data"));
    }

    #[test]
    fn test_stalled_transfer_reports_partial_write() {
        let mut calls = 0;
        let result = transfer_all(b"0123456789", |chunk| {
            calls += 1;
            Ok(if calls == 1 { chunk.len().min(3) } else { 0 })
        });

        assert!(matches!(
            result,
            Err(StreamError::PartialWrite {
                written: 3,
                expected: 10
            })
        ));
    }

    #[test]
    fn test_transfer_all_loops_over_short_transfers() {
        let mut sizes = Vec::new();
        let written = transfer_all(b"0123456789", |chunk| {
            let n = chunk.len().min(4);
            sizes.push(n);
            Ok(n)
        })
        .unwrap();

        assert_eq!(written, 10);
        assert_eq!(sizes, vec![4, 4, 2]);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_failed_write_moves_to_error() {
        let mut stream = WritableStream::new("/dev/full", &StreamConfig::default()).unwrap();

        assert!(stream.open());
        assert!(!stream.write("hello"));
        assert_eq!(stream.status(), StreamStatus::Error);
        assert!(matches!(stream.error(), Some(StreamError::Io(_))));
        assert!(!stream.can_accept_bytes());
    }
}
