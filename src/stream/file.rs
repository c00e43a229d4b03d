//! File handle owned by a stream
//!
//! Thin wrapper over [`std::fs::File`] that tracks the stream position so
//! readers can answer "are more bytes available" without seeking.
//!
//! Regular files report their length, so availability is `position < len`.
//! Pipes, character devices and `/proc` entries report a length that says
//! nothing about their contents; for those, bytes count as available until a
//! read returns 0. A regular file reporting length 0 is peeked at with a one-byte
//! read at open to tell an empty file from a `/proc` entry.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;

/// Open file behind a readable or writable stream
#[derive(Debug)]
pub(crate) struct FileHandle {
    file: File,
    /// Bytes read or written since open (plus the initial length when appending)
    position: u64,
    /// Whether `len()` describes the readable contents
    sized: bool,
    /// A read returned 0
    exhausted: bool,
    /// Byte consumed by the open-time peek, handed out by the next read
    lookahead: Option<u8>,
}

impl FileHandle {
    /// Open an existing file for reading
    ///
    /// Directories are rejected here, since reading them always fails.
    pub(crate) fn open_read(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).open(path)?;
        let metadata = file.metadata()?;
        let file_type = metadata.file_type();
        if file_type.is_dir() {
            return Err(io::Error::other(format!(
                "{} is a directory",
                path.display()
            )));
        }

        let len = metadata.len();
        let mut handle = Self {
            file,
            position: 0,
            sized: file_type.is_file() && len > 0,
            exhausted: false,
            lookahead: None,
        };
        if file_type.is_file() && len == 0 {
            handle.peek()?;
        }
        Ok(handle)
    }

    /// Read one byte ahead to learn whether an unsized file has contents
    fn peek(&mut self) -> io::Result<()> {
        let mut byte = [0u8; 1];
        if self.read_file(&mut byte)? == 0 {
            self.exhausted = true;
        } else {
            self.lookahead = Some(byte[0]);
        }
        Ok(())
    }

    /// Open a file for writing, creating it if needed
    ///
    /// Truncates existing contents unless `append` is set.
    pub(crate) fn open_write(path: &Path, append: bool) -> io::Result<Self> {
        let mut options = OpenOptions::new();
        options.write(true).create(true);
        if append {
            options.append(true);
        } else {
            options.truncate(true);
        }

        let file = options.open(path)?;
        let metadata = file.metadata()?;
        let position = if append { metadata.len() } else { 0 };
        Ok(Self {
            file,
            position,
            sized: metadata.is_file(),
            exhausted: false,
            lookahead: None,
        })
    }

    /// Current length of the file on disk
    pub(crate) fn len(&self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Whether a read from the current position would return data
    pub(crate) fn has_remaining(&self) -> io::Result<bool> {
        if self.lookahead.is_some() {
            return Ok(true);
        }
        if self.exhausted {
            return Ok(false);
        }
        if !self.sized {
            return Ok(true);
        }
        Ok(self.len()? > self.position)
    }

    /// Single read; retried only when interrupted by a signal
    pub(crate) fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if let Some(byte) = self.lookahead.take() {
            // Already counted in `position` by the peek
            buf[0] = byte;
            return Ok(1 + self.read_file(&mut buf[1..])?);
        }
        let n = self.read_file(buf)?;
        if n == 0 {
            self.exhausted = true;
        }
        Ok(n)
    }

    fn read_file(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            match self.file.read(buf) {
                Ok(n) => {
                    self.position += n as u64;
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Single write; retried only when interrupted by a signal
    pub(crate) fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        loop {
            match self.file.write(buf) {
                Ok(n) => {
                    self.position += n as u64;
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Sync file contents to disk
    pub(crate) fn sync_data(&self) -> io::Result<()> {
        self.file.sync_data()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("loopstream_file_{}_{}", name, std::process::id()))
    }

    #[test]
    fn test_file_create_and_write() {
        let path = temp_path("write");

        let mut file = FileHandle::open_write(&path, false).unwrap();
        let written = file.write(b"hello world").unwrap();
        assert_eq!(written, 11);
        assert_eq!(file.position, 11);
        drop(file);

        assert_eq!(std::fs::read(&path).unwrap(), b"hello world");

        // Cleanup
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_file_read_tracks_remaining() {
        let path = temp_path("read");
        std::fs::write(&path, "test content").unwrap();

        let mut file = FileHandle::open_read(&path).unwrap();
        assert!(file.has_remaining().unwrap());

        let mut buf = [0u8; 4];
        let read = file.read(&mut buf).unwrap();
        assert_eq!(read, 4);
        assert_eq!(&buf, b"test");
        assert!(file.has_remaining().unwrap());

        let mut rest = [0u8; 64];
        let read = file.read(&mut rest).unwrap();
        assert_eq!(&rest[..read], b" content");
        assert!(!file.has_remaining().unwrap());

        // Cleanup
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_append_keeps_contents() {
        let path = temp_path("append");
        std::fs::write(&path, "abc").unwrap();

        let mut file = FileHandle::open_write(&path, true).unwrap();
        assert_eq!(file.position, 3);
        file.write(b"def").unwrap();
        drop(file);

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "abcdef");

        // Cleanup
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_open_missing_file() {
        let path = temp_path("missing");
        let err = FileHandle::open_read(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_empty_file_exhausted_at_open() {
        let path = temp_path("empty");
        std::fs::write(&path, "").unwrap();

        let mut file = FileHandle::open_read(&path).unwrap();
        assert!(!file.has_remaining().unwrap());
        let mut buf = [0u8; 8];
        assert_eq!(file.read(&mut buf).unwrap(), 0);

        // Cleanup
        std::fs::remove_file(&path).ok();
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_directory_rejected() {
        assert!(FileHandle::open_read(&std::env::temp_dir()).is_err());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_proc_file_available_until_exhausted() {
        // /proc entries report a length of 0 but have contents
        let mut file = FileHandle::open_read(Path::new("/proc/self/status")).unwrap();
        assert_eq!(file.len().unwrap(), 0);
        assert!(file.has_remaining().unwrap());

        let mut buf = [0u8; 256];
        let read = file.read(&mut buf).unwrap();
        assert!(buf[..read].starts_with(b"Name:"));
        while file.read(&mut buf).unwrap() > 0 {}
        assert!(file.position > 0);
        assert!(!file.has_remaining().unwrap());
    }
}
