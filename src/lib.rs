//! Loopstream - file streams with run loop event notification
//!
//! Readable and writable file streams that report their lifecycle to a
//! cooperative run loop:
//!
//! - **Streams**: [`ReadableStream`] and [`WritableStream`] bind to a
//!   `file://` URI or a path, open once, transfer in bounded chunks, close
//! - **Events**: openCompleted, hasBytesAvailable, canAcceptBytes,
//!   errorOccurred and endEncountered, filtered per client by an [`EventMask`]
//! - **Run loop**: a single-threaded dispatcher delivering posted events to
//!   [`StreamClient`]s for streams scheduled in the running mode
//! - **Configuration**: one [`StreamConfig`] (mode + transfer buffer size)
//!   shared by every stream, loadable from `loopstream.toml`
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use loopstream::{ReadableStream, RunLoop, StreamConfig, WritableStream};
//!
//! let config = StreamConfig::default();
//! let mut run_loop = RunLoop::new();
//!
//! let mut writer = WritableStream::new("file:///tmp/loopstream.txt", &config)?;
//! writer.schedule(&run_loop);
//! if writer.open() && writer.write("hello World") {
//!     writer.close();
//! }
//!
//! let mut reader = ReadableStream::new("file:///tmp/loopstream.txt", &config)?;
//! reader.schedule(&run_loop);
//! if reader.open() {
//!     if let Some(text) = reader.read() {
//!         println!("{text}");
//!     }
//!     reader.close();
//! }
//!
//! run_loop.run_in_mode(config.mode(), Duration::from_secs(2), false);
//! # Ok::<(), loopstream::StreamError>(())
//! ```

pub mod config;
pub mod error;
pub mod runtime;
pub mod stream;

pub use config::{ConfigError, ConfigResult, StreamConfig};
pub use error::{StreamError, StreamResult};
pub use runtime::{
    EventMask, LoggingClient, RunLoop, RunLoopHandle, RunLoopMode, RunResult, StreamClient,
    StreamEvent, Token,
};
pub use stream::{Chunks, ReadableStream, StreamStatus, WritableStream};
