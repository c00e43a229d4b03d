//! Run loop runtime for stream event notification
//!
//! Streams report lifecycle events to a cooperative, single-threaded run
//! loop, which hands them to the clients registered for them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       RUN LOOP RUNTIME                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  RunLoop: Receives posted events, dispatches them per mode      │
//! │  Reactor: Tracks scheduled streams, masks and clients           │
//! │  StreamClient: Observes events for one stream                   │
//! │  Token: Identifies a stream inside the runtime                  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let mut run_loop = RunLoop::new();
//! let config = StreamConfig::default();
//!
//! let mut stream = ReadableStream::new("file:///tmp/data.txt", &config)?;
//! stream.schedule(&run_loop);
//! stream.open();
//!
//! // Deliver openCompleted / hasBytesAvailable to the stream's client
//! run_loop.run_in_mode(config.mode(), Duration::from_millis(100), false);
//! ```

mod event;
mod reactor;
mod run_loop;

pub use event::{EventMask, LoggingClient, StreamClient, StreamEvent};
pub(crate) use reactor::{share_client, SharedClient};
pub use run_loop::{RunLoop, RunLoopHandle, RunLoopMode, RunResult, COMMON_MODES, DEFAULT_MODE};

use std::sync::atomic::{AtomicU64, Ordering};

/// Global token counter for unique identification
static TOKEN_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique token identifying a stream inside the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token(pub u64);

/// Generate a unique token
pub fn next_token() -> Token {
    Token(TOKEN_COUNTER.fetch_add(1, Ordering::Relaxed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_generation() {
        let t1 = next_token();
        let t2 = next_token();
        assert_ne!(t1, t2);
    }
}
