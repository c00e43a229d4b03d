//! File streams with run loop event notification
//!
//! [`ReadableStream`] and [`WritableStream`] are symmetric: both are bound to
//! a resource at construction, opened once, used for bounded transfers and
//! closed. While scheduled on a [`RunLoop`] they post [`StreamEvent`]s to it.
//!
//! ```text
//!   NotOpen ──open()──▶ Open ──drained──▶ AtEnd
//!      │                 │                 │
//!      │                 └──── failure ────┴──▶ Error
//!      └────────────── close() ───────────────▶ Closed
//! ```
//!
//! A stream never returns to `NotOpen`; a closed stream cannot be reopened.

mod file;
mod locator;
mod read;
mod write;

pub(crate) use file::FileHandle;
pub use locator::resolve;
pub use read::{Chunks, ReadableStream};
pub use write::WritableStream;

use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};

use crate::config::StreamConfig;
use crate::error::{StreamError, StreamResult};
use crate::runtime::{
    next_token, share_client, EventMask, LoggingClient, RunLoop, RunLoopHandle, SharedClient,
    StreamClient, StreamEvent, Token,
};

/// Lifecycle state of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamStatus {
    /// Bound to a resource, not opened yet
    NotOpen,
    /// Open and usable
    Open,
    /// Reader consumed every byte of the resource
    AtEnd,
    /// Closed by the caller
    Closed,
    /// A failure made the stream unusable
    Error,
}

impl StreamStatus {
    /// Whether transfers are allowed in this state
    pub fn is_open(&self) -> bool {
        matches!(self, StreamStatus::Open | StreamStatus::AtEnd)
    }
}

/// State shared by both stream directions: binding, status and scheduling
pub(crate) struct StreamCore {
    locator: String,
    path: PathBuf,
    config: StreamConfig,
    token: Token,
    status: StreamStatus,
    error: Option<StreamError>,
    mask: EventMask,
    client: SharedClient,
    scheduled: Option<RunLoopHandle>,
}

impl StreamCore {
    pub(crate) fn new(locator: &str, config: &StreamConfig) -> StreamResult<Self> {
        let path = resolve(locator)?;
        let token = next_token();
        debug!(token = token.0, path = %path.display(), "binding stream");

        Ok(Self {
            locator: locator.to_string(),
            path,
            config: config.clone(),
            token,
            status: StreamStatus::NotOpen,
            error: None,
            mask: EventMask::ALL,
            client: share_client(Box::new(LoggingClient::new(locator))),
            scheduled: None,
        })
    }

    pub(crate) fn locator(&self) -> &str {
        &self.locator
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub(crate) fn token(&self) -> Token {
        self.token
    }

    pub(crate) fn status(&self) -> StreamStatus {
        self.status
    }

    pub(crate) fn error(&self) -> Option<&StreamError> {
        self.error.as_ref()
    }

    pub(crate) fn set_client(&mut self, mask: EventMask, client: Box<dyn StreamClient>) {
        self.mask = mask;
        self.client = share_client(client);
        if let Some(handle) = &self.scheduled {
            handle.set_client(self.token, mask, self.client.clone());
        }
    }

    pub(crate) fn schedule(&mut self, run_loop: &RunLoop) {
        if self.scheduled.is_some() {
            trace!(token = self.token.0, "stream already scheduled");
            return;
        }
        let handle = run_loop.handle();
        handle.register(
            self.token,
            self.config.mode.clone(),
            self.mask,
            self.client.clone(),
        );
        self.scheduled = Some(handle);
    }

    pub(crate) fn unschedule(&mut self) {
        if let Some(handle) = self.scheduled.take() {
            handle.deregister(self.token);
        }
    }

    pub(crate) fn is_scheduled(&self) -> bool {
        self.scheduled.is_some()
    }

    /// Hand an event to the run loop; dropped when not scheduled
    pub(crate) fn post(&self, event: StreamEvent) {
        match &self.scheduled {
            Some(handle) => handle.post(self.token, event),
            None => trace!(token = self.token.0, %event, "not scheduled, event dropped"),
        }
    }

    /// Check that `open` may proceed; leaves state untouched on refusal
    pub(crate) fn begin_open(&self) -> StreamResult<()> {
        match self.status {
            StreamStatus::NotOpen => Ok(()),
            status => Err(StreamError::InvalidState(status)),
        }
    }

    pub(crate) fn mark_open(&mut self) {
        debug!(token = self.token.0, path = %self.path.display(), "stream opened");
        self.status = StreamStatus::Open;
        self.post(StreamEvent::OpenCompleted);
    }

    pub(crate) fn mark_at_end(&mut self) {
        if self.status != StreamStatus::AtEnd {
            self.status = StreamStatus::AtEnd;
            self.post(StreamEvent::EndEncountered);
        }
    }

    pub(crate) fn mark_available(&mut self) {
        self.status = StreamStatus::Open;
        self.post(StreamEvent::HasBytesAvailable);
    }

    /// Move into the error state, returning the error for the caller
    pub(crate) fn fail(&mut self, err: StreamError) -> StreamError {
        warn!(token = self.token.0, path = %self.path.display(), error = %err, "stream failed");
        self.status = StreamStatus::Error;
        self.error = Some(err.clone());
        self.post(StreamEvent::ErrorOccurred);
        err
    }

    /// Check that a transfer may proceed
    pub(crate) fn ensure_open(&self) -> StreamResult<()> {
        match self.status {
            StreamStatus::Open | StreamStatus::AtEnd => Ok(()),
            StreamStatus::NotOpen => Err(StreamError::NotOpen),
            StreamStatus::Closed => Err(StreamError::Closed),
            StreamStatus::Error => Err(self.error.clone().unwrap_or(StreamError::NotOpen)),
        }
    }

    /// Returns false when the stream was already closed
    pub(crate) fn mark_closed(&mut self) -> bool {
        if self.status == StreamStatus::Closed {
            return false;
        }
        debug!(token = self.token.0, path = %self.path.display(), "stream closed");
        self.status = StreamStatus::Closed;
        true
    }
}

impl Drop for StreamCore {
    fn drop(&mut self) {
        self.unschedule();
    }
}
