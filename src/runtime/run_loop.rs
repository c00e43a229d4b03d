//! Cooperative run loop delivering stream events
//!
//! Streams never call their clients directly. They post events to the run
//! loop they are scheduled on, and the loop hands those events to the
//! registered clients while a thread is inside [`RunLoop::run_in_mode`].
//! Delivery is single-threaded and in posting order.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::reactor::{Reactor, Route, SharedClient};
use super::{EventMask, StreamEvent, Token};

/// Name of the mode whose registrations fire in every mode
pub const COMMON_MODES: &str = "commonModes";

/// Name of the default run loop mode
pub const DEFAULT_MODE: &str = "defaultMode";

/// Named scheduling domain of a run loop
///
/// A stream scheduled under mode `M` only receives events while the loop
/// runs in `M`, unless `M` is the common mode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunLoopMode(String);

impl RunLoopMode {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The common mode
    pub fn common() -> Self {
        Self::new(COMMON_MODES)
    }

    pub fn default_mode() -> Self {
        Self::new(DEFAULT_MODE)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_common(&self) -> bool {
        self.0 == COMMON_MODES
    }

    /// Whether a registration under `self` fires while running in `running`
    pub fn fires_in(&self, running: &RunLoopMode) -> bool {
        self.is_common() || self == running
    }
}

impl Default for RunLoopMode {
    fn default() -> Self {
        Self::common()
    }
}

impl fmt::Display for RunLoopMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why [`RunLoop::run_in_mode`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunResult {
    /// Nothing is scheduled in the requested mode
    Finished,
    /// [`RunLoopHandle::stop`] was called
    Stopped,
    /// The timeout elapsed
    TimedOut,
    /// At least one event was delivered and the caller asked to return early
    HandledSource,
}

enum Message {
    Event { token: Token, event: StreamEvent },
    Wake,
    Stop,
}

/// Cloneable, sendable access to a run loop
///
/// Streams hold one while scheduled. Other threads may use one to
/// [`stop`](RunLoopHandle::stop) or [`wake`](RunLoopHandle::wake) the loop.
#[derive(Clone)]
pub struct RunLoopHandle {
    reactor: Arc<Mutex<Reactor>>,
    sender: Sender<Message>,
}

impl RunLoopHandle {
    pub(crate) fn register(&self, token: Token, mode: RunLoopMode, mask: EventMask, client: SharedClient) {
        debug!(token = token.0, %mode, "scheduling stream");
        self.reactor.lock().insert(token, mode, mask, client);
    }

    pub(crate) fn deregister(&self, token: Token) -> bool {
        debug!(token = token.0, "unscheduling stream");
        self.reactor.lock().remove(token)
    }

    pub(crate) fn set_client(&self, token: Token, mask: EventMask, client: SharedClient) {
        self.reactor.lock().set_client(token, mask, client);
    }

    /// Queue an event for delivery on the loop's next pass
    pub(crate) fn post(&self, token: Token, event: StreamEvent) {
        trace!(token = token.0, %event, "posting event");
        if self.sender.send(Message::Event { token, event }).is_err() {
            trace!(token = token.0, %event, "run loop gone, event dropped");
        }
    }

    /// Make the current (or next) run return [`RunResult::Stopped`]
    pub fn stop(&self) {
        let _ = self.sender.send(Message::Stop);
    }

    /// Interrupt a run that is waiting for events
    pub fn wake(&self) {
        let _ = self.sender.send(Message::Wake);
    }
}

/// Single-threaded event dispatcher for scheduled streams
pub struct RunLoop {
    handle: RunLoopHandle,
    receiver: Receiver<Message>,
    /// Events received but waiting for their mode to run; holds each
    /// (token, event) pair at most once after a dispatch pass
    pending: VecDeque<(Token, StreamEvent)>,
}

impl RunLoop {
    /// Create a new run loop with nothing scheduled
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            handle: RunLoopHandle {
                reactor: Arc::new(Mutex::new(Reactor::new())),
                sender,
            },
            receiver,
            pending: VecDeque::new(),
        }
    }

    /// Get a handle for scheduling streams or stopping the loop
    pub fn handle(&self) -> RunLoopHandle {
        self.handle.clone()
    }

    /// Whether `token` is currently scheduled on this loop
    pub fn is_scheduled(&self, token: Token) -> bool {
        self.handle.reactor.lock().is_registered(token)
    }

    /// Number of scheduled streams
    pub fn registrations(&self) -> usize {
        self.handle.reactor.lock().len()
    }

    /// Run the loop in `mode`, delivering events until `timeout` elapses
    ///
    /// Returns immediately with [`RunResult::Finished`] when nothing is
    /// scheduled in `mode`. With `return_after_source_handled`, returns as
    /// soon as a pass delivered at least one event.
    pub fn run_in_mode(
        &mut self,
        mode: &RunLoopMode,
        timeout: Duration,
        return_after_source_handled: bool,
    ) -> RunResult {
        let deadline = Instant::now() + timeout;
        debug!(%mode, ?timeout, "running loop");

        loop {
            if !self.handle.reactor.lock().has_sources_in(mode) {
                return RunResult::Finished;
            }

            while let Ok(message) = self.receiver.try_recv() {
                if self.accept(message) {
                    return RunResult::Stopped;
                }
            }

            let handled = self.dispatch(mode);
            if return_after_source_handled && handled > 0 {
                return RunResult::HandledSource;
            }

            let now = Instant::now();
            if now >= deadline {
                return RunResult::TimedOut;
            }

            match self.receiver.recv_timeout(deadline - now) {
                Ok(message) => {
                    if self.accept(message) {
                        return RunResult::Stopped;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    // Deliver whatever arrived together with the deadline
                    self.dispatch(mode);
                    return RunResult::TimedOut;
                }
                // The loop owns a sender, so the channel cannot disconnect
                Err(RecvTimeoutError::Disconnected) => return RunResult::Finished,
            }
        }
    }

    /// Returns true when the message asks the loop to stop
    fn accept(&mut self, message: Message) -> bool {
        match message {
            Message::Event { token, event } => {
                self.pending.push_back((token, event));
                false
            }
            Message::Wake => false,
            Message::Stop => true,
        }
    }

    /// Deliver pending events that fire in `mode`, returning how many were delivered
    fn dispatch(&mut self, mode: &RunLoopMode) -> usize {
        let mut handled = 0;
        let mut deferred = VecDeque::new();

        while let Some((token, event)) = self.pending.pop_front() {
            // Reactor lock is released before the client runs
            let route = self.handle.reactor.lock().route(token, event, mode);
            match route {
                Route::Deliver(client) => {
                    client.lock().on_event(event);
                    handled += 1;
                }
                // A waiting duplicate tells the client nothing new
                Route::Defer => {
                    if !deferred.contains(&(token, event)) {
                        deferred.push_back((token, event));
                    }
                }
                Route::Discard => trace!(token = token.0, %event, "discarding event"),
            }
        }

        self.pending = deferred;
        handled
    }
}

impl Default for RunLoop {
    fn default() -> Self {
        Self::new()
    }
}
