//! Registration table for scheduled streams
//!
//! The reactor tracks:
//! - Which stream tokens are scheduled, and under which run loop mode
//! - The event mask each stream's client asked for
//! - The client to hand an event to when the loop dispatches it

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{EventMask, RunLoopMode, StreamClient, StreamEvent, Token};

/// A client shared between its stream and the reactor
pub(crate) type SharedClient = Arc<Mutex<Box<dyn StreamClient>>>;

/// Wrap a client so it can be shared with the reactor
pub(crate) fn share_client(client: Box<dyn StreamClient>) -> SharedClient {
    Arc::new(Mutex::new(client))
}

/// Registration entry in the reactor
struct Registration {
    mode: RunLoopMode,
    mask: EventMask,
    client: SharedClient,
}

/// What the run loop should do with a posted event
pub(crate) enum Route {
    /// Hand the event to this client now
    Deliver(SharedClient),
    /// The stream is scheduled, but not in the mode currently running
    Defer,
    /// Nobody is listening for it
    Discard,
}

/// Tracks scheduled streams and routes their events
#[derive(Default)]
pub(crate) struct Reactor {
    registrations: HashMap<Token, Registration>,
}

impl Reactor {
    /// Create an empty reactor
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a stream; replaces any previous registration for `token`
    pub(crate) fn insert(&mut self, token: Token, mode: RunLoopMode, mask: EventMask, client: SharedClient) {
        self.registrations
            .insert(token, Registration { mode, mask, client });
    }

    /// Remove a registration, returning whether one existed
    pub(crate) fn remove(&mut self, token: Token) -> bool {
        self.registrations.remove(&token).is_some()
    }

    /// Swap the client and mask of a live registration
    pub(crate) fn set_client(&mut self, token: Token, mask: EventMask, client: SharedClient) {
        if let Some(registration) = self.registrations.get_mut(&token) {
            registration.mask = mask;
            registration.client = client;
        }
    }

    pub(crate) fn is_registered(&self, token: Token) -> bool {
        self.registrations.contains_key(&token)
    }

    /// Whether any registration would fire while running in `mode`
    pub(crate) fn has_sources_in(&self, mode: &RunLoopMode) -> bool {
        self.registrations.values().any(|r| r.mode.fires_in(mode))
    }

    /// Decide where an event posted by `token` goes when running in `mode`
    pub(crate) fn route(&self, token: Token, event: StreamEvent, mode: &RunLoopMode) -> Route {
        match self.registrations.get(&token) {
            None => Route::Discard,
            Some(r) if !r.mask.contains(event) => Route::Discard,
            Some(r) if !r.mode.fires_in(mode) => Route::Defer,
            Some(r) => Route::Deliver(Arc::clone(&r.client)),
        }
    }

    /// Number of registered streams
    pub(crate) fn len(&self) -> usize {
        self.registrations.len()
    }
}
