//! Stream events and the clients that observe them
//!
//! Every stream reports its lifecycle through five event kinds. A client
//! registers interest in a subset of them with an [`EventMask`]; the run loop
//! only delivers events contained in that mask.

use std::fmt;

use tracing::debug;

/// A lifecycle event reported by a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamEvent {
    /// The stream finished opening
    OpenCompleted,
    /// A read would return data without blocking
    HasBytesAvailable,
    /// A write would accept data without blocking
    CanAcceptBytes,
    /// The stream hit an error and is now unusable
    ErrorOccurred,
    /// All bytes of the resource have been consumed
    EndEncountered,
}

impl StreamEvent {
    /// All event kinds, in notification order
    pub const ALL: [StreamEvent; 5] = [
        StreamEvent::OpenCompleted,
        StreamEvent::HasBytesAvailable,
        StreamEvent::CanAcceptBytes,
        StreamEvent::ErrorOccurred,
        StreamEvent::EndEncountered,
    ];

    /// The mask bit for this event
    pub fn mask(self) -> EventMask {
        match self {
            StreamEvent::OpenCompleted => EventMask::OPEN_COMPLETED,
            StreamEvent::HasBytesAvailable => EventMask::HAS_BYTES_AVAILABLE,
            StreamEvent::CanAcceptBytes => EventMask::CAN_ACCEPT_BYTES,
            StreamEvent::ErrorOccurred => EventMask::ERROR_OCCURRED,
            StreamEvent::EndEncountered => EventMask::END_ENCOUNTERED,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StreamEvent::OpenCompleted => "openCompleted",
            StreamEvent::HasBytesAvailable => "hasBytesAvailable",
            StreamEvent::CanAcceptBytes => "canAcceptBytes",
            StreamEvent::ErrorOccurred => "errorOccurred",
            StreamEvent::EndEncountered => "endEncountered",
        }
    }
}

impl fmt::Display for StreamEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Set of event kinds a client wants to receive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventMask(pub u8);

impl EventMask {
    pub const NONE: EventMask = EventMask(0);
    pub const OPEN_COMPLETED: EventMask = EventMask(0b0_0001);
    pub const HAS_BYTES_AVAILABLE: EventMask = EventMask(0b0_0010);
    pub const CAN_ACCEPT_BYTES: EventMask = EventMask(0b0_0100);
    pub const ERROR_OCCURRED: EventMask = EventMask(0b0_1000);
    pub const END_ENCOUNTERED: EventMask = EventMask(0b1_0000);
    pub const ALL: EventMask = EventMask(0b1_1111);

    /// Check whether `event` is part of this mask
    pub fn contains(&self, event: StreamEvent) -> bool {
        self.0 & event.mask().0 != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl Default for EventMask {
    fn default() -> Self {
        EventMask::ALL
    }
}

impl From<StreamEvent> for EventMask {
    fn from(event: StreamEvent) -> Self {
        event.mask()
    }
}

impl std::ops::BitOr for EventMask {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        EventMask(self.0 | rhs.0)
    }
}

impl std::ops::BitAnd for EventMask {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        EventMask(self.0 & rhs.0)
    }
}

impl std::ops::BitOrAssign for EventMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Receiver of stream events
///
/// Clients are invoked on the thread driving the run loop, one event at a
/// time. They observe; they cannot drive the stream that produced the event.
/// Any `FnMut(StreamEvent) + Send` closure is a client.
pub trait StreamClient: Send {
    fn on_event(&mut self, event: StreamEvent);
}

impl<F> StreamClient for F
where
    F: FnMut(StreamEvent) + Send,
{
    fn on_event(&mut self, event: StreamEvent) {
        self(event)
    }
}

/// Client installed on every new stream; logs each event
#[derive(Debug, Clone)]
pub struct LoggingClient {
    resource: String,
}

impl LoggingClient {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
        }
    }
}

impl StreamClient for LoggingClient {
    fn on_event(&mut self, event: StreamEvent) {
        debug!(resource = %self.resource, %event, "stream event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_flags() {
        let mask = EventMask::OPEN_COMPLETED | EventMask::END_ENCOUNTERED;
        assert!(mask.contains(StreamEvent::OpenCompleted));
        assert!(mask.contains(StreamEvent::EndEncountered));
        assert!(!mask.contains(StreamEvent::HasBytesAvailable));
        assert!(!mask.contains(StreamEvent::ErrorOccurred));
    }

    #[test]
    fn test_all_mask_covers_every_event() {
        for event in StreamEvent::ALL {
            assert!(EventMask::ALL.contains(event), "{event} missing");
            assert!(!EventMask::NONE.contains(event));
        }
        assert!(EventMask::NONE.is_empty());
    }

    #[test]
    fn test_closure_is_client() {
        let mut seen = Vec::new();
        {
            let mut client = |event: StreamEvent| seen.push(event);
            client.on_event(StreamEvent::CanAcceptBytes);
        }
        assert_eq!(seen, vec![StreamEvent::CanAcceptBytes]);
    }
}
