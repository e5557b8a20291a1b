use std::collections::HashMap;

use glam::Vec3;

/// Which kind of host notification an event is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Once per rendered frame.
    Frame,
    /// The viewer moved.
    Camera,
    /// The host is going away.
    Shutdown,
}

/// A notification delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostEvent {
    /// A frame elapsed.
    Frame {
        /// Wall-clock seconds since the previous frame.
        delta: f32,
    },
    /// New viewer position.
    Camera {
        /// World-space viewer position.
        position: Vec3,
    },
    /// One-shot teardown notification.
    Shutdown,
}

impl HostEvent {
    /// The kind used to route this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Frame { .. } => EventKind::Frame,
            Self::Camera { .. } => EventKind::Camera,
            Self::Shutdown => EventKind::Shutdown,
        }
    }
}

type Handler = Box<dyn Fn(&HostEvent) + Send + Sync>;

/// Dispatch table from event kind to handlers. Handlers for a kind run in
/// subscription order.
#[derive(Default)]
pub struct EventBus {
    handlers: HashMap<EventKind, Vec<Handler>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<EventKind, usize> =
            self.handlers.iter().map(|(k, v)| (*k, v.len())).collect();
        f.debug_struct("EventBus").field("handlers", &counts).finish()
    }
}

impl EventBus {
    /// Create a bus with no handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for events of `kind`.
    pub fn subscribe(&mut self, kind: EventKind, handler: impl Fn(&HostEvent) + Send + Sync + 'static) {
        self.handlers.entry(kind).or_default().push(Box::new(handler));
    }

    /// Deliver `event` to every handler of its kind. Returns how many ran.
    pub fn dispatch(&self, event: &HostEvent) -> usize {
        let Some(handlers) = self.handlers.get(&event.kind()) else {
            return 0;
        };
        for handler in handlers {
            handler(event);
        }
        handlers.len()
    }

    /// Number of handlers registered for `kind`.
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }
}
