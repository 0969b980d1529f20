//! Per-direction state of the message pipeline.

/// Which way a message travels through the pipeline.
///
/// Outgoing messages visit sessions in active order; incoming messages visit
/// them in reverse so each extension undoes its own encoding last-in,
/// first-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Read from the wire, on its way to the application.
    Incoming,
    /// Produced by the application, on its way to the wire.
    Outgoing,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Incoming => write!(f, "incoming"),
            Direction::Outgoing => write!(f, "outgoing"),
        }
    }
}

/// Whether a direction still accepts messages.
///
/// A direction stops permanently when a session fails or the pipeline is
/// closed; later submissions are dropped without invoking their callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DirectionState {
    /// Messages are accepted.
    #[default]
    Active,
    /// Messages are dropped.
    Stopped,
}

impl DirectionState {
    #[must_use]
    #[inline]
    pub const fn is_active(&self) -> bool {
        matches!(self, DirectionState::Active)
    }

    #[inline]
    pub fn stop(&mut self) {
        *self = DirectionState::Stopped;
    }
}

impl std::fmt::Display for DirectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DirectionState::Active => write!(f, "Active"),
            DirectionState::Stopped => write!(f, "Stopped"),
        }
    }
}
