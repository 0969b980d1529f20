//! One active session together with its two stages.

use crate::extensions::{ActiveSession, CloseFuture, ProcessFuture};
use crate::message::Message;

use super::Callback;
use super::stage::Stage;
use super::state::Direction;

/// Close lifecycle of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Lifecycle {
    #[default]
    Open,
    /// Close requested; waiting for both stages to drain.
    Draining,
    /// Session close in progress.
    Closing,
    Closed,
}

pub(crate) struct Cell {
    active: ActiveSession,
    incoming: Stage<Callback>,
    outgoing: Stage<Callback>,
    lifecycle: Lifecycle,
}

impl Cell {
    pub(crate) fn new(active: ActiveSession) -> Self {
        Self {
            active,
            incoming: Stage::new(),
            outgoing: Stage::new(),
            lifecycle: Lifecycle::Open,
        }
    }

    pub(crate) fn name(&self) -> &str {
        self.active.name()
    }

    pub(crate) fn stage_mut(&mut self, direction: Direction) -> &mut Stage<Callback> {
        match direction {
            Direction::Incoming => &mut self.incoming,
            Direction::Outgoing => &mut self.outgoing,
        }
    }

    pub(crate) fn process(&self, direction: Direction, message: Message) -> ProcessFuture {
        let session = self.active.session();
        match direction {
            Direction::Incoming => session.process_incoming_message(message),
            Direction::Outgoing => session.process_outgoing_message(message),
        }
    }

    pub(crate) fn request_close(&mut self) {
        if self.lifecycle == Lifecycle::Open {
            self.lifecycle = Lifecycle::Draining;
        }
    }

    /// Start closing the session if close was requested and nothing is
    /// pending in either direction.
    pub(crate) fn begin_close(&mut self) -> Option<CloseFuture> {
        let drained = self.incoming.pending() == 0 && self.outgoing.pending() == 0;
        if self.lifecycle != Lifecycle::Draining || !drained {
            return None;
        }
        self.lifecycle = Lifecycle::Closing;
        Some(self.active.session().close())
    }

    pub(crate) fn finish_close(&mut self) {
        self.lifecycle = Lifecycle::Closed;
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.lifecycle == Lifecycle::Closed
    }
}
