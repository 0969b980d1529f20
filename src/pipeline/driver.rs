//! The task that owns all pipeline state.
//!
//! [`Pipeline`](super::Pipeline) handles only send commands; the driver is
//! the single place where stages are mutated, session futures are polled
//! and callbacks run. Session completions arrive as events from a
//! `FuturesUnordered`, so a slow session never blocks the others.

use futures::FutureExt;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::extensions::ActiveSession;
use crate::message::Message;

use super::cell::Cell;
use super::stage::Released;
use super::state::{Direction, DirectionState};
use super::{Callback, CloseCallback};

/// Request sent from a [`Pipeline`](super::Pipeline) handle.
pub(crate) enum Command {
    Process {
        direction: Direction,
        message: Message,
        callback: Callback,
    },
    Close {
        callback: CloseCallback,
    },
}

/// A session future finished.
enum Event {
    Processed {
        direction: Direction,
        cell: usize,
        id: u64,
        result: Result<Message>,
    },
    Closed {
        cell: usize,
    },
}

pub(crate) struct Driver {
    cells: Vec<Cell>,
    incoming: DirectionState,
    outgoing: DirectionState,
    next_id: u64,
    tasks: FuturesUnordered<BoxFuture<'static, Event>>,
    close_waiters: Vec<CloseCallback>,
}

impl Driver {
    pub(crate) fn new(sessions: Vec<ActiveSession>) -> Self {
        Self {
            cells: sessions.into_iter().map(Cell::new).collect(),
            incoming: DirectionState::Active,
            outgoing: DirectionState::Active,
            next_id: 0,
            tasks: FuturesUnordered::new(),
            close_waiters: Vec::new(),
        }
    }

    /// Serve commands until every handle is dropped and no session future
    /// is left in flight.
    pub(crate) async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let mut open = true;
        loop {
            tokio::select! {
                command = commands.recv(), if open => match command {
                    Some(command) => self.handle(command),
                    None => open = false,
                },
                Some(event) = self.tasks.next(), if !self.tasks.is_empty() => {
                    self.on_event(event);
                }
                else => break,
            }
        }
        debug!(sessions = self.cells.len(), "pipeline driver stopped");
    }

    pub(crate) fn handle(&mut self, command: Command) {
        match command {
            Command::Process {
                direction,
                message,
                callback,
            } => self.submit(direction, message, callback),
            Command::Close { callback } => self.close(callback),
        }
    }

    fn state_mut(&mut self, direction: Direction) -> &mut DirectionState {
        match direction {
            Direction::Incoming => &mut self.incoming,
            Direction::Outgoing => &mut self.outgoing,
        }
    }

    fn first(&self, direction: Direction) -> usize {
        match direction {
            Direction::Outgoing => 0,
            Direction::Incoming => self.cells.len().saturating_sub(1),
        }
    }

    fn next(&self, direction: Direction, index: usize) -> Option<usize> {
        match direction {
            Direction::Outgoing => (index + 1 < self.cells.len()).then_some(index + 1),
            Direction::Incoming => index.checked_sub(1),
        }
    }

    fn submit(&mut self, direction: Direction, message: Message, callback: Callback) {
        if !self.state_mut(direction).is_active() {
            trace!(%direction, "direction stopped, dropping message");
            return;
        }

        if self.cells.is_empty() {
            callback(Ok(message));
            return;
        }

        let id = self.next_id;
        self.next_id += 1;
        trace!(%direction, id, "message submitted");

        for cell in &mut self.cells {
            cell.stage_mut(direction).reserve_slot();
        }
        let first = self.first(direction);
        self.enter(first, direction, id, Ok(message), callback);
    }

    /// Hand a record to the stage at `index`.
    ///
    /// Messages go to the session; errors from upstream only queue so they
    /// leave in order.
    fn enter(
        &mut self,
        index: usize,
        direction: Direction,
        id: u64,
        outcome: Result<Message>,
        callback: Callback,
    ) {
        let cell = &mut self.cells[index];
        match outcome {
            Ok(message) => {
                if !cell.stage_mut(direction).accept(id, callback) {
                    trace!(extension = %cell.name(), %direction, id, "stage stopped, dropping message");
                    return;
                }
                let processing = cell.process(direction, message);
                self.tasks.push(
                    async move {
                        Event::Processed {
                            direction,
                            cell: index,
                            id,
                            result: processing.await,
                        }
                    }
                    .boxed(),
                );
            }
            Err(error) => {
                if cell.stage_mut(direction).accept_failed(id, error, callback) {
                    self.flush(index, direction);
                }
            }
        }
    }

    fn on_event(&mut self, event: Event) {
        match event {
            Event::Processed {
                direction,
                cell,
                id,
                result,
            } => self.on_processed(direction, cell, id, result),
            Event::Closed { cell } => self.on_closed(cell),
        }
    }

    fn on_processed(&mut self, direction: Direction, index: usize, id: u64, result: Result<Message>) {
        let Some(cell) = self.cells.get_mut(index) else {
            return;
        };

        let result = result.map_err(|err| {
            warn!(extension = %cell.name(), %direction, error = %err, "extension failed to process message");
            Error::session(cell.name(), err)
        });
        let failed = result.is_err();
        let accepted = cell.stage_mut(direction).complete(id, result);

        if failed {
            self.state_mut(direction).stop();
        }
        if !accepted {
            trace!(%direction, id, "result for discarded message ignored");
            return;
        }
        self.flush(index, direction);
    }

    /// Move the finished prefix of one stage downstream, or out to the
    /// callbacks from the last stage.
    fn flush(&mut self, index: usize, direction: Direction) {
        let released = self.cells[index].stage_mut(direction).release();

        for Released {
            id,
            outcome,
            callback,
        } in released
        {
            match self.next(direction, index) {
                Some(next) => self.enter(next, direction, id, outcome, callback),
                None => {
                    trace!(%direction, id, ok = outcome.is_ok(), "message delivered");
                    callback(outcome);
                }
            }
        }

        self.try_close(index);
    }

    fn try_close(&mut self, index: usize) {
        let Some(cell) = self.cells.get_mut(index) else {
            return;
        };
        if let Some(closing) = cell.begin_close() {
            debug!(extension = %cell.name(), "closing extension session");
            self.tasks.push(
                async move {
                    closing.await;
                    Event::Closed { cell: index }
                }
                .boxed(),
            );
        }
    }

    fn on_closed(&mut self, index: usize) {
        if let Some(cell) = self.cells.get_mut(index) {
            cell.finish_close();
            debug!(extension = %cell.name(), "extension session closed");
        }
        if self.all_closed() {
            for waiter in self.close_waiters.drain(..) {
                waiter();
            }
        }
    }

    fn close(&mut self, callback: CloseCallback) {
        self.incoming.stop();
        self.outgoing.stop();

        if self.all_closed() {
            callback();
            return;
        }

        self.close_waiters.push(callback);
        for index in 0..self.cells.len() {
            self.cells[index].request_close();
            self.try_close(index);
        }
    }

    fn all_closed(&self) -> bool {
        self.cells.iter().all(Cell::is_closed)
    }
}
