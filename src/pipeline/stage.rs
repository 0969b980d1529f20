//! Order-restoring queue for one session in one direction.
//!
//! A stage holds every message that has reached its session but not yet
//! left it. Sessions may finish messages in any order; a stage only
//! releases the longest prefix of finished records, so messages leave in
//! the order they arrived.

use std::collections::VecDeque;

use crate::error::{Error, Result};
use crate::message::Message;

#[derive(Debug)]
struct Record<C> {
    id: u64,
    outcome: Option<Result<Message>>,
    callback: C,
}

/// A finished record leaving the stage, in arrival order.
#[derive(Debug)]
pub(crate) struct Released<C> {
    pub(crate) id: u64,
    pub(crate) outcome: Result<Message>,
    pub(crate) callback: C,
}

/// FIFO of records plus the count used to decide when the session drained.
///
/// `pending` counts messages that were submitted to the pipeline while this
/// stage was accepting and have not yet left it, including ones still
/// upstream. The session may close only once it reaches zero.
#[derive(Debug)]
pub(crate) struct Stage<C> {
    queue: VecDeque<Record<C>>,
    pending: usize,
    stopped: bool,
}

impl<C> Default for Stage<C> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            pending: 0,
            stopped: false,
        }
    }
}

impl<C> Stage<C> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// A message entered the pipeline and will reach this stage.
    pub(crate) fn reserve_slot(&mut self) {
        if !self.stopped {
            self.pending += 1;
        }
    }

    /// Queue a message about to be handed to the session.
    ///
    /// Returns `false` if the stage has stopped; the caller drops the
    /// message and its callback.
    pub(crate) fn accept(&mut self, id: u64, callback: C) -> bool {
        if self.stopped {
            return false;
        }
        self.queue.push_back(Record {
            id,
            outcome: None,
            callback,
        });
        true
    }

    /// Queue an upstream error. It keeps its place in line but is not
    /// given to the session.
    pub(crate) fn accept_failed(&mut self, id: u64, error: Error, callback: C) -> bool {
        if self.stopped {
            return false;
        }
        self.queue.push_back(Record {
            id,
            outcome: Some(Err(error)),
            callback,
        });
        self.stop();
        true
    }

    /// Record the session's result for message `id`.
    ///
    /// Returns `false` if the record is gone, which happens when an earlier
    /// error cleared the queue.
    pub(crate) fn complete(&mut self, id: u64, result: Result<Message>) -> bool {
        let failed = result.is_err();
        let Some(record) = self.queue.iter_mut().find(|r| r.id == id) else {
            return false;
        };
        record.outcome = Some(result);
        if failed {
            self.stop();
        }
        true
    }

    /// Pop the maximal finished prefix.
    ///
    /// An error ends the stage: it is released and every record behind it
    /// is discarded without calling back.
    pub(crate) fn release(&mut self) -> Vec<Released<C>> {
        let mut released = Vec::new();

        while self.queue.front().is_some_and(|r| r.outcome.is_some()) {
            let Some(Record {
                id,
                outcome: Some(outcome),
                callback,
            }) = self.queue.pop_front()
            else {
                break;
            };

            let failed = outcome.is_err();
            released.push(Released {
                id,
                outcome,
                callback,
            });

            if failed {
                self.queue.clear();
                self.pending = 0;
                break;
            }
            self.pending = self.pending.saturating_sub(1);
        }

        released
    }

    fn stop(&mut self) {
        self.stopped = true;
        self.pending = self.queue.len();
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending
    }

}
