//! Ordered, asynchronous message pipeline over the active sessions.
//!
//! Outgoing messages pass through sessions in active order, incoming
//! messages in reverse. Each session may complete messages in any order and
//! at any time; the pipeline guarantees that, per direction, callbacks fire
//! in submission order.
//!
//! # Errors
//!
//! When a session fails, the failing message's callback receives the error
//! (prefixed with the extension name) once every earlier message in that
//! direction has been delivered. The direction then stops: messages behind
//! the error and any submitted afterwards are dropped without a callback.
//! The other direction is unaffected.
//!
//! # Closing
//!
//! [`Pipeline::close`] stops both directions, waits for each session to
//! finish what it already accepted, closes the sessions and then fires the
//! callback.
//!
//! # Runtime
//!
//! All state lives in one driver task spawned on the current Tokio runtime
//! at first use. Callbacks run on that task and must not block.

mod cell;
mod driver;
mod stage;
mod state;

pub use state::{Direction, DirectionState};

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::warn;

use crate::error::Result;
use crate::extensions::ActiveSession;
use crate::message::Message;

use driver::{Command, Driver};

/// Receives the outcome of one processed message.
pub(crate) type Callback = Box<dyn FnOnce(Result<Message>) + Send>;

/// Notified once every session has closed.
pub(crate) type CloseCallback = Box<dyn FnOnce() + Send>;

type IdleDriver = Option<(Driver, mpsc::UnboundedReceiver<Command>)>;

/// Handle to the pipeline's driver task.
///
/// Cheap to construct; the driver is only spawned by the first call that
/// needs it, so an unused pipeline never touches the runtime. Clones share
/// the same driver, and submissions from one handle are ordered.
#[derive(Clone)]
pub struct Pipeline {
    names: Arc<[String]>,
    commands: mpsc::UnboundedSender<Command>,
    idle: Arc<Mutex<IdleDriver>>,
}

impl Pipeline {
    /// Build a pipeline over `sessions`, in active order.
    pub fn new(sessions: Vec<ActiveSession>) -> Self {
        let names = sessions.iter().map(|s| s.name().to_string()).collect();
        let (commands, receiver) = mpsc::unbounded_channel();
        Self {
            names,
            commands,
            idle: Arc::new(Mutex::new(Some((Driver::new(sessions), receiver)))),
        }
    }

    /// Extension names in active order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of sessions each message passes through.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Decode a message read from the wire.
    ///
    /// Sessions run last to first. `callback` receives the decoded message
    /// or the first error. It is never called if the incoming direction has
    /// stopped or stops before this message is delivered.
    pub fn process_incoming_message<F>(&self, message: Message, callback: F)
    where
        F: FnOnce(Result<Message>) + Send + 'static,
    {
        self.dispatch(Command::Process {
            direction: Direction::Incoming,
            message,
            callback: Box::new(callback),
        });
    }

    /// Encode a message produced by the application.
    ///
    /// Sessions run first to last. Delivery rules match
    /// [`process_incoming_message`](Self::process_incoming_message).
    pub fn process_outgoing_message<F>(&self, message: Message, callback: F)
    where
        F: FnOnce(Result<Message>) + Send + 'static,
    {
        self.dispatch(Command::Process {
            direction: Direction::Outgoing,
            message,
            callback: Box::new(callback),
        });
    }

    /// Stop accepting messages and close every session once drained.
    ///
    /// `callback` fires after the last session closes, or as soon as the
    /// driver sees the request if there is nothing left to close.
    pub fn close<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.dispatch(Command::Close {
            callback: Box::new(callback),
        });
    }

    fn dispatch(&self, command: Command) {
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((driver, receiver)) = idle.take() {
            match Handle::try_current() {
                Ok(runtime) => {
                    runtime.spawn(driver.run(receiver));
                }
                Err(err) => {
                    warn!(error = %err, "no Tokio runtime, pipeline request dropped");
                    *idle = Some((driver, receiver));
                    return;
                }
            }
        }
        drop(idle);

        if self.commands.send(command).is_err() {
            warn!("pipeline driver has stopped, request dropped");
        }
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let started = self
            .idle
            .lock()
            .map(|idle| idle.is_none())
            .unwrap_or(true);
        f.debug_struct("Pipeline")
            .field("sessions", &&*self.names)
            .field("started", &started)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::extensions::{ProcessFuture, Role, RsvBits, Session};
    use tokio::sync::oneshot;

    struct Suffix(&'static str);

    impl Session for Suffix {
        fn process_incoming_message(&mut self, message: Message) -> ProcessFuture {
            let suffix = self.0;
            Box::pin(async move {
                let text = format!("{}{}", message.as_text().unwrap_or_default(), suffix);
                Ok(message.with_data(text))
            })
        }

        fn process_outgoing_message(&mut self, message: Message) -> ProcessFuture {
            self.process_incoming_message(message)
        }
    }

    struct Failing;

    impl Session for Failing {
        fn process_incoming_message(&mut self, _message: Message) -> ProcessFuture {
            Box::pin(async { Err(Error::Extension("corrupt".into())) })
        }

        fn process_outgoing_message(&mut self, message: Message) -> ProcessFuture {
            Box::pin(async move { Ok(message) })
        }
    }

    fn active(name: &str, session: impl Session + 'static) -> ActiveSession {
        ActiveSession::new(name, RsvBits::NONE, Role::Server, Box::new(session))
    }

    async fn outgoing(pipeline: &Pipeline, text: &str) -> Result<Message> {
        let (tx, rx) = oneshot::channel();
        pipeline.process_outgoing_message(Message::text(text.to_string()), move |result| {
            let _ = tx.send(result);
        });
        rx.await.unwrap()
    }

    #[tokio::test]
    async fn test_empty_pipeline_passes_through() {
        let pipeline = Pipeline::new(Vec::new());
        assert!(pipeline.is_empty());
        let message = outgoing(&pipeline, "hello").await.unwrap();
        assert_eq!(message.as_text(), Some("hello"));
    }

    #[tokio::test]
    async fn test_pipeline_applies_sessions() {
        let pipeline = Pipeline::new(vec![active("a", Suffix("-a")), active("b", Suffix("-b"))]);
        assert_eq!(pipeline.names(), ["a".to_string(), "b".to_string()]);
        let message = outgoing(&pipeline, "m").await.unwrap();
        assert_eq!(message.as_text(), Some("m-a-b"));
    }

    #[tokio::test]
    async fn test_error_is_prefixed_with_extension_name() {
        let pipeline = Pipeline::new(vec![active("strict", Failing)]);
        let (tx, rx) = oneshot::channel();
        pipeline.process_incoming_message(Message::binary(vec![0u8]), move |result| {
            let _ = tx.send(result);
        });
        let err = rx.await.unwrap().unwrap_err();
        assert_eq!(err.to_string(), "strict: Extension error: corrupt");

        // outgoing is independent of the failed incoming direction
        assert!(outgoing(&pipeline, "ok").await.is_ok());
    }

    #[tokio::test]
    async fn test_close_fires_callback() {
        let pipeline = Pipeline::new(vec![active("a", Suffix("-a"))]);
        let (tx, rx) = oneshot::channel();
        pipeline.close(move || {
            let _ = tx.send(());
        });
        rx.await.unwrap();
    }

    #[tokio::test]
    async fn test_clones_share_one_driver() {
        let pipeline = Pipeline::new(vec![active("a", Suffix("-a"))]);
        let other = pipeline.clone();
        assert_eq!(outgoing(&other, "x").await.unwrap().as_text(), Some("x-a"));
        assert!(format!("{:?}", pipeline).contains("started: true"));
    }

    #[test]
    fn test_dispatch_without_runtime_is_dropped() {
        let pipeline = Pipeline::new(Vec::new());
        pipeline.process_outgoing_message(Message::text("x"), |_| panic!("must not run"));
        assert!(format!("{:?}", pipeline).contains("started: false"));
    }
}
