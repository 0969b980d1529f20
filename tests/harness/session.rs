//! Sessions driven by a [`Behavior`].

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use rsws_extensions::extensions::{CloseFuture, ProcessFuture};
use rsws_extensions::{
    ClientSession, Error, Frame, Message, Offer, Result, RsvBits, ServerSession, Session,
    serialize_params,
};
use tokio::sync::{mpsc, oneshot};

use super::ScriptedExtension;

/// What a session does with each message.
#[derive(Clone)]
pub enum Behavior {
    /// Append `|name` immediately.
    Tag,
    /// Append `|name` after a pseudo-random delay below `max_ms`.
    Delay { max_ms: u64 },
    /// Hand each message to the test, which decides when and how it
    /// completes.
    Gate(mpsc::UnboundedSender<Gated>),
    /// Fail messages containing the marker, tag the rest.
    FailOn(&'static str),
}

/// A message held by a gated session.
pub struct Gated {
    pub session: String,
    pub direction: &'static str,
    pub message: Message,
    responder: oneshot::Sender<Result<Message>>,
}

impl Gated {
    pub fn text(&self) -> &str {
        self.message.as_text().unwrap_or_default()
    }

    /// Complete with the tagged message.
    pub fn pass(self) {
        let message = tag(&self.session, self.message);
        let _ = self.responder.send(Ok(message));
    }

    pub fn fail(self, reason: &str) {
        let _ = self
            .responder
            .send(Err(Error::Extension(reason.to_string())));
    }
}

pub fn tag(name: &str, message: Message) -> Message {
    let text = format!("{}|{}", message.as_text().unwrap_or_default(), name);
    message.with_data(text)
}

fn jitter(name: &str, message: &Message, max_ms: u64) -> u64 {
    let mut hasher = DefaultHasher::new();
    name.hash(&mut hasher);
    message.data.hash(&mut hasher);
    hasher.finish() % max_ms.max(1)
}

/// Session created by [`ScriptedExtension`].
pub struct ScriptedSession {
    script: ScriptedExtension,
}

impl ScriptedSession {
    pub fn new(script: ScriptedExtension) -> Self {
        Self { script }
    }

    fn process(&self, direction: &'static str, message: Message) -> ProcessFuture {
        let name = self.script.name.to_string();
        self.script.log.push(format!(
            "{} {} {}",
            name,
            direction,
            message.as_text().unwrap_or_default()
        ));

        match &self.script.behavior {
            Behavior::Tag => Box::pin(async move { Ok(tag(&name, message)) }),
            Behavior::Delay { max_ms } => {
                let delay = Duration::from_millis(jitter(&name, &message, *max_ms));
                Box::pin(async move {
                    tokio::time::sleep(delay).await;
                    Ok(tag(&name, message))
                })
            }
            Behavior::Gate(gates) => {
                let (responder, completion) = oneshot::channel();
                let _ = gates.send(Gated {
                    session: name,
                    direction,
                    message,
                    responder,
                });
                Box::pin(async move {
                    completion
                        .await
                        .unwrap_or_else(|_| Err(Error::Extension("gate dropped".into())))
                })
            }
            Behavior::FailOn(marker) => {
                let refused = message.as_text().is_some_and(|t| t.contains(*marker));
                Box::pin(async move {
                    if refused {
                        Err(Error::Extension("refused".into()))
                    } else {
                        Ok(tag(&name, message))
                    }
                })
            }
        }
    }
}

impl Session for ScriptedSession {
    fn process_incoming_message(&mut self, message: Message) -> ProcessFuture {
        self.process("in", message)
    }

    fn process_outgoing_message(&mut self, message: Message) -> ProcessFuture {
        self.process("out", message)
    }

    fn valid_frame_rsv(&self, frame: &Frame) -> RsvBits {
        if frame.is_first_fragment() {
            self.script.rsv
        } else {
            RsvBits::NONE
        }
    }

    fn close(&mut self) -> CloseFuture {
        self.script.log.push(format!("close {}", self.script.name));
        Box::pin(async {})
    }
}

impl ClientSession for ScriptedSession {
    fn generate_offer(&mut self) -> Vec<Offer> {
        self.script.offers.clone()
    }

    fn activate(&mut self, params: &Offer) -> bool {
        self.script
            .log
            .push(format!("activate {}", serialize_params(self.script.name, params)));
        self.script.accept
    }
}

impl ServerSession for ScriptedSession {
    fn generate_response(&mut self) -> Offer {
        self.script.response.clone()
    }
}
