//! Scriptable extension descriptor.

use rsws_extensions::{ClientSession, Extension, Offer, RsvBits, ServerSession};

use super::{Behavior, EventLog, ScriptedSession};

/// Extension whose negotiation and processing are fixed by the test.
#[derive(Clone)]
pub struct ScriptedExtension {
    pub name: &'static str,
    pub rsv: RsvBits,
    pub offers: Vec<Offer>,
    pub response: Offer,
    pub accept: bool,
    pub enabled: bool,
    pub behavior: Behavior,
    pub log: EventLog,
}

impl ScriptedExtension {
    /// Offers one empty parameter set and tags messages with its name.
    pub fn new(name: &'static str, log: &EventLog) -> Self {
        Self {
            name,
            rsv: RsvBits::NONE,
            offers: vec![Offer::new()],
            response: Offer::new(),
            accept: true,
            enabled: true,
            behavior: Behavior::Tag,
            log: log.clone(),
        }
    }

    pub fn rsv(mut self, rsv: RsvBits) -> Self {
        self.rsv = rsv;
        self
    }

    pub fn offers(mut self, offers: Vec<Offer>) -> Self {
        self.offers = offers;
        self
    }

    pub fn response(mut self, response: Offer) -> Self {
        self.response = response;
        self
    }

    pub fn behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Client sessions refuse every response.
    pub fn rejecting(mut self) -> Self {
        self.accept = false;
        self
    }

    /// Never creates a session.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn boxed(self) -> Box<dyn Extension> {
        Box::new(self)
    }
}

impl Extension for ScriptedExtension {
    fn name(&self) -> &str {
        self.name
    }

    fn rsv_bits(&self) -> RsvBits {
        self.rsv
    }

    fn create_client_session(&self) -> Option<Box<dyn ClientSession>> {
        self.enabled
            .then(|| Box::new(ScriptedSession::new(self.clone())) as Box<dyn ClientSession>)
    }

    fn create_server_session(&self, offers: &[Offer]) -> Option<Box<dyn ServerSession>> {
        self.log
            .push(format!("{} offered {}", self.name, offers.len()));
        self.enabled
            .then(|| Box::new(ScriptedSession::new(self.clone())) as Box<dyn ServerSession>)
    }
}
