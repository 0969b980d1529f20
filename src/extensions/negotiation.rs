//! Offer/response negotiation over the registered extensions.
//!
//! A client calls [`Negotiator::generate_offer`] and later
//! [`Negotiator::activate`] with the server's answer; a server calls
//! [`Negotiator::generate_response`] with the client's offer. Either way the
//! result is an ordered list of [`ActiveSession`]s from which the message
//! pipeline is rebuilt.

use std::fmt;

use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::extensions::{
    ActiveSession, ClientSession, Extension, ExtensionRegistry, Role, RsvBits, RsvOwnership,
};
use crate::protocol::{Frame, HeaderRecord, Offer, parse_header, serialize_params};

#[cfg(feature = "async-tokio")]
use crate::message::Message;
#[cfg(feature = "async-tokio")]
use crate::pipeline::Pipeline;

/// A client session waiting for the server's response.
struct OfferedSession {
    name: String,
    rsv_bits: RsvBits,
    session: Option<Box<dyn ClientSession>>,
}

/// Negotiates extensions for one connection and owns the resulting pipeline.
pub struct Negotiator {
    config: Config,
    registry: ExtensionRegistry,
    reserved: RsvOwnership,
    offered: Vec<OfferedSession>,
    active: Vec<ActiveSession>,
    #[cfg(feature = "async-tokio")]
    pipeline: Pipeline,
}

impl Default for Negotiator {
    fn default() -> Self {
        Self::with_config(Config::default())
    }
}

impl Negotiator {
    /// Create a negotiator with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a negotiator with the given configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            registry: ExtensionRegistry::new(),
            reserved: RsvOwnership::new(),
            offered: Vec::new(),
            active: Vec::new(),
            #[cfg(feature = "async-tokio")]
            pipeline: Pipeline::new(Vec::new()),
        }
    }

    /// Register an extension. Registration order is precedence order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidExtension`] if the name is not a valid token
    /// or is already registered.
    pub fn add(&mut self, extension: Box<dyn Extension>) -> Result<()> {
        self.registry.add(extension)
    }

    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Sessions that survived the last negotiation, in pipeline order.
    pub fn active_sessions(&self) -> &[ActiveSession] {
        &self.active
    }

    /// Current reserved-bit claims.
    pub fn reserved(&self) -> &RsvOwnership {
        &self.reserved
    }

    /// Build the client's offer header.
    ///
    /// Every registered extension that creates a client session contributes
    /// zero or more specs, in registration order. Returns `None` when no
    /// session offered anything. No reserved bits are claimed here.
    pub fn generate_offer(&mut self) -> Option<String> {
        self.offered.clear();
        let mut specs = Vec::new();

        for ext in self.registry.iter() {
            let Some(mut session) = ext.create_client_session() else {
                debug!(extension = %ext.name(), "extension declined to offer");
                continue;
            };

            for offer in session.generate_offer() {
                specs.push(serialize_params(ext.name(), &offer));
            }

            self.offered.push(OfferedSession {
                name: ext.name().to_string(),
                rsv_bits: ext.rsv_bits(),
                session: Some(session),
            });
        }

        debug!(offers = specs.len(), "generated extension offer");
        (!specs.is_empty()).then(|| specs.join(", "))
    }

    /// Activate the sessions named in the server's response.
    ///
    /// Active order is the order names appear in the response. Sessions the
    /// server did not name are discarded. On error nothing is activated.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidHeader`] if the response is malformed.
    /// - [`Error::Negotiation`] if the response names an extension that was
    ///   not offered, names one twice, gives two extensions the same RSV bit,
    ///   or carries parameters the session rejects. Each offer can be
    ///   activated once; a second `activate` needs a new
    ///   [`generate_offer`](Self::generate_offer).
    pub fn activate<'a>(&mut self, header: impl Into<Option<&'a str>>) -> Result<()> {
        self.reserved.reset();
        self.active.clear();

        let result = self.activate_sessions(header.into());
        match &result {
            Ok(()) => debug!(active = self.active.len(), "activated extensions"),
            Err(err) => {
                warn!(error = %err, "rejected extension response");
                self.reserved.reset();
            }
        }

        self.rebuild_pipeline();
        result
    }

    fn activate_sessions(&mut self, header: Option<&str>) -> Result<()> {
        let responses = self.parse(header)?;
        let mut active = Vec::with_capacity(responses.len());

        for (name, params) in responses.iter() {
            let Some(offered) = self.offered.iter_mut().find(|o| o.name == name) else {
                return Err(Error::Negotiation(format!(
                    "Server sent an extension response for unknown extension \"{}\"",
                    name
                )));
            };

            if responses.by_name(name).len() > 1 {
                return Err(Error::Negotiation(format!(
                    "Server sent more than one response for extension \"{}\"",
                    name
                )));
            }

            if let Some((bit, owner)) = self.reserved.conflict(offered.rsv_bits) {
                return Err(Error::Negotiation(format!(
                    "Server sent two extension responses that use the RSV{} bit: \"{}\" and \"{}\"",
                    bit, owner, name
                )));
            }

            let Some(mut session) = offered.session.take() else {
                return Err(Error::Negotiation(format!(
                    "Extension \"{}\" was already used by an earlier activation; generate a new offer first",
                    name
                )));
            };
            if !session.activate(params) {
                return Err(Error::Negotiation(format!(
                    "Server sent unacceptable extension parameters: {}",
                    serialize_params(name, params)
                )));
            }

            self.reserved.claim(name, offered.rsv_bits);
            debug!(extension = %name, "activated extension session");
            active.push(ActiveSession::new(
                name,
                offered.rsv_bits,
                Role::Client,
                session,
            ));
        }

        self.active = active;
        Ok(())
    }

    /// Answer a client's offer header.
    ///
    /// Walks registered extensions in registration order. An extension is
    /// skipped when the client did not offer it, when one of its RSV bits
    /// was already claimed by an earlier extension in this call, or when it
    /// declines to build a session. Returns `None` if nothing was accepted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeader`] if the offer is malformed; the
    /// current negotiation state is left untouched in that case.
    pub fn generate_response<'a>(
        &mut self,
        header: impl Into<Option<&'a str>>,
    ) -> Result<Option<String>> {
        let offers = self.parse(header.into())?;

        self.reserved.reset();
        let mut active = Vec::new();
        let mut specs = Vec::new();

        for ext in self.registry.iter() {
            let name = ext.name();
            let candidates: Vec<Offer> = offers.by_name(name).into_iter().cloned().collect();
            if candidates.is_empty() {
                continue;
            }

            if let Some((bit, owner)) = self.reserved.conflict(ext.rsv_bits()) {
                debug!(extension = %name, bit, owner = %owner, "RSV bit already claimed, skipping");
                continue;
            }

            let Some(mut session) = ext.create_server_session(&candidates) else {
                debug!(extension = %name, "extension declined offer");
                continue;
            };

            self.reserved.claim(name, ext.rsv_bits());
            specs.push(serialize_params(name, &session.generate_response()));
            debug!(extension = %name, "accepted extension offer");
            active.push(ActiveSession::new(name, ext.rsv_bits(), Role::Server, session));
        }

        self.active = active;
        self.rebuild_pipeline();
        Ok((!specs.is_empty()).then(|| specs.join(", ")))
    }

    /// Check a raw frame's reserved bits against the active sessions.
    ///
    /// A set bit is acceptable only if some active session permits it on
    /// this exact frame; clear bits are always acceptable.
    pub fn valid_frame_rsv(&self, frame: &Frame) -> bool {
        let allowed = self
            .active
            .iter()
            .fold(RsvBits::NONE, |acc, active| {
                acc.union(active.session().valid_frame_rsv(frame))
            });
        frame.rsv_bits().permitted_by(&allowed)
    }

    fn parse(&self, header: Option<&str>) -> Result<HeaderRecord> {
        let limits = &self.config.limits;
        if let Some(value) = header {
            limits.check_header_size(value.len())?;
        }
        let record = parse_header(header)?;
        limits.check_extension_count(record.len())?;
        Ok(record)
    }

    #[cfg(feature = "async-tokio")]
    fn rebuild_pipeline(&mut self) {
        debug!(sessions = self.active.len(), "rebuilding extension pipeline");
        self.pipeline = Pipeline::new(self.active.clone());
    }

    #[cfg(not(feature = "async-tokio"))]
    fn rebuild_pipeline(&mut self) {}
}

#[cfg(feature = "async-tokio")]
impl Negotiator {
    /// Pipeline built from the last negotiation.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Run a message read from the wire through the active sessions.
    ///
    /// See [`Pipeline::process_incoming_message`].
    pub fn process_incoming_message<F>(&self, message: Message, callback: F)
    where
        F: FnOnce(Result<Message>) + Send + 'static,
    {
        self.pipeline.process_incoming_message(message, callback);
    }

    /// Run an application message through the active sessions.
    ///
    /// See [`Pipeline::process_outgoing_message`].
    pub fn process_outgoing_message<F>(&self, message: Message, callback: F)
    where
        F: FnOnce(Result<Message>) + Send + 'static,
    {
        self.pipeline.process_outgoing_message(message, callback);
    }

    /// Close every active session once in-flight messages drain.
    ///
    /// See [`Pipeline::close`].
    pub fn close<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pipeline.close(callback);
    }
}

impl fmt::Debug for Negotiator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Negotiator")
            .field("registry", &self.registry)
            .field("reserved", &self.reserved)
            .field(
                "offered",
                &self.offered.iter().map(|o| o.name.as_str()).collect::<Vec<_>>(),
            )
            .field(
                "active",
                &self.active.iter().map(ActiveSession::name).collect::<Vec<_>>(),
            )
            .finish()
    }
}
