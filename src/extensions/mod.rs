//! WebSocket Extension Framework (RFC 6455 Section 9).
//!
//! Extensions plug into negotiation through two capability traits:
//!
//! - [`Extension`] is the registered descriptor: a name, the RSV bits its
//!   wire encoding uses, and factories for per-connection sessions.
//! - [`Session`] is one connection's instance of an extension. Client
//!   sessions ([`ClientSession`]) offer and activate, server sessions
//!   ([`ServerSession`]) answer offers, and both transform messages once
//!   negotiation completes.
//!
//! # Example
//!
//! ```rust,ignore
//! use rsws_extensions::{Negotiator, Role};
//!
//! // Client side
//! let mut client = Negotiator::new();
//! client.add(Box::new(MyExtension::new()))?;
//! let offer = client.generate_offer();
//! // ... send offer in Sec-WebSocket-Extensions, receive the response ...
//! client.activate(response.as_deref())?;
//!
//! client.process_outgoing_message(message, |result| { /* write frames */ });
//! ```

pub mod negotiation;
pub mod registry;
mod role;

pub use negotiation::Negotiator;
pub use registry::{ExtensionRegistry, RsvOwnership};
pub use role::Role;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::BoxFuture;

use crate::error::Result;
use crate::message::Message;
use crate::protocol::{Frame, Offer};

/// Future returned by a session for one message.
pub type ProcessFuture = BoxFuture<'static, Result<Message>>;

/// Future returned by a session when it is closed.
pub type CloseFuture = BoxFuture<'static, ()>;

/// RSV bit usage declaration for extensions.
///
/// Extensions must declare which RSV bits they use so that at most one
/// active extension claims each bit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RsvBits {
    /// Extension uses RSV1 bit (e.g., permessage-deflate).
    pub rsv1: bool,
    /// Extension uses RSV2 bit.
    pub rsv2: bool,
    /// Extension uses RSV3 bit.
    pub rsv3: bool,
}

impl RsvBits {
    /// No RSV bits used.
    pub const NONE: Self = Self::new(false, false, false);

    /// RSV1 only (used by permessage-deflate).
    pub const RSV1: Self = Self::new(true, false, false);

    /// RSV2 only.
    pub const RSV2: Self = Self::new(false, true, false);

    /// RSV3 only.
    pub const RSV3: Self = Self::new(false, false, true);

    #[must_use]
    pub const fn new(rsv1: bool, rsv2: bool, rsv3: bool) -> Self {
        Self { rsv1, rsv2, rsv3 }
    }

    /// Check if any bits conflict with another RsvBits declaration.
    #[must_use]
    pub const fn conflicts_with(&self, other: &RsvBits) -> bool {
        (self.rsv1 && other.rsv1) || (self.rsv2 && other.rsv2) || (self.rsv3 && other.rsv3)
    }

    /// Bits set in either declaration.
    #[must_use]
    pub const fn union(self, other: RsvBits) -> Self {
        Self::new(
            self.rsv1 || other.rsv1,
            self.rsv2 || other.rsv2,
            self.rsv3 || other.rsv3,
        )
    }

    /// Returns `true` if every bit set in `self` is also set in `allowed`.
    #[must_use]
    pub const fn permitted_by(&self, allowed: &RsvBits) -> bool {
        (allowed.rsv1 || !self.rsv1) && (allowed.rsv2 || !self.rsv2) && (allowed.rsv3 || !self.rsv3)
    }

    /// Returns `true` if no bit is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !(self.rsv1 || self.rsv2 || self.rsv3)
    }
}

/// Message processing contract shared by client and server sessions.
///
/// Processing returns a `'static` future so a session may complete
/// messages in any order; the pipeline restores submission order.
///
/// # Example Implementation
///
/// ```rust,ignore
/// struct Upper;
///
/// impl Session for Upper {
///     fn process_incoming_message(&mut self, message: Message) -> ProcessFuture {
///         Box::pin(async move { Ok(message) })
///     }
///
///     fn process_outgoing_message(&mut self, message: Message) -> ProcessFuture {
///         let data = message.data.to_ascii_uppercase();
///         Box::pin(async move { Ok(message.with_data(data)) })
///     }
/// }
/// ```
pub trait Session: Send {
    /// Undo this extension's transformation on a message read from the wire.
    ///
    /// # Errors
    ///
    /// The returned future resolves to an error if the message cannot be
    /// decoded; the pipeline stops the incoming direction.
    fn process_incoming_message(&mut self, message: Message) -> ProcessFuture;

    /// Apply this extension's transformation to a message about to be sent.
    ///
    /// # Errors
    ///
    /// The returned future resolves to an error if the message cannot be
    /// encoded; the pipeline stops the outgoing direction.
    fn process_outgoing_message(&mut self, message: Message) -> ProcessFuture;

    /// Which reserved bits this session permits on `frame`.
    ///
    /// Lets an extension restrict a claimed bit, e.g. to the first frame of
    /// a fragmented message. The default permits none.
    fn valid_frame_rsv(&self, _frame: &Frame) -> RsvBits {
        RsvBits::NONE
    }

    /// Release resources once the pipeline no longer needs this session.
    fn close(&mut self) -> CloseFuture {
        Box::pin(std::future::ready(()))
    }
}

/// Negotiation contract of a session created on the offering side.
pub trait ClientSession: Session {
    /// Parameter sets to offer, in preference order. May be empty.
    fn generate_offer(&mut self) -> Vec<Offer>;

    /// Accept the server's chosen parameters.
    ///
    /// Returns `true` only if the parameters are acceptable.
    fn activate(&mut self, params: &Offer) -> bool;
}

/// Negotiation contract of a session created on the answering side.
pub trait ServerSession: Session {
    /// Parameters to send back for the offers this session accepted.
    fn generate_response(&mut self) -> Offer;
}

/// WebSocket extension descriptor.
///
/// Registered once with a [`Negotiator`]; immutable afterwards. The
/// registration order is the precedence order for conflict resolution.
pub trait Extension: Send + Sync {
    /// Returns the extension name as used in Sec-WebSocket-Extensions header.
    fn name(&self) -> &str;

    /// Returns which RSV bits this extension uses.
    fn rsv_bits(&self) -> RsvBits {
        RsvBits::NONE
    }

    /// Build a session to offer this extension, or `None` to opt out.
    fn create_client_session(&self) -> Option<Box<dyn ClientSession>>;

    /// Build a session answering `offers` (every offer the client made for
    /// this extension, in header order), or `None` to decline.
    fn create_server_session(&self, offers: &[Offer]) -> Option<Box<dyn ServerSession>>;
}

/// Shared handle to a negotiated session.
///
/// The negotiator keeps one to answer per-frame RSV queries while the
/// pipeline uses another to process and close.
#[derive(Clone)]
pub struct SessionHandle(Arc<Mutex<Box<dyn Session>>>);

impl SessionHandle {
    pub fn new(session: Box<dyn Session>) -> Self {
        Self(Arc::new(Mutex::new(session)))
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn Session>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn process_incoming_message(&self, message: Message) -> ProcessFuture {
        self.lock().process_incoming_message(message)
    }

    pub fn process_outgoing_message(&self, message: Message) -> ProcessFuture {
        self.lock().process_outgoing_message(message)
    }

    pub fn valid_frame_rsv(&self, frame: &Frame) -> RsvBits {
        self.lock().valid_frame_rsv(frame)
    }

    pub fn close(&self) -> CloseFuture {
        self.lock().close()
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SessionHandle").finish_non_exhaustive()
    }
}

/// An extension session that survived negotiation.
#[derive(Debug, Clone)]
pub struct ActiveSession {
    name: String,
    rsv_bits: RsvBits,
    role: Role,
    session: SessionHandle,
}

impl ActiveSession {
    pub fn new(
        name: impl Into<String>,
        rsv_bits: RsvBits,
        role: Role,
        session: Box<dyn Session>,
    ) -> Self {
        Self {
            name: name.into(),
            rsv_bits,
            role,
            session: SessionHandle::new(session),
        }
    }

    /// Extension name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// RSV bits claimed by this session's extension.
    #[must_use]
    pub const fn rsv_bits(&self) -> RsvBits {
        self.rsv_bits
    }

    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn session(&self) -> &SessionHandle {
        &self.session
    }
}
