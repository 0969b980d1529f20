//! # rsws-extensions - WebSocket extension negotiation and message pipeline
//!
//! `rsws-extensions` implements the extension layer of RFC 6455 (Section 9):
//! it parses and serializes `Sec-WebSocket-Extensions` headers, negotiates
//! which registered extensions become active on a connection, and runs
//! messages through the active extensions while preserving order.
//!
//! ## Features
//!
//! - **Header grammar** with token, quoted-string and numeric parameters
//! - **Offer/response negotiation** for both client and server
//! - **RSV bit ownership** so at most one extension claims each bit
//! - **Ordered async pipeline** that tolerates out-of-order session
//!   completion
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rsws_extensions::{Negotiator, Message};
//!
//! // Server side
//! let mut server = Negotiator::new();
//! server.add(Box::new(MyExtension::new()))?;
//! let response = server.generate_response(offer_header)?;
//!
//! server.process_incoming_message(message, |result| match result {
//!     Ok(message) => deliver(message),
//!     Err(err) => fail_connection(err),
//! });
//! ```

pub mod config;
pub mod error;
pub mod extensions;
pub mod message;
pub mod protocol;

#[cfg(feature = "async-tokio")]
pub mod pipeline;

pub use config::{Config, Limits};
pub use error::{Error, Result};
pub use extensions::{
    ActiveSession, ClientSession, Extension, ExtensionRegistry, Negotiator, Role, RsvBits,
    RsvOwnership, ServerSession, Session, SessionHandle,
};
pub use message::Message;
pub use protocol::{Frame, HeaderRecord, OpCode, Offer, ParamValue, parse_header, serialize_params};

#[cfg(feature = "async-tokio")]
pub use pipeline::{Direction, Pipeline};
