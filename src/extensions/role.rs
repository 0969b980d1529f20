//! Negotiation role of a session (client or server).

/// Which side of the negotiation created a session.
///
/// Clients offer and then activate; servers answer offers with a response.
/// Once negotiated, both kinds process messages the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Session created by [`Extension::create_client_session`](super::Extension::create_client_session).
    Client,
    /// Session created by [`Extension::create_server_session`](super::Extension::create_server_session).
    Server,
}
