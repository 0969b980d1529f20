//! Test harness for negotiation and pipeline tests.
//!
//! Provides a scriptable extension whose sessions tag, delay, gate or fail
//! messages, plus a shared log that records what every session did.

#![allow(dead_code)]

mod extension;
mod log;
mod session;

pub use extension::ScriptedExtension;
pub use log::EventLog;
pub use session::{Behavior, Gated, ScriptedSession, tag};

use rsws_extensions::{Message, Negotiator, Result};
use tokio::sync::{mpsc, oneshot};

/// Run a full offer/response/activate exchange.
///
/// Returns the client and server negotiators with their pipelines built.
pub fn handshake(
    client_extensions: Vec<ScriptedExtension>,
    server_extensions: Vec<ScriptedExtension>,
) -> Result<(Negotiator, Negotiator)> {
    let mut client = Negotiator::new();
    for ext in client_extensions {
        client.add(ext.boxed())?;
    }
    let mut server = Negotiator::new();
    for ext in server_extensions {
        server.add(ext.boxed())?;
    }

    let offer = client.generate_offer();
    let response = server.generate_response(offer.as_deref())?;
    client.activate(response.as_deref())?;
    Ok((client, server))
}

/// Submit an outgoing message and get a receiver for its outcome.
pub fn send(negotiator: &Negotiator, text: &str) -> oneshot::Receiver<Result<Message>> {
    let (tx, rx) = oneshot::channel();
    negotiator.process_outgoing_message(Message::text(text.to_string()), move |result| {
        let _ = tx.send(result);
    });
    rx
}

/// Submit an incoming message and get a receiver for its outcome.
pub fn receive(negotiator: &Negotiator, text: &str) -> oneshot::Receiver<Result<Message>> {
    let (tx, rx) = oneshot::channel();
    negotiator.process_incoming_message(Message::text(text.to_string()), move |result| {
        let _ = tx.send(result);
    });
    rx
}

/// Outcome of a callback, flattened for easy comparison.
pub fn outcome(result: &Result<Message>) -> String {
    match result {
        Ok(message) => message.as_text().unwrap_or_default().to_string(),
        Err(err) => format!("error: {}", err),
    }
}

/// Submit several outgoing messages whose callbacks all feed one channel.
pub fn send_all(negotiator: &Negotiator, texts: &[&str]) -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    for text in texts {
        let tx = tx.clone();
        negotiator.process_outgoing_message(Message::text(text.to_string()), move |result| {
            let _ = tx.send(outcome(&result));
        });
    }
    rx
}

/// Wait until the pipeline's close callback fires.
pub async fn close(negotiator: &Negotiator) {
    let (tx, rx) = oneshot::channel();
    negotiator.close(move || {
        let _ = tx.send(());
    });
    rx.await.expect("close callback dropped");
}
