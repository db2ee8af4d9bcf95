//! SMPP client session engine.
//!
//! Binds to an SMSC over TCP, keeps the session answerable and correlates
//! requests with their responses by sequence number. The PDU catalogue
//! covers the session layer: bind_transmitter, bind_receiver,
//! bind_transceiver, unbind, enquire_link and generic_nack.

pub mod client;
pub mod codec;
pub mod connection;
pub mod datatypes;
mod macros;

#[cfg(test)]
mod tests;

// Re-export codec types for direct access
pub use codec::{CodecError, Decodable, Encodable, Frame, PduDecoder, PduHeader, PduRegistry};

// Re-export the main client API for easy access
pub use client::{
    BindType, Session, SessionConfiguration, SessionConfigurationBuilder, SessionError,
    SessionHandler, SessionResult, SessionState,
};

/// Error returned by session handlers.
///
/// Handler failures are turned into a generic_nack, so a boxed error is all
/// the session needs; the public session API uses [`SessionError`].
pub type Error = Box<dyn std::error::Error + Send + Sync>;
