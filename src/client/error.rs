// ABOUTME: Error types returned by the public session API
// ABOUTME: Wraps transport and codec failures and records why a bind or request failed

use crate::codec::CodecError;
use crate::client::types::SessionState;
use crate::connection::ConnectionError;
use crate::datatypes::{CommandStatus, FixedStringError};
use std::time::Duration;
use thiserror::Error;

/// Error type for session operations
#[derive(Debug, Error)]
pub enum SessionError {
    /// TCP connect refused, unreachable or timed out
    #[error("Failed to connect to {host}:{port}: {source}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: ConnectionError,
    },

    /// The link failed while in use (write error, read error, peer closed)
    #[error("Channel failure: {0}")]
    Channel(String),

    /// No response arrived before the deadline
    #[error("No response within {0:?}")]
    Timeout(Duration),

    /// The SMSC answered the bind with a non-OK status or a generic_nack
    #[error("Bind rejected: {status}")]
    BindRejected { status: CommandStatus },

    /// The peer sent bytes that could not be decoded
    #[error("Malformed PDU: {0}")]
    Malformed(#[from] CodecError),

    /// The session was closed locally while the operation was outstanding
    #[error("Connection closed")]
    ConnectionClosed,

    /// bind() called on a session that is not CLOSED
    #[error("Session is already bound or binding (state {0})")]
    AlreadyBound(SessionState),

    /// The peer answered with a PDU that makes no sense for the request
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// The operation requires a BOUND session
    #[error("Cannot {operation} in state {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    /// The peer refused a request with generic_nack
    #[error("Request refused with generic_nack: {0}")]
    GenericNack(CommandStatus),
}

impl SessionError {
    /// Whether the link is gone as a result of this error
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SessionError::Connect { .. }
                | SessionError::Channel(_)
                | SessionError::ConnectionClosed
                | SessionError::BindRejected { .. }
        )
    }
}

/// Result type alias for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Configuration validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("host must not be empty")]
    MissingHost,

    #[error("port must not be 0")]
    InvalidPort,

    #[error("invalid {field}: {source}")]
    InvalidField {
        field: &'static str,
        #[source]
        source: FixedStringError,
    },

    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },
}
