// ABOUTME: SMPP client session module: configuration, state machine, correlation and keep-alive
// ABOUTME: Re-exports the public session API

//! SMPP client sessions.
//!
//! A [`Session`] binds to an SMSC as transmitter, receiver or transceiver,
//! keeps the link answerable while bound and matches responses to requests
//! by sequence number.
//!
//! ```rust,no_run
//! use smpp_session::client::{KeepAliveConfig, KeepAliveManager, Session, SessionConfigurationBuilder};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let config = SessionConfigurationBuilder::new("localhost", 2775)
//!     .system_id("smppclient1")
//!     .password("password")
//!     .build()?;
//! let mut keep_alive = KeepAliveManager::new(KeepAliveConfig::from(&config));
//!
//! let mut session = Session::new(config);
//! session.bind().await?;
//!
//! loop {
//!     session.maintain_keep_alive(&mut keep_alive).await?;
//!     if keep_alive.is_connection_failed() {
//!         break;
//!     }
//!     tokio::time::sleep(Duration::from_secs(1)).await;
//! }
//!
//! session.unbind().await;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod correlator;
pub mod error;
pub mod handler;
pub mod keepalive;
pub mod sequence;
pub mod session;
pub mod types;

pub use builder::SessionConfigurationBuilder;
pub use correlator::{PendingRequests, ResponseFuture};
pub use error::{ConfigError, SessionError, SessionResult};
pub use handler::{DefaultSessionHandler, SessionHandler};
pub use keepalive::{KeepAliveConfig, KeepAliveManager, KeepAliveStatus};
pub use sequence::SequenceNumberAllocator;
pub use session::Session;
pub use types::{BindType, SessionConfiguration, SessionState};
