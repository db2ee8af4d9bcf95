// ABOUTME: Session configuration and state types
// ABOUTME: SessionConfiguration is immutable once handed to a Session; SessionState is stored as a u8

use crate::datatypes::{
    AddressRange, Bind, InterfaceVersion, NumericPlanIndicator, Password, SystemId, SystemType,
    TypeOfNumber,
};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;
use std::time::Duration;

pub use crate::datatypes::BindType;

/// Everything a session needs to reach and bind to an SMSC.
///
/// A `Session` keeps its own copy, so changing a configuration after the
/// session was created has no effect on it.
#[derive(Debug, Clone)]
pub struct SessionConfiguration {
    pub host: String,
    pub port: u16,
    pub system_id: SystemId,
    pub password: Password,
    pub system_type: SystemType,
    pub bind_type: BindType,
    pub interface_version: InterfaceVersion,
    pub addr_ton: TypeOfNumber,
    pub addr_npi: NumericPlanIndicator,
    pub address_range: AddressRange,
    /// Suggested spacing between enquire_link probes; used by the keep-alive helper
    pub enquire_link_interval: Duration,
    /// Deadline for the bind response
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// How long unbind() waits for unbind_resp before closing anyway
    pub unbind_timeout: Duration,
}

impl SessionConfiguration {
    pub const DEFAULT_ENQUIRE_LINK_INTERVAL: Duration = Duration::from_secs(30);
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_UNBIND_TIMEOUT: Duration = Duration::from_millis(100);

    /// Transceiver bind with SMPP 5.0 and the default timers
    pub fn new(
        host: impl Into<String>,
        port: u16,
        system_id: SystemId,
        password: Password,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            system_id,
            password,
            system_type: SystemType::default(),
            bind_type: BindType::Transceiver,
            interface_version: InterfaceVersion::SmppV50,
            addr_ton: TypeOfNumber::Unknown,
            addr_npi: NumericPlanIndicator::Unknown,
            address_range: AddressRange::default(),
            enquire_link_interval: Self::DEFAULT_ENQUIRE_LINK_INTERVAL,
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
            unbind_timeout: Self::DEFAULT_UNBIND_TIMEOUT,
        }
    }

    /// The bind PDU this configuration describes
    pub fn bind_pdu(&self, sequence_number: u32) -> Bind {
        Bind::builder()
            .bind_type(self.bind_type)
            .sequence_number(sequence_number)
            .system_id(self.system_id)
            .password(self.password)
            .system_type(self.system_type)
            .interface_version(self.interface_version)
            .addr_ton(self.addr_ton)
            .addr_npi(self.addr_npi)
            .address_range(self.address_range)
            .build()
    }
}

/// Lifecycle of a session. CLOSED is both the initial and the terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum SessionState {
    Closed = 0,
    /// TCP connected, bind not yet sent
    Open = 1,
    /// Bind sent, waiting for the response
    Binding = 2,
    Bound = 3,
    /// Unbind sent, waiting for unbind_resp or the grace period
    Unbinding = 4,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Closed => "CLOSED",
            SessionState::Open => "OPEN",
            SessionState::Binding => "BINDING",
            SessionState::Bound => "BOUND",
            SessionState::Unbinding => "UNBINDING",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
