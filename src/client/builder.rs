// ABOUTME: Fluent builder for SessionConfiguration
// ABOUTME: Accepts plain strings and validates SMPP field limits and timers in build()

use crate::client::error::ConfigError;
use crate::client::types::{BindType, SessionConfiguration};
use crate::datatypes::{FixedString, InterfaceVersion, NumericPlanIndicator, TypeOfNumber};
use std::time::Duration;

/// Builder for [`SessionConfiguration`]
///
/// ```rust
/// use smpp_session::client::{BindType, SessionConfigurationBuilder};
/// use std::time::Duration;
///
/// let config = SessionConfigurationBuilder::new("localhost", 2775)
///     .system_id("smppclient1")
///     .password("password")
///     .bind_type(BindType::Transmitter)
///     .request_timeout(Duration::from_secs(5))
///     .build()
///     .unwrap();
/// assert_eq!(config.system_id, "smppclient1");
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfigurationBuilder {
    host: String,
    port: u16,
    system_id: String,
    password: String,
    system_type: String,
    bind_type: BindType,
    interface_version: InterfaceVersion,
    addr_ton: TypeOfNumber,
    addr_npi: NumericPlanIndicator,
    address_range: String,
    enquire_link_interval: Duration,
    request_timeout: Duration,
    connect_timeout: Duration,
    unbind_timeout: Duration,
}

impl SessionConfigurationBuilder {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            system_id: String::new(),
            password: String::new(),
            system_type: String::new(),
            bind_type: BindType::Transceiver,
            interface_version: InterfaceVersion::SmppV50,
            addr_ton: TypeOfNumber::Unknown,
            addr_npi: NumericPlanIndicator::Unknown,
            address_range: String::new(),
            enquire_link_interval: SessionConfiguration::DEFAULT_ENQUIRE_LINK_INTERVAL,
            request_timeout: SessionConfiguration::DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: SessionConfiguration::DEFAULT_CONNECT_TIMEOUT,
            unbind_timeout: SessionConfiguration::DEFAULT_UNBIND_TIMEOUT,
        }
    }

    pub fn system_id(mut self, system_id: impl Into<String>) -> Self {
        self.system_id = system_id.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    pub fn system_type(mut self, system_type: impl Into<String>) -> Self {
        self.system_type = system_type.into();
        self
    }

    pub fn bind_type(mut self, bind_type: BindType) -> Self {
        self.bind_type = bind_type;
        self
    }

    pub fn interface_version(mut self, interface_version: InterfaceVersion) -> Self {
        self.interface_version = interface_version;
        self
    }

    pub fn addr_ton(mut self, addr_ton: TypeOfNumber) -> Self {
        self.addr_ton = addr_ton;
        self
    }

    pub fn addr_npi(mut self, addr_npi: NumericPlanIndicator) -> Self {
        self.addr_npi = addr_npi;
        self
    }

    pub fn address_range(mut self, address_range: impl Into<String>) -> Self {
        self.address_range = address_range.into();
        self
    }

    pub fn enquire_link_interval(mut self, interval: Duration) -> Self {
        self.enquire_link_interval = interval;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn unbind_timeout(mut self, timeout: Duration) -> Self {
        self.unbind_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<SessionConfiguration, ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::MissingHost);
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        for (field, value) in [
            ("enquire_link_interval", self.enquire_link_interval),
            ("request_timeout", self.request_timeout),
            ("connect_timeout", self.connect_timeout),
            ("unbind_timeout", self.unbind_timeout),
        ] {
            if value.is_zero() {
                return Err(ConfigError::ZeroDuration { field });
            }
        }

        let mut config = SessionConfiguration::new(
            self.host,
            self.port,
            field("system_id", &self.system_id)?,
            field("password", &self.password)?,
        );
        config.system_type = field("system_type", &self.system_type)?;
        config.address_range = field("address_range", &self.address_range)?;
        config.bind_type = self.bind_type;
        config.interface_version = self.interface_version;
        config.addr_ton = self.addr_ton;
        config.addr_npi = self.addr_npi;
        config.enquire_link_interval = self.enquire_link_interval;
        config.request_timeout = self.request_timeout;
        config.connect_timeout = self.connect_timeout;
        config.unbind_timeout = self.unbind_timeout;
        Ok(config)
    }
}

fn field<const N: usize>(name: &'static str, value: &str) -> Result<FixedString<N>, ConfigError> {
    value.parse().map_err(|source| ConfigError::InvalidField {
        field: name,
        source,
    })
}
