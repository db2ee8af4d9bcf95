use crate::codec::{
    decode_cstring, decode_u8, encode_cstring, CodecError, Decodable, Encodable, PduHeader,
};
use crate::datatypes::tlv::{Tlv, SC_INTERFACE_VERSION};
use crate::datatypes::{
    AddressRange, CommandId, CommandStatus, FixedString, InterfaceVersion, NumericPlanIndicator,
    Password, SystemId, SystemType, TypeOfNumber,
};
use bytes::{Buf, BufMut, BytesMut};
use std::fmt;
use std::io::Cursor;

/// Role requested by a bind operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BindType {
    /// Bind as transmitter (can send submit_sm)
    Transmitter,
    /// Bind as receiver (can receive deliver_sm)
    Receiver,
    /// Bind as transceiver (both transmitter and receiver capabilities)
    #[default]
    Transceiver,
}

impl BindType {
    pub fn command_id(&self) -> CommandId {
        match self {
            BindType::Transmitter => CommandId::BindTransmitter,
            BindType::Receiver => CommandId::BindReceiver,
            BindType::Transceiver => CommandId::BindTransceiver,
        }
    }

    pub fn response_command_id(&self) -> CommandId {
        match self {
            BindType::Transmitter => CommandId::BindTransmitterResp,
            BindType::Receiver => CommandId::BindReceiverResp,
            BindType::Transceiver => CommandId::BindTransceiverResp,
        }
    }

    /// Bind type for a bind or bind_resp command id
    pub fn from_command_id(command_id: CommandId) -> Option<BindType> {
        match command_id {
            CommandId::BindTransmitter | CommandId::BindTransmitterResp => {
                Some(BindType::Transmitter)
            }
            CommandId::BindReceiver | CommandId::BindReceiverResp => Some(BindType::Receiver),
            CommandId::BindTransceiver | CommandId::BindTransceiverResp => {
                Some(BindType::Transceiver)
            }
            _ => None,
        }
    }
}

impl fmt::Display for BindType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BindType::Transmitter => "transmitter",
            BindType::Receiver => "receiver",
            BindType::Transceiver => "transceiver",
        };
        f.write_str(name)
    }
}

/// bind_transmitter / bind_receiver / bind_transceiver.
///
/// All three share one body layout; `bind_type` selects the command id.
#[derive(Clone, Debug, PartialEq)]
pub struct Bind {
    pub bind_type: BindType,
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    // Body
    /// Identification of the ESME requesting to bind, up to 15 characters.
    pub system_id: SystemId,

    /// Password for authentication, up to 8 characters. Empty when the SMSC
    /// does not require one.
    pub password: Password,

    /// Category of ESME, e.g. "VMS" or "OTA", up to 12 characters.
    pub system_type: SystemType,

    /// Version of the SMPP protocol the ESME speaks.
    pub interface_version: InterfaceVersion,

    /// Type of Number of the ESME address(es) served via this session.
    pub addr_ton: TypeOfNumber,

    /// Numbering Plan Indicator of the ESME address(es) served via this session.
    pub addr_npi: NumericPlanIndicator,

    /// Range of SME addresses serviced by the ESME, up to 40 characters.
    pub address_range: AddressRange,
}

impl Bind {
    pub fn builder() -> BindBuilder {
        BindBuilder::default()
    }
}

/// Builder for bind PDUs with SMPP 5.0 transceiver defaults
#[derive(Default)]
pub struct BindBuilder {
    bind: BindFields,
}

#[derive(Default)]
struct BindFields {
    bind_type: BindType,
    sequence_number: u32,
    system_id: SystemId,
    password: Password,
    system_type: SystemType,
    interface_version: InterfaceVersion,
    addr_ton: TypeOfNumber,
    addr_npi: NumericPlanIndicator,
    address_range: AddressRange,
}

impl BindBuilder {
    pub fn bind_type(mut self, bind_type: BindType) -> Self {
        self.bind.bind_type = bind_type;
        self
    }

    pub fn sequence_number(mut self, sequence_number: u32) -> Self {
        self.bind.sequence_number = sequence_number;
        self
    }

    pub fn system_id(mut self, system_id: SystemId) -> Self {
        self.bind.system_id = system_id;
        self
    }

    pub fn password(mut self, password: Password) -> Self {
        self.bind.password = password;
        self
    }

    pub fn system_type(mut self, system_type: SystemType) -> Self {
        self.bind.system_type = system_type;
        self
    }

    pub fn interface_version(mut self, interface_version: InterfaceVersion) -> Self {
        self.bind.interface_version = interface_version;
        self
    }

    pub fn addr_ton(mut self, addr_ton: TypeOfNumber) -> Self {
        self.bind.addr_ton = addr_ton;
        self
    }

    pub fn addr_npi(mut self, addr_npi: NumericPlanIndicator) -> Self {
        self.bind.addr_npi = addr_npi;
        self
    }

    pub fn address_range(mut self, address_range: AddressRange) -> Self {
        self.bind.address_range = address_range;
        self
    }

    pub fn build(self) -> Bind {
        let fields = self.bind;
        Bind {
            bind_type: fields.bind_type,
            command_status: CommandStatus::Ok,
            sequence_number: fields.sequence_number,
            system_id: fields.system_id,
            password: fields.password,
            system_type: fields.system_type,
            interface_version: fields.interface_version,
            addr_ton: fields.addr_ton,
            addr_npi: fields.addr_npi,
            address_range: fields.address_range,
        }
    }
}

/// bind_*_resp. A rejected bind usually arrives with an empty body, in which
/// case `system_id` stays empty.
#[derive(Clone, Debug, PartialEq)]
pub struct BindResponse {
    pub bind_type: BindType,
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    // Body
    /// Identification of the SMSC answering the bind.
    pub system_id: SystemId,
    /// Raw sc_interface_version TLV value, when the SMSC sends one.
    pub sc_interface_version: Option<u8>,
    /// Any other optional parameters, kept in arrival order.
    pub optional_parameters: Vec<Tlv>,
}

impl BindResponse {
    pub fn new(bind_type: BindType, sequence_number: u32, system_id: SystemId) -> Self {
        Self {
            bind_type,
            command_status: CommandStatus::Ok,
            sequence_number,
            system_id,
            sc_interface_version: None,
            optional_parameters: Vec::new(),
        }
    }

    /// A header-only rejection as SMSCs send it
    pub fn rejected(bind_type: BindType, sequence_number: u32, status: CommandStatus) -> Self {
        Self {
            command_status: status,
            ..Self::new(bind_type, sequence_number, SystemId::default())
        }
    }

    pub fn with_sc_interface_version(mut self, version: InterfaceVersion) -> Self {
        self.sc_interface_version = Some(version as u8);
        self
    }
}

fn decode_field<const N: usize>(
    buf: &mut Cursor<&[u8]>,
    field: &'static str,
) -> Result<FixedString<N>, CodecError> {
    let raw = decode_cstring(buf, N, field)?;
    FixedString::new(&raw).map_err(|e| CodecError::FieldValidation {
        field,
        reason: e.to_string(),
    })
}

impl Decodable for Bind {
    fn command_ids() -> &'static [CommandId] {
        &[
            CommandId::BindTransmitter,
            CommandId::BindReceiver,
            CommandId::BindTransceiver,
        ]
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;
        let bind_type = BindType::from_command_id(header.command_id).ok_or(
            CodecError::UnexpectedCommandId {
                expected: CommandId::BindTransceiver,
                actual: header.command_id,
            },
        )?;

        let system_id = decode_field(buf, "system_id")?;
        let password = decode_field(buf, "password")?;
        let system_type = decode_field(buf, "system_type")?;
        let version = decode_u8(buf, "interface_version")?;
        let interface_version =
            InterfaceVersion::try_from(version).map_err(|_| CodecError::FieldValidation {
                field: "interface_version",
                reason: format!("unsupported version {version:#04x}"),
            })?;
        let ton = decode_u8(buf, "addr_ton")?;
        let addr_ton = TypeOfNumber::try_from(ton).map_err(|_| CodecError::FieldValidation {
            field: "addr_ton",
            reason: format!("unknown type of number {ton:#04x}"),
        })?;
        let npi = decode_u8(buf, "addr_npi")?;
        let addr_npi =
            NumericPlanIndicator::try_from(npi).map_err(|_| CodecError::FieldValidation {
                field: "addr_npi",
                reason: format!("unknown numbering plan {npi:#04x}"),
            })?;
        let address_range = decode_field(buf, "address_range")?;

        if buf.has_remaining() {
            return Err(CodecError::FieldValidation {
                field: "bind_body",
                reason: format!("{} unexpected trailing bytes", buf.remaining()),
            });
        }

        Ok(Bind {
            bind_type,
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            system_id,
            password,
            system_type,
            interface_version,
            addr_ton,
            addr_npi,
            address_range,
        })
    }
}

impl Encodable for Bind {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        let header = PduHeader {
            command_length: self.encoded_size() as u32,
            command_id: self.bind_type.command_id(),
            command_status: self.command_status,
            sequence_number: self.sequence_number,
        };
        header.encode(buf);

        encode_cstring(buf, self.system_id.as_ref());
        encode_cstring(buf, self.password.as_ref());
        encode_cstring(buf, self.system_type.as_ref());
        buf.put_u8(self.interface_version as u8);
        buf.put_u8(self.addr_ton as u8);
        buf.put_u8(self.addr_npi as u8);
        encode_cstring(buf, self.address_range.as_ref());
        Ok(())
    }

    fn encoded_size(&self) -> usize {
        PduHeader::SIZE
            + self.system_id.wire_len()
            + self.password.wire_len()
            + self.system_type.wire_len()
            + 3
            + self.address_range.wire_len()
    }
}

impl Decodable for BindResponse {
    fn command_ids() -> &'static [CommandId] {
        &[
            CommandId::BindTransmitterResp,
            CommandId::BindReceiverResp,
            CommandId::BindTransceiverResp,
        ]
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;
        let bind_type = BindType::from_command_id(header.command_id).ok_or(
            CodecError::UnexpectedCommandId {
                expected: CommandId::BindTransceiverResp,
                actual: header.command_id,
            },
        )?;

        let mut response = BindResponse::rejected(
            bind_type,
            header.sequence_number,
            header.command_status,
        );
        if !buf.has_remaining() {
            return Ok(response);
        }

        response.system_id = decode_field(buf, "system_id")?;
        while buf.has_remaining() {
            let tlv = Tlv::decode(buf)?;
            if tlv.tag == SC_INTERFACE_VERSION && tlv.value.len() == 1 {
                response.sc_interface_version = Some(tlv.value[0]);
            } else {
                response.optional_parameters.push(tlv);
            }
        }
        Ok(response)
    }
}

impl Encodable for BindResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        let header = PduHeader {
            command_length: self.encoded_size() as u32,
            command_id: self.bind_type.response_command_id(),
            command_status: self.command_status,
            sequence_number: self.sequence_number,
        };
        header.encode(buf);

        encode_cstring(buf, self.system_id.as_ref());
        if let Some(version) = self.sc_interface_version {
            Tlv::new(SC_INTERFACE_VERSION, vec![version]).encode(buf)?;
        }
        for tlv in &self.optional_parameters {
            tlv.encode(buf)?;
        }
        Ok(())
    }

    fn encoded_size(&self) -> usize {
        let mut size = PduHeader::SIZE + self.system_id.wire_len();
        if self.sc_interface_version.is_some() {
            size += 5;
        }
        size + self
            .optional_parameters
            .iter()
            .map(Tlv::encoded_size)
            .sum::<usize>()
    }
}
