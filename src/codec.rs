// SMPP Codec - Separates parsing/encoding logic from domain models
//
// Each PDU implements Encodable/Decodable; `Frame` is the tagged union the
// session layer works with, and `PduDecoder` turns an arbitrarily chunked
// byte stream into frames.

use crate::datatypes::{
    Bind, BindResponse, CommandId, CommandStatus, EnquireLink, EnquireLinkResponse, GenericNack,
    Unbind, UnbindResponse,
};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::collections::HashMap;
use std::io::Cursor;
use thiserror::Error;

/// Maximum allowed PDU size to prevent memory exhaustion attacks
pub const MAX_PDU_SIZE: u32 = 65536; // 64KB

/// SMPP PDU Header (16 bytes, common to all PDUs)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PduHeader {
    pub command_length: u32,
    pub command_id: CommandId,
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl PduHeader {
    pub const SIZE: usize = 16;

    /// Decode PDU header from buffer with validation
    pub fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        if buf.remaining() < Self::SIZE {
            return Err(CodecError::Incomplete);
        }

        let command_length = buf.get_u32();
        let command_id_raw = buf.get_u32();
        let command_status = CommandStatus::from(buf.get_u32());
        let sequence_number = buf.get_u32();

        if !(Self::SIZE as u32..=MAX_PDU_SIZE).contains(&command_length) {
            return Err(CodecError::InvalidPduLength {
                length: command_length,
                min: Self::SIZE as u32,
                max: MAX_PDU_SIZE,
            });
        }

        let command_id =
            CommandId::try_from(command_id_raw).map_err(|_| CodecError::InvalidCommandId {
                command_id: command_id_raw,
                sequence_number,
            })?;

        Ok(PduHeader {
            command_length,
            command_id,
            command_status,
            sequence_number,
        })
    }

    /// Encode PDU header to buffer
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32(self.command_length);
        buf.put_u32(self.command_id as u32);
        buf.put_u32(self.command_status.code());
        buf.put_u32(self.sequence_number);
    }
}

/// Trait for types that can be encoded to bytes
pub trait Encodable {
    /// Encode this PDU, header included, to the buffer
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError>;

    /// Size of the encoded PDU including the 16 byte header
    fn encoded_size(&self) -> usize;

    /// Convert this PDU to a standalone frame
    fn to_bytes(&self) -> Result<Bytes, CodecError> {
        let mut buf = BytesMut::with_capacity(self.encoded_size());
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }
}

/// Trait for types that can be decoded from bytes
pub trait Decodable: Sized {
    /// Decode this PDU from the buffer after header
    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError>;

    /// The command ids this type decodes
    fn command_ids() -> &'static [CommandId];

    /// Validate the header is appropriate for this PDU type
    fn validate_header(header: &PduHeader) -> Result<(), CodecError> {
        let accepted = Self::command_ids();
        if !accepted.contains(&header.command_id) {
            return Err(CodecError::UnexpectedCommandId {
                expected: accepted[0],
                actual: header.command_id,
            });
        }
        Ok(())
    }
}

/// Codec errors with detailed context for debugging
#[derive(Debug, Clone, Error)]
pub enum CodecError {
    #[error("Incomplete PDU: need more data")]
    Incomplete,

    #[error("Invalid command_id: {command_id:#010x} (sequence {sequence_number})")]
    InvalidCommandId {
        command_id: u32,
        sequence_number: u32,
    },

    #[error("Invalid PDU length: {length}, must be {min}-{max}")]
    InvalidPduLength { length: u32, min: u32, max: u32 },

    #[error("Unexpected command_id: expected {expected:?}, got {actual:?}")]
    UnexpectedCommandId {
        expected: CommandId,
        actual: CommandId,
    },

    #[error("Field '{field}' validation failed: {reason}")]
    FieldValidation { field: &'static str, reason: String },

    #[error("TLV parsing error: {0}")]
    TlvError(String),

    #[error("Malformed {command_id:?} body (sequence {sequence_number}): {source}")]
    MalformedBody {
        command_id: CommandId,
        sequence_number: u32,
        #[source]
        source: Box<CodecError>,
    },
}

impl CodecError {
    /// Whether the offending frame was fully consumed, leaving the stream aligned
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CodecError::InvalidCommandId { .. } | CodecError::MalformedBody { .. }
        )
    }

    /// Sequence number of the offending frame, when it could be read
    pub fn sequence_number(&self) -> Option<u32> {
        match self {
            CodecError::InvalidCommandId {
                sequence_number, ..
            }
            | CodecError::MalformedBody {
                sequence_number, ..
            } => Some(*sequence_number),
            _ => None,
        }
    }

    /// Whether the offending frame was a response (high bit of command_id set)
    pub fn is_response(&self) -> bool {
        match self {
            CodecError::InvalidCommandId { command_id, .. } => command_id & 0x8000_0000 != 0,
            CodecError::MalformedBody { command_id, .. } => command_id.is_response(),
            _ => false,
        }
    }

    /// Convert codec errors to appropriate SMPP command_status codes
    pub fn to_command_status(&self) -> CommandStatus {
        match self {
            CodecError::InvalidPduLength { .. } => CommandStatus::InvalidCommandLength,
            CodecError::InvalidCommandId { .. } => CommandStatus::InvalidCommandId,
            CodecError::MalformedBody { source, .. } => source.to_command_status(),
            CodecError::FieldValidation { field, .. } => match *field {
                "system_id" => CommandStatus::InvalidSystemId,
                "password" => CommandStatus::InvalidPassword,
                "system_type" => CommandStatus::InvalidSystemTypeField,
                _ => CommandStatus::InvalidCommandLength,
            },
            CodecError::TlvError(_) => CommandStatus::InvalidParameterLength,
            _ => CommandStatus::SystemError,
        }
    }
}

/// Decode a variable length C-octet string of at most `max_len` bytes
/// including its NUL terminator.
pub fn decode_cstring(
    buf: &mut Cursor<&[u8]>,
    max_len: usize,
    field_name: &'static str,
) -> Result<Bytes, CodecError> {
    let chunk = buf.chunk();
    let Some(end) = chunk.iter().take(max_len).position(|&b| b == 0) else {
        let reason = if chunk.len() < max_len {
            "missing NUL terminator".to_string()
        } else {
            format!("longer than {} bytes", max_len - 1)
        };
        return Err(CodecError::FieldValidation {
            field: field_name,
            reason,
        });
    };

    let value = buf.copy_to_bytes(end);
    buf.advance(1);
    Ok(value)
}

/// Encode a C-octet string followed by its NUL terminator
pub fn encode_cstring(buf: &mut BytesMut, value: &[u8]) {
    buf.put_slice(value);
    buf.put_u8(0);
}

/// Decode a single byte
pub fn decode_u8(buf: &mut Cursor<&[u8]>, field_name: &'static str) -> Result<u8, CodecError> {
    if buf.remaining() < 1 {
        return Err(CodecError::FieldValidation {
            field: field_name,
            reason: "PDU ends before this field".to_string(),
        });
    }
    Ok(buf.get_u8())
}

/// Generic frame type that can hold any PDU this crate speaks
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    // Bind PDUs; the command id follows the bind type
    Bind(Bind),
    BindResp(BindResponse),

    // Keep-alive PDUs
    EnquireLink(EnquireLink),
    EnquireLinkResp(EnquireLinkResponse),

    // Session management PDUs
    Unbind(Unbind),
    UnbindResp(UnbindResponse),

    GenericNack(GenericNack),
}

/// Registry of PDU decoders for extensible parsing
type DecoderFn =
    Box<dyn Fn(PduHeader, &mut Cursor<&[u8]>) -> Result<Frame, CodecError> + Send + Sync>;

pub struct PduRegistry {
    decoders: HashMap<CommandId, DecoderFn>,
}

impl PduRegistry {
    /// Create a new registry with the session PDUs registered
    pub fn new() -> Self {
        let mut registry = Self {
            decoders: HashMap::new(),
        };

        registry.register_pdu::<Bind, _>(Frame::Bind);
        registry.register_pdu::<BindResponse, _>(Frame::BindResp);
        registry.register_pdu::<EnquireLink, _>(Frame::EnquireLink);
        registry.register_pdu::<EnquireLinkResponse, _>(Frame::EnquireLinkResp);
        registry.register_pdu::<Unbind, _>(Frame::Unbind);
        registry.register_pdu::<UnbindResponse, _>(Frame::UnbindResp);
        registry.register_pdu::<GenericNack, _>(Frame::GenericNack);

        registry
    }

    fn register_pdu<T, F>(&mut self, frame_constructor: F)
    where
        T: Decodable + 'static,
        F: Fn(T) -> Frame + Clone + Send + Sync + 'static,
    {
        for &command_id in T::command_ids() {
            let constructor = frame_constructor.clone();
            let decoder = Box::new(move |header: PduHeader, buf: &mut Cursor<&[u8]>| {
                let pdu = T::decode(header, buf)?;
                Ok(constructor(pdu))
            });
            self.decoders.insert(command_id, decoder);
        }
    }

    /// Decode a PDU given its header and the remainder of its frame
    pub fn decode_pdu(
        &self,
        header: PduHeader,
        buf: &mut Cursor<&[u8]>,
    ) -> Result<Frame, CodecError> {
        match self.decoders.get(&header.command_id) {
            Some(decoder) => decoder(header, buf),
            None => Err(CodecError::InvalidCommandId {
                command_id: header.command_id as u32,
                sequence_number: header.sequence_number,
            }),
        }
    }
}

impl Default for PduRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PduRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PduRegistry")
            .field("registered", &self.decoders.len())
            .finish()
    }
}

impl Frame {
    /// Get the command_id for this frame
    pub fn command_id(&self) -> CommandId {
        match self {
            Frame::Bind(pdu) => pdu.bind_type.command_id(),
            Frame::BindResp(pdu) => pdu.bind_type.response_command_id(),
            Frame::EnquireLink(_) => CommandId::EnquireLink,
            Frame::EnquireLinkResp(_) => CommandId::EnquireLinkResp,
            Frame::Unbind(_) => CommandId::Unbind,
            Frame::UnbindResp(_) => CommandId::UnbindResp,
            Frame::GenericNack(_) => CommandId::GenericNack,
        }
    }

    /// Get the sequence number for this frame
    pub fn sequence_number(&self) -> u32 {
        match self {
            Frame::Bind(pdu) => pdu.sequence_number,
            Frame::BindResp(pdu) => pdu.sequence_number,
            Frame::EnquireLink(pdu) => pdu.sequence_number,
            Frame::EnquireLinkResp(pdu) => pdu.sequence_number,
            Frame::Unbind(pdu) => pdu.sequence_number,
            Frame::UnbindResp(pdu) => pdu.sequence_number,
            Frame::GenericNack(pdu) => pdu.sequence_number,
        }
    }

    /// Get the command_status for this frame
    pub fn command_status(&self) -> CommandStatus {
        match self {
            Frame::Bind(pdu) => pdu.command_status,
            Frame::BindResp(pdu) => pdu.command_status,
            Frame::EnquireLink(pdu) => pdu.command_status,
            Frame::EnquireLinkResp(pdu) => pdu.command_status,
            Frame::Unbind(pdu) => pdu.command_status,
            Frame::UnbindResp(pdu) => pdu.command_status,
            Frame::GenericNack(pdu) => pdu.command_status,
        }
    }

    /// Overwrite the sequence number, used when the session allocates one
    pub fn set_sequence_number(&mut self, sequence_number: u32) {
        match self {
            Frame::Bind(pdu) => pdu.sequence_number = sequence_number,
            Frame::BindResp(pdu) => pdu.sequence_number = sequence_number,
            Frame::EnquireLink(pdu) => pdu.sequence_number = sequence_number,
            Frame::EnquireLinkResp(pdu) => pdu.sequence_number = sequence_number,
            Frame::Unbind(pdu) => pdu.sequence_number = sequence_number,
            Frame::UnbindResp(pdu) => pdu.sequence_number = sequence_number,
            Frame::GenericNack(pdu) => pdu.sequence_number = sequence_number,
        }
    }

    /// Check if this frame is a response PDU
    pub fn is_response(&self) -> bool {
        self.command_id().is_response()
    }

    fn pdu(&self) -> &dyn Encodable {
        match self {
            Frame::Bind(pdu) => pdu,
            Frame::BindResp(pdu) => pdu,
            Frame::EnquireLink(pdu) => pdu,
            Frame::EnquireLinkResp(pdu) => pdu,
            Frame::Unbind(pdu) => pdu,
            Frame::UnbindResp(pdu) => pdu,
            Frame::GenericNack(pdu) => pdu,
        }
    }
}

impl Encodable for Frame {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        self.pdu().encode(buf)
    }

    fn encoded_size(&self) -> usize {
        self.pdu().encoded_size()
    }
}

/// Restartable frame decoder.
///
/// Bytes are appended to an internal buffer; complete frames are split off
/// the front and partial trailing bytes wait for the next call. Decoding
/// never blocks.
#[derive(Debug, Default)]
pub struct PduDecoder {
    buffer: BytesMut,
    registry: PduRegistry,
    // Set once a frame with an impossible command_length is seen
    poisoned: Option<u32>,
}

impl PduDecoder {
    pub fn new() -> Self {
        Self {
            // 4KB comfortably holds any bind/enquire_link exchange
            buffer: BytesMut::with_capacity(4 * 1024),
            registry: PduRegistry::new(),
            poisoned: None,
        }
    }

    /// Append raw bytes without decoding
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// The read buffer, for transports that read straight into it
    pub fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buffer
    }

    /// Number of bytes waiting for the rest of their frame
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Append `data` and iterate over every frame that is now complete
    pub fn decode(&mut self, data: &[u8]) -> Frames<'_> {
        self.extend(data);
        Frames {
            decoder: self,
            done: false,
        }
    }

    /// Try to split one frame off the buffer.
    ///
    /// `Ok(None)` means more bytes are needed. Recoverable errors consume the
    /// offending frame; an invalid command_length poisons the decoder.
    pub fn decode_next(&mut self) -> Result<Option<Frame>, CodecError> {
        if let Some(length) = self.poisoned {
            return Err(Self::length_error(length));
        }

        if self.buffer.len() < 4 {
            return Ok(None);
        }

        let command_length = (&self.buffer[..4]).get_u32();
        if !(PduHeader::SIZE as u32..=MAX_PDU_SIZE).contains(&command_length) {
            self.poisoned = Some(command_length);
            return Err(Self::length_error(command_length));
        }

        if self.buffer.len() < command_length as usize {
            return Ok(None);
        }

        let frame_bytes = self.buffer.split_to(command_length as usize).freeze();
        let mut cursor = Cursor::new(frame_bytes.as_ref());
        let header = PduHeader::decode(&mut cursor)?;

        let frame = self
            .registry
            .decode_pdu(header, &mut cursor)
            .map_err(|source| match source {
                CodecError::InvalidCommandId { .. } => source,
                source => CodecError::MalformedBody {
                    command_id: header.command_id,
                    sequence_number: header.sequence_number,
                    source: Box::new(source),
                },
            })?;

        tracing::trace!(
            command_id = ?header.command_id,
            sequence_number = header.sequence_number,
            "decoded frame"
        );
        Ok(Some(frame))
    }

    fn length_error(length: u32) -> CodecError {
        CodecError::InvalidPduLength {
            length,
            min: PduHeader::SIZE as u32,
            max: MAX_PDU_SIZE,
        }
    }
}

/// Lazy sequence of frames produced by [`PduDecoder::decode`].
///
/// Ends when the buffered bytes no longer hold a complete frame, or after a
/// non-recoverable error has been yielded.
pub struct Frames<'a> {
    decoder: &'a mut PduDecoder,
    done: bool,
}

impl Iterator for Frames<'_> {
    type Item = Result<Frame, CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.decoder.decode_next() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = !err.is_recoverable();
                Some(Err(err))
            }
        }
    }
}
