use num_enum::TryFromPrimitive;

/// Command identifiers for the PDUs this session engine speaks.
///
/// Responses carry the request id with the high bit set. Anything outside this
/// list is rejected by the decoder with `CodecError::InvalidCommandId`.
#[derive(TryFromPrimitive)]
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CommandId {
    GenericNack = 0x8000_0000,
    BindReceiver = 0x0000_0001,
    BindReceiverResp = 0x8000_0001,
    BindTransmitter = 0x0000_0002,
    BindTransmitterResp = 0x8000_0002,
    Unbind = 0x0000_0006,
    UnbindResp = 0x8000_0006,
    BindTransceiver = 0x0000_0009,
    BindTransceiverResp = 0x8000_0009,
    EnquireLink = 0x0000_0015,
    EnquireLinkResp = 0x8000_0015,
}

impl CommandId {
    /// Check if this command_id represents a response PDU
    pub fn is_response(&self) -> bool {
        (*self as u32) & 0x8000_0000 != 0
    }

    /// The response id a peer must answer this request with.
    ///
    /// Returns `None` for ids that are already responses.
    pub fn response_id(&self) -> Option<CommandId> {
        if self.is_response() {
            return None;
        }
        CommandId::try_from((*self as u32) | 0x8000_0000).ok()
    }
}
