use num_enum::TryFromPrimitive;

/// This parameter is used to indicate the version of the SMPP protocol.
///
/// Sessions default to [`InterfaceVersion::SmppV50`].
#[derive(TryFromPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum InterfaceVersion {
    SmppV33 = 0x33,
    SmppV34 = 0x34,
    #[default]
    SmppV50 = 0x50,
}
