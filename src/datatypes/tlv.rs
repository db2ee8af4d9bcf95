use crate::codec::CodecError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;

/// Tag of the sc_interface_version optional parameter carried by bind responses.
pub const SC_INTERFACE_VERSION: u16 = 0x0210;

/// An optional parameter in tag-length-value form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tlv {
    /// The Tag field is used to uniquely identify the particular optional parameter in question.
    pub tag: u16,

    /// The Value field contains the actual data for the optional parameter in question.
    /// Its length is written on the wire as a u16 ahead of the value.
    pub value: Bytes,
}

impl Tlv {
    pub fn new(tag: u16, value: impl Into<Bytes>) -> Self {
        Self {
            tag,
            value: value.into(),
        }
    }

    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        let length = u16::try_from(self.value.len()).map_err(|_| CodecError::FieldValidation {
            field: "tlv_value",
            reason: format!("{} bytes does not fit a u16 length", self.value.len()),
        })?;
        buf.put_u16(self.tag);
        buf.put_u16(length);
        buf.put_slice(&self.value);
        Ok(())
    }

    pub fn encoded_size(&self) -> usize {
        4 + self.value.len()
    }

    /// Decode one TLV; the cursor must hold the complete parameter.
    pub fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        if buf.remaining() < 4 {
            return Err(CodecError::TlvError(format!(
                "{} trailing bytes are too short for a TLV header",
                buf.remaining()
            )));
        }
        let tag = buf.get_u16();
        let length = buf.get_u16() as usize;
        if buf.remaining() < length {
            return Err(CodecError::TlvError(format!(
                "TLV {tag:#06x} declares {length} bytes, {} available",
                buf.remaining()
            )));
        }
        Ok(Tlv {
            tag,
            value: buf.copy_to_bytes(length),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sc_interface_version_wire_form() {
        let tlv = Tlv::new(SC_INTERFACE_VERSION, vec![0x50]);
        let mut buf = BytesMut::new();
        tlv.encode(&mut buf).unwrap();
        assert_eq!(buf.as_ref(), &[0x02, 0x10, 0x00, 0x01, 0x50]);
        assert_eq!(tlv.encoded_size(), 5);

        let mut cursor = Cursor::new(buf.as_ref());
        assert_eq!(Tlv::decode(&mut cursor).unwrap(), tlv);
    }

    #[test]
    fn truncated_value_is_rejected() {
        let data: &[u8] = &[0x02, 0x10, 0x00, 0x02, 0x50];
        let mut cursor = Cursor::new(data);
        assert!(matches!(Tlv::decode(&mut cursor), Err(CodecError::TlvError(_))));
    }
}
