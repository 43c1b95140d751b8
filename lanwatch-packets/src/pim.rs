use crate::{Cursor, DecodeError, DecodeResult, Protocol};

pub const PIM_HLEN: usize = 4;
pub const PIM_VERSION: u8 = 2;

/// PIM common header (RFC 7761 section 4.9). Version and type share the first octet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PimHeader {
    pub pim_type: u8,
    pub checksum: u16,
}

impl PimHeader {
    pub fn parse(data: &[u8]) -> DecodeResult<Self> {
        let mut cursor = Cursor::new(data, Protocol::Pim);
        cursor.require(PIM_HLEN, "shorter than a pim header")?;
        let version_type = cursor.read_u8()?;
        let version = version_type >> 4;
        if version != PIM_VERSION {
            return Err(DecodeError::no_protocol(Protocol::Pim, version));
        }
        cursor.skip(1)?;
        Ok(PimHeader {
            pim_type: version_type & 0x0f,
            checksum: cursor.read_u16()?,
        })
    }
}
