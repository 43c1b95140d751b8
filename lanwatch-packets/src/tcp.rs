use crate::{Cursor, DecodeError, DecodeResult, Protocol};

pub const TCP_HLEN: usize = 20;

/// The fixed part of a TCP header. Payload semantics are not interpreted.
#[derive(Clone, Copy, Debug)]
pub struct TcpHeader<'a> {
    src_port: u16,
    dest_port: u16,
    sequence_number: u32,
    acknowledgment_number: u32,
    data_offset: u8,
    control_bits: u16,
    payload: &'a [u8],
}

impl<'a> TcpHeader<'a> {
    pub fn parse(data: &'a [u8]) -> DecodeResult<Self> {
        let mut cursor = Cursor::new(data, Protocol::Tcp);
        cursor.require(TCP_HLEN, "shorter than a tcp header")?;
        let src_port = cursor.read_u16()?;
        let dest_port = cursor.read_u16()?;
        let sequence_number = cursor.read_u32()?;
        let acknowledgment_number = cursor.read_u32()?;
        let offset_and_flags = cursor.read_u16()?;

        let data_offset = (offset_and_flags >> 12) as u8;
        let hlen = data_offset as usize * 4;
        if hlen < TCP_HLEN || hlen > data.len() {
            return Err(DecodeError::malformed(Protocol::Tcp, "bad data offset"));
        }

        Ok(TcpHeader {
            src_port,
            dest_port,
            sequence_number,
            acknowledgment_number,
            data_offset,
            control_bits: offset_and_flags & 0x01ff,
            payload: &data[hlen..],
        })
    }

    pub fn src_port(&self) -> u16 {
        self.src_port
    }

    pub fn dest_port(&self) -> u16 {
        self.dest_port
    }

    pub fn sequence_number(&self) -> u32 {
        self.sequence_number
    }

    pub fn acknowledgment_number(&self) -> u32 {
        self.acknowledgment_number
    }

    /// Header length in 32-bit words.
    pub fn data_offset(&self) -> u8 {
        self.data_offset
    }

    pub fn control_bits(&self) -> u16 {
        self.control_bits
    }

    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }
}
