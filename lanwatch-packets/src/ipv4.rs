use crate::ethernet::check_padup;
use crate::{Cursor, DecodeError, DecodeResult, Protocol};
use std::net::Ipv4Addr;

pub const IPV4_HLEN: usize = 20;

///
/// A validated IPv4 header. `payload()` spans exactly the bytes the total-length field covers,
/// so any Ethernet padding after the datagram is already cut off.
///
#[derive(Clone, Copy, Debug)]
pub struct Ipv4Header<'a> {
    ihl: u8,
    total_length: u16,
    ttl: u8,
    protocol: u8,
    src_addr: Ipv4Addr,
    dest_addr: Ipv4Addr,
    payload: &'a [u8],
}

impl<'a> Ipv4Header<'a> {
    pub fn parse(data: &'a [u8]) -> DecodeResult<Self> {
        let mut cursor = Cursor::new(data, Protocol::Ipv4);
        cursor.require(IPV4_HLEN, "shorter than an ipv4 header")?;

        let version_ihl = cursor.read_u8()?;
        let version = version_ihl >> 4;
        if version != 4 {
            return Err(DecodeError::no_protocol(Protocol::Ipv4, version));
        }
        let ihl = version_ihl & 0x0f;
        let hlen = ihl as usize * 4;
        if hlen < IPV4_HLEN || hlen > data.len() {
            return Err(DecodeError::malformed(Protocol::Ipv4, "bad header length"));
        }

        cursor.skip(1)?;
        let total_length = cursor.read_u16()?;
        if (total_length as usize) < hlen || !check_padup(data.len(), total_length as usize) {
            return Err(DecodeError::malformed(Protocol::Ipv4, "total length mismatch"));
        }
        // Identification, flags and fragment offset.
        cursor.skip(4)?;
        let ttl = cursor.read_u8()?;
        let protocol = cursor.read_u8()?;
        cursor.skip(2)?;
        let src_addr = Ipv4Addr::from(cursor.read_array::<4>()?);
        let dest_addr = Ipv4Addr::from(cursor.read_array::<4>()?);

        Ok(Ipv4Header {
            ihl,
            total_length,
            ttl,
            protocol,
            src_addr,
            dest_addr,
            payload: &data[hlen..total_length as usize],
        })
    }

    /// Header length in 32-bit words.
    pub fn ihl(&self) -> u8 {
        self.ihl
    }

    pub fn total_length(&self) -> u16 {
        self.total_length
    }

    pub fn ttl(&self) -> u8 {
        self.ttl
    }

    pub fn protocol(&self) -> u8 {
        self.protocol
    }

    pub fn src_addr(&self) -> Ipv4Addr {
        self.src_addr
    }

    pub fn dest_addr(&self) -> Ipv4Addr {
        self.dest_addr
    }

    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }
}
