use crate::{Cursor, DecodeError, DecodeResult, Protocol};
use std::net::Ipv6Addr;

pub const IPV6_HLEN: usize = 40;

/// Next-header values that introduce an extension header rather than an upper-layer protocol.
pub const IPV6_EXTENSION_HEADERS: [u8; 9] = [0, 43, 44, 50, 51, 60, 135, 139, 140];

pub fn is_extension_header(next_header: u8) -> bool {
    IPV6_EXTENSION_HEADERS.contains(&next_header)
}

#[derive(Clone, Copy, Debug)]
pub struct Ipv6Header<'a> {
    traffic_class: u8,
    flow_label: u32,
    payload_length: u16,
    next_header: u8,
    hop_limit: u8,
    src_addr: Ipv6Addr,
    dest_addr: Ipv6Addr,
    payload: &'a [u8],
}

impl<'a> Ipv6Header<'a> {
    /// The received length must equal the payload length plus the fixed header, with no padding
    /// allowance.
    pub fn parse(data: &'a [u8]) -> DecodeResult<Self> {
        let mut cursor = Cursor::new(data, Protocol::Ipv6);
        cursor.require(IPV6_HLEN, "shorter than an ipv6 header")?;

        let word = cursor.read_u32()?;
        let version = (word >> 28) as u8;
        if version != 6 {
            return Err(DecodeError::no_protocol(Protocol::Ipv6, version));
        }
        let payload_length = cursor.read_u16()?;
        if data.len() != payload_length as usize + IPV6_HLEN {
            return Err(DecodeError::malformed(Protocol::Ipv6, "payload length mismatch"));
        }
        let next_header = cursor.read_u8()?;
        let hop_limit = cursor.read_u8()?;
        let src_addr = Ipv6Addr::from(cursor.read_array::<16>()?);
        let dest_addr = Ipv6Addr::from(cursor.read_array::<16>()?);

        Ok(Ipv6Header {
            traffic_class: ((word >> 20) & 0xff) as u8,
            flow_label: word & 0x000f_ffff,
            payload_length,
            next_header,
            hop_limit,
            src_addr,
            dest_addr,
            payload: cursor.rest(),
        })
    }

    pub fn traffic_class(&self) -> u8 {
        self.traffic_class
    }

    pub fn flow_label(&self) -> u32 {
        self.flow_label
    }

    pub fn payload_length(&self) -> u16 {
        self.payload_length
    }

    pub fn next_header(&self) -> u8 {
        self.next_header
    }

    pub fn hop_limit(&self) -> u8 {
        self.hop_limit
    }

    pub fn src_addr(&self) -> Ipv6Addr {
        self.src_addr
    }

    pub fn dest_addr(&self) -> Ipv6Addr {
        self.dest_addr
    }

    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }
}
