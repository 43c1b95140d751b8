use crate::{Cursor, DecodeError, DecodeResult, Protocol};

pub const GRE_HLEN: usize = 4;

// Bits of the leading 16-bit word, after conversion from network order (RFC 1701, RFC 2637).
const GRE_CSUM_PRESENT: u16 = 1 << 15;
const GRE_ROUTING_PRESENT: u16 = 1 << 14;
const GRE_KEY_PRESENT: u16 = 1 << 13;
const GRE_SEQ_PRESENT: u16 = 1 << 12;
const GRE_STRICT_ROUTE: u16 = 1 << 11;
const GRE_RECURSION_SHIFT: u16 = 8;
const GRE_RECURSION_MASK: u16 = 0x7;
const GRE_ACK_PRESENT: u16 = 1 << 7;
const GRE_VERSION_MASK: u16 = 0x7;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GreVersion {
    Normal = 0,
    Pptp = 1,
}

///
/// A GRE header whose optional fields are known to be present in the received bytes.
///
/// The encapsulated payload is not dissected.
///
#[derive(Clone, Copy, Debug)]
pub struct GreHeader<'a> {
    flags: u16,
    version: GreVersion,
    protocol: u16,
    payload: &'a [u8],
}

impl<'a> GreHeader<'a> {
    pub fn parse(data: &'a [u8]) -> DecodeResult<Self> {
        let mut cursor = Cursor::new(data, Protocol::Gre);
        cursor.require(GRE_HLEN, "shorter than a gre header")?;
        let flags = cursor.read_u16()?;
        let protocol = cursor.read_u16()?;

        let mut optional = 0;
        // Checksum and routing share one checksum+offset word.
        if flags & (GRE_CSUM_PRESENT | GRE_ROUTING_PRESENT) != 0 {
            optional += 4;
        }
        if flags & GRE_KEY_PRESENT != 0 {
            optional += 4;
        }
        if flags & GRE_SEQ_PRESENT != 0 {
            optional += 4;
        }
        cursor.take_or(optional, "optional fields truncated")?;

        let version = match flags & GRE_VERSION_MASK {
            0 => GreVersion::Normal,
            1 => GreVersion::Pptp,
            _ => return Err(DecodeError::malformed(Protocol::Gre, "bad version")),
        };

        Ok(GreHeader {
            flags,
            version,
            protocol,
            payload: cursor.rest(),
        })
    }

    pub fn checksum_present(&self) -> bool {
        self.flags & GRE_CSUM_PRESENT != 0
    }

    pub fn routing_present(&self) -> bool {
        self.flags & GRE_ROUTING_PRESENT != 0
    }

    pub fn key_present(&self) -> bool {
        self.flags & GRE_KEY_PRESENT != 0
    }

    pub fn sequence_present(&self) -> bool {
        self.flags & GRE_SEQ_PRESENT != 0
    }

    pub fn strict_source_route(&self) -> bool {
        self.flags & GRE_STRICT_ROUTE != 0
    }

    pub fn recursion_control(&self) -> u8 {
        ((self.flags >> GRE_RECURSION_SHIFT) & GRE_RECURSION_MASK) as u8
    }

    pub fn ack_present(&self) -> bool {
        self.flags & GRE_ACK_PRESENT != 0
    }

    pub fn version(&self) -> GreVersion {
        self.version
    }

    /// Ethertype of the encapsulated payload.
    pub fn protocol(&self) -> u16 {
        self.protocol
    }

    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }
}
