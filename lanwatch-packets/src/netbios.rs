use crate::{Cursor, DecodeResult, Protocol};
use std::fmt;

pub const NBNS_PORT: u16 = 137;
pub const NBNS_HLEN: usize = 12;

const NBNS_OPCODE_MASK: u16 = 0x7800;
const NBNS_OPCODE_SHIFT: u16 = 11;

/// Encoded NetBIOS names are 16 bytes: 15 of name and one suffix naming the service.
pub const NETBIOS_NAME_LEN: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NbnsOpcode {
    Query,
    Registration,
    Release,
    Wack,
    Refresh,
    Other(u8),
}

impl From<u16> for NbnsOpcode {
    fn from(flags: u16) -> Self {
        match ((flags & NBNS_OPCODE_MASK) >> NBNS_OPCODE_SHIFT) as u8 {
            0 => NbnsOpcode::Query,
            5 => NbnsOpcode::Registration,
            6 => NbnsOpcode::Release,
            7 => NbnsOpcode::Wack,
            8 => NbnsOpcode::Refresh,
            other => NbnsOpcode::Other(other),
        }
    }
}

/// A NetBIOS Name Service packet (RFC 1002 section 4.2).
#[derive(Clone, Copy, Debug)]
pub struct NbnsPacket<'a> {
    pub transaction_id: u16,
    pub flags: u16,
    pub questions: u16,
    pub answers: u16,
    pub authorities: u16,
    pub additionals: u16,
    body: &'a [u8],
}

impl<'a> NbnsPacket<'a> {
    pub fn parse(data: &'a [u8]) -> DecodeResult<Self> {
        let mut cursor = Cursor::new(data, Protocol::NetbiosNs);
        cursor.require(NBNS_HLEN, "shorter than a name service header")?;
        Ok(NbnsPacket {
            transaction_id: cursor.read_u16()?,
            flags: cursor.read_u16()?,
            questions: cursor.read_u16()?,
            answers: cursor.read_u16()?,
            authorities: cursor.read_u16()?,
            additionals: cursor.read_u16()?,
            body: cursor.rest(),
        })
    }

    pub fn is_response(&self) -> bool {
        self.flags & 0x8000 != 0
    }

    pub fn opcode(&self) -> NbnsOpcode {
        NbnsOpcode::from(self.flags)
    }

    /// The name a registration announces. `None` for other opcodes or badly encoded names.
    pub fn registered_name(&self) -> Option<NetbiosName> {
        if self.opcode() != NbnsOpcode::Registration {
            return None;
        }
        first_level_decode(self.body).and_then(|raw| NetbiosName::from_decoded(&raw))
    }
}

///
/// Undoes RFC 1001 First-Level Encoding.
///
/// `enc` starts with a length byte counting the encoded characters, each in `'A'..='P'` and
/// worth one nibble, high nibble first. At least one byte must follow the characters (the next
/// label's length or the terminating root label). Returns `None` for an empty buffer, a length
/// that doesn't fit, a character out of range, an odd number of nibbles, or an empty name.
///
pub fn first_level_decode(enc: &[u8]) -> Option<Vec<u8>> {
    let (&slen, rest) = enc.split_first()?;
    let slen = slen as usize;
    if slen + 2 > enc.len() || slen == 0 || slen % 2 != 0 {
        return None;
    }
    let chars = &rest[..slen];
    let mut decoded = Vec::with_capacity(slen / 2);
    for pair in chars.chunks(2) {
        let hi = nibble(pair[0])?;
        let lo = nibble(pair[1])?;
        decoded.push(hi << 4 | lo);
    }
    Some(decoded)
}

fn nibble(c: u8) -> Option<u8> {
    match c {
        b'A'..=b'P' => Some(c - b'A'),
        _ => None,
    }
}

/// A decoded NetBIOS name, split into the padded name and its suffix byte.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetbiosName {
    name: String,
    suffix: u8,
}

impl NetbiosName {
    pub fn from_decoded(raw: &[u8]) -> Option<NetbiosName> {
        if raw.len() != NETBIOS_NAME_LEN {
            return None;
        }
        let name = String::from_utf8_lossy(&raw[..NETBIOS_NAME_LEN - 1])
            .trim_end_matches(|c| c == ' ' || c == '\0')
            .to_string();
        if name.is_empty() {
            return None;
        }
        Some(NetbiosName {
            name,
            suffix: raw[NETBIOS_NAME_LEN - 1],
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 0x00 for workstations, 0x20 for file servers, and so on.
    pub fn suffix(&self) -> u8 {
        self.suffix
    }
}

impl fmt::Display for NetbiosName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
