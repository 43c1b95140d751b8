use crate::{Cursor, DecodeResult, Protocol};

pub const ICMP_HLEN: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IcmpHeader {
    pub icmp_type: u8,
    pub code: u8,
    pub checksum: u16,
}

impl IcmpHeader {
    pub fn parse(data: &[u8]) -> DecodeResult<Self> {
        let mut cursor = Cursor::new(data, Protocol::Icmp);
        cursor.require(ICMP_HLEN, "shorter than an icmp header")?;
        Ok(IcmpHeader {
            icmp_type: cursor.read_u8()?,
            code: cursor.read_u8()?,
            checksum: cursor.read_u16()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_request() {
        let data = [8, 0, 0xf7, 0xff, 0, 1, 0, 1];
        let icmp = IcmpHeader::parse(&data).unwrap();
        assert_eq!(icmp.icmp_type, 8);
        assert_eq!(icmp.checksum, 0xf7ff);
        assert!(IcmpHeader::parse(&data[..7]).unwrap_err().is_malformed());
    }
}
