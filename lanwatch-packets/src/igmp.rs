use crate::{Cursor, DecodeResult, Protocol};
use std::net::Ipv4Addr;

pub const IGMP_HLEN: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IgmpHeader {
    pub igmp_type: u8,
    pub max_resp_code: u8,
    pub checksum: u16,
    pub group: Ipv4Addr,
}

impl IgmpHeader {
    pub fn parse(data: &[u8]) -> DecodeResult<Self> {
        let mut cursor = Cursor::new(data, Protocol::Igmp);
        cursor.require(IGMP_HLEN, "shorter than an igmp header")?;
        Ok(IgmpHeader {
            igmp_type: cursor.read_u8()?,
            max_resp_code: cursor.read_u8()?,
            checksum: cursor.read_u16()?,
            group: Ipv4Addr::from(cursor.read_array::<4>()?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_report() {
        let data = [0x16, 0, 0x09, 0x04, 224, 0, 0, 251];
        let igmp = IgmpHeader::parse(&data).unwrap();
        assert_eq!(igmp.igmp_type, 0x16);
        assert_eq!(igmp.group, Ipv4Addr::new(224, 0, 0, 251));
        assert!(IgmpHeader::parse(&data[..4]).unwrap_err().is_malformed());
    }
}
