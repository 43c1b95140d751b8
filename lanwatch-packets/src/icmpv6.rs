use crate::{Cursor, DecodeError, DecodeResult, NdKind, NdMessage, Protocol};

pub const ICMPV6_HLEN: usize = 4;

pub const ICMPV6_MLD2_REPORT: u8 = 143;

#[derive(Clone, Copy, Debug)]
pub enum Icmpv6Message<'a> {
    NeighborDiscovery(NdMessage<'a>),
    /// Errors, echo and multicast listener messages. Only the header is checked.
    Other { icmp_type: u8, code: u8 },
}

impl<'a> Icmpv6Message<'a> {
    pub fn parse(data: &'a [u8]) -> DecodeResult<Self> {
        let mut cursor = Cursor::new(data, Protocol::Icmpv6);
        cursor.require(ICMPV6_HLEN, "shorter than an icmpv6 header")?;
        let icmp_type = cursor.read_u8()?;
        let code = cursor.read_u8()?;
        cursor.skip(2)?;

        if let Some(kind) = NdKind::from_icmp_type(icmp_type) {
            return NdMessage::parse(kind, cursor.rest()).map(Icmpv6Message::NeighborDiscovery);
        }
        match icmp_type {
            1..=4 | 128..=132 | ICMPV6_MLD2_REPORT => Ok(Icmpv6Message::Other { icmp_type, code }),
            other => Err(DecodeError::no_protocol(Protocol::Icmpv6, other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_request() {
        match Icmpv6Message::parse(&[128, 0, 0x12, 0x34, 0, 1, 0, 1]).unwrap() {
            Icmpv6Message::Other { icmp_type, code } => {
                assert_eq!(icmp_type, 128);
                assert_eq!(code, 0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn router_solicitation() {
        let msg = Icmpv6Message::parse(&[133, 0, 0, 0, 0, 0, 0, 0]).unwrap();
        match msg {
            Icmpv6Message::NeighborDiscovery(nd) => assert_eq!(nd.kind, NdKind::RouterSolicitation),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn failures() {
        assert!(Icmpv6Message::parse(&[128, 0, 0]).unwrap_err().is_malformed());
        assert_eq!(
            Icmpv6Message::parse(&[200, 0, 0, 0]).unwrap_err(),
            DecodeError::no_protocol(Protocol::Icmpv6, 200u8)
        );
        // ND errors are attributed to ND, not ICMPv6.
        let err = Icmpv6Message::parse(&[135, 0, 0, 0, 0, 0]).unwrap_err();
        assert_eq!(err.proto(), Protocol::NeighborDiscovery);
    }
}
