use std::error::Error;
use std::fmt;

pub const ETHERTYPE_IPV4: u16 = 0x0800;
pub const ETHERTYPE_ARP: u16 = 0x0806;
pub const ETHERTYPE_VLAN: u16 = 0x8100;
pub const ETHERTYPE_IPV6: u16 = 0x86DD;

/// Values below this in the ethertype position are 802.3 lengths, not protocol IDs.
pub const ETHERTYPE_MIN: u16 = 0x0600;

pub const IPPROTO_ICMP: u8 = 1;
pub const IPPROTO_IGMP: u8 = 2;
pub const IPPROTO_TCP: u8 = 6;
pub const IPPROTO_UDP: u8 = 17;
pub const IPPROTO_GRE: u8 = 47;
pub const IPPROTO_ICMPV6: u8 = 58;
pub const IPPROTO_PIM: u8 = 103;

/// The layer a decode outcome is attributed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Protocol {
    Ethernet,
    Arp,
    Ipv4,
    Ipv6,
    Tcp,
    Udp,
    Icmp,
    Igmp,
    Icmpv6,
    NeighborDiscovery,
    Gre,
    Pim,
    NetbiosNs,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Protocol::Ethernet => "ethernet",
            Protocol::Arp => "arp",
            Protocol::Ipv4 => "ipv4",
            Protocol::Ipv6 => "ipv6",
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Icmp => "icmp",
            Protocol::Igmp => "igmp",
            Protocol::Icmpv6 => "icmpv6",
            Protocol::NeighborDiscovery => "nd",
            Protocol::Gre => "gre",
            Protocol::Pim => "pim",
            Protocol::NetbiosNs => "netbios-ns",
        };
        f.write_str(name)
    }
}

/// Why a frame stopped being dissected.
///
/// `Malformed` means the header contradicts itself or the received length. `NoProtocol` means
/// the header is well formed but names a protocol, message type, or option we don't handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeError {
    Malformed {
        proto: Protocol,
        reason: &'static str,
    },
    NoProtocol {
        proto: Protocol,
        value: u32,
    },
}

impl DecodeError {
    pub fn malformed(proto: Protocol, reason: &'static str) -> Self {
        DecodeError::Malformed { proto, reason }
    }

    pub fn no_protocol(proto: Protocol, value: impl Into<u32>) -> Self {
        DecodeError::NoProtocol {
            proto,
            value: value.into(),
        }
    }

    pub fn proto(&self) -> Protocol {
        match self {
            DecodeError::Malformed { proto, .. } | DecodeError::NoProtocol { proto, .. } => *proto,
        }
    }

    pub fn is_malformed(&self) -> bool {
        match self {
            DecodeError::Malformed { .. } => true,
            DecodeError::NoProtocol { .. } => false,
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Malformed { proto, reason } => write!(f, "malformed {}: {}", proto, reason),
            DecodeError::NoProtocol { proto, value } => {
                write!(f, "no {} handler for {:#x}", proto, value)
            }
        }
    }
}

impl Error for DecodeError {}

pub type DecodeResult<T> = Result<T, DecodeError>;

/// Failure to compose a frame into a caller-supplied buffer. Nothing is written on failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildError {
    TooSmall { need: usize, have: usize },
    AddressLength { expected: usize, got: usize },
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::TooSmall { need, have } => {
                write!(f, "buffer too small: need {} bytes, have {}", need, have)
            }
            BuildError::AddressLength { expected, got } => {
                write!(f, "address length {} where {} was expected", got, expected)
            }
        }
    }
}

impl Error for BuildError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_display() {
        let err = DecodeError::malformed(Protocol::Arp, "length mismatch");
        assert_eq!(err.to_string(), "malformed arp: length mismatch");
        assert!(err.is_malformed());

        let err = DecodeError::no_protocol(Protocol::Ipv4, 250u8);
        assert_eq!(err.to_string(), "no ipv4 handler for 0xfa");
        assert_eq!(err.proto(), Protocol::Ipv4);
        assert!(!err.is_malformed());
    }
}
