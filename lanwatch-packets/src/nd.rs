use crate::{Cursor, DecodeError, DecodeResult, Protocol};
use std::net::Ipv6Addr;

// Option types from RFC 4861 section 4.6.
pub const ND_OPT_SOURCE_LINKADDR: u8 = 1;
pub const ND_OPT_TARGET_LINKADDR: u8 = 2;
pub const ND_OPT_PREFIX_INFORMATION: u8 = 3;
pub const ND_OPT_REDIRECTED_HEADER: u8 = 4;
pub const ND_OPT_MTU: u8 = 5;

/// Option lengths are counted in units of this many octets.
pub const ND_OPT_UNIT: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NdKind {
    RouterSolicitation,
    RouterAdvertisement,
    NeighborSolicitation,
    NeighborAdvertisement,
    Redirect,
}

impl NdKind {
    pub fn from_icmp_type(icmp_type: u8) -> Option<NdKind> {
        match icmp_type {
            133 => Some(NdKind::RouterSolicitation),
            134 => Some(NdKind::RouterAdvertisement),
            135 => Some(NdKind::NeighborSolicitation),
            136 => Some(NdKind::NeighborAdvertisement),
            137 => Some(NdKind::Redirect),
            _ => None,
        }
    }

    /// Bytes between the ICMPv6 header and the first option.
    pub fn prefix_len(self) -> usize {
        match self {
            NdKind::RouterSolicitation => 4,
            NdKind::NeighborSolicitation => 20,
            NdKind::RouterAdvertisement => 12,
            NdKind::NeighborAdvertisement => 20,
            NdKind::Redirect => 36,
        }
    }

    pub fn allowed_options(self) -> &'static [u8] {
        match self {
            NdKind::RouterSolicitation | NdKind::NeighborSolicitation => &[ND_OPT_SOURCE_LINKADDR],
            NdKind::RouterAdvertisement => &[
                ND_OPT_SOURCE_LINKADDR,
                ND_OPT_PREFIX_INFORMATION,
                ND_OPT_MTU,
            ],
            NdKind::NeighborAdvertisement => &[ND_OPT_TARGET_LINKADDR],
            NdKind::Redirect => &[ND_OPT_TARGET_LINKADDR, ND_OPT_REDIRECTED_HEADER],
        }
    }

    fn has_target(self) -> bool {
        match self {
            NdKind::NeighborSolicitation | NdKind::NeighborAdvertisement | NdKind::Redirect => true,
            NdKind::RouterSolicitation | NdKind::RouterAdvertisement => false,
        }
    }
}

/// What a successful walk of an ND message yields.
#[derive(Clone, Copy, Debug)]
pub struct NdMessage<'a> {
    pub kind: NdKind,
    /// The target address of solicitations, advertisements and redirects.
    pub target: Option<Ipv6Addr>,
    /// Data of the last source or target link-layer address option, zero padding included.
    pub link_addr: Option<&'a [u8]>,
    pub options: usize,
}

impl<'a> NdMessage<'a> {
    ///
    /// Walks one ND message. `body` is everything after the 4-byte ICMPv6 header.
    ///
    /// Every iteration consumes at least one option unit or fails, so the walk terminates. A
    /// zero-length option is rejected before its type is looked at, and the first option type the
    /// message kind doesn't allow ends the walk as unsupported without reading what follows.
    ///
    pub fn parse(kind: NdKind, body: &'a [u8]) -> DecodeResult<Self> {
        let mut cursor = Cursor::new(body, Protocol::NeighborDiscovery);
        let prefix = cursor.take_or(kind.prefix_len(), "shorter than the message prefix")?;
        let target = if kind.has_target() {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(&prefix[4..20]);
            Some(Ipv6Addr::from(octets))
        } else {
            None
        };

        let mut link_addr = None;
        let mut options = 0;
        while !cursor.is_empty() {
            let header = cursor.peek(2).map_err(|_| {
                DecodeError::malformed(Protocol::NeighborDiscovery, "option header truncated")
            })?;
            let (opt_type, opt_len) = (header[0], header[1] as usize);
            if opt_len == 0 {
                return Err(DecodeError::malformed(
                    Protocol::NeighborDiscovery,
                    "zero-length option",
                ));
            }
            let option = cursor.take_or(opt_len * ND_OPT_UNIT, "option data truncated")?;
            if !kind.allowed_options().contains(&opt_type) {
                return Err(DecodeError::no_protocol(
                    Protocol::NeighborDiscovery,
                    opt_type,
                ));
            }
            if opt_type == ND_OPT_SOURCE_LINKADDR || opt_type == ND_OPT_TARGET_LINKADDR {
                link_addr = Some(&option[2..]);
            }
            options += 1;
        }

        Ok(NdMessage {
            kind,
            target,
            link_addr,
            options,
        })
    }
}
