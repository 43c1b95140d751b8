use crate::interface::LinkType;
use lanwatch_packets::{categorize, HwAddr, L2Category, ETHERTYPE_ARP, ETH_ALEN, ETH_HLEN};
use std::convert::TryInto;

/// Where an outbound frame has to go. At least one of the two is always set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Direction {
    /// Into this host's own stack.
    pub local: bool,
    /// Out of the device.
    pub wire: bool,
}

impl Direction {
    pub const LOCAL: Direction = Direction {
        local: true,
        wire: false,
    };
    pub const WIRE: Direction = Direction {
        local: false,
        wire: true,
    };
    pub const BOTH: Direction = Direction {
        local: true,
        wire: true,
    };
}

///
/// Picks the path(s) for a filled frame from its destination hardware address.
///
/// Group-addressed frames are also copies for this host, except ARP, which the kernel answers on
/// its own. Frames too short to carry a destination go out on the wire unexamined.
///
pub fn classify(link_type: LinkType, own: &HwAddr, bcast: &HwAddr, frame: &[u8]) -> Direction {
    if link_type == LinkType::Loopback {
        return Direction::LOCAL;
    }
    if frame.len() < ETH_HLEN {
        return Direction::WIRE;
    }
    match categorize(&frame[..ETH_ALEN], own, bcast) {
        L2Category::Unicast => Direction::WIRE,
        L2Category::Local => Direction::LOCAL,
        L2Category::Multicast | L2Category::Broadcast => {
            let ethertype = u16::from_be_bytes(frame[12..14].try_into().unwrap());
            if ethertype == ETHERTYPE_ARP {
                Direction::WIRE
            } else {
                Direction::BOTH
            }
        }
    }
}
