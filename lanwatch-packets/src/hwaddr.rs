use std::fmt;

/// Longest hardware address we store. Nothing we capture on has more than 64 bits at L2.
pub const MAX_HWADDR_LEN: usize = 8;

/// A link-layer address of up to [`MAX_HWADDR_LEN`] octets.
///
/// The octets live zero-padded in a fixed-width container, so two addresses of the same length
/// compare and hash by value without touching the heap. All addresses seen on one interface share
/// that interface's length.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HwAddr {
    octets: [u8; MAX_HWADDR_LEN],
    len: u8,
}

impl HwAddr {
    /// Returns `None` if `bytes` is longer than [`MAX_HWADDR_LEN`].
    pub fn from_slice(bytes: &[u8]) -> Option<HwAddr> {
        if bytes.len() > MAX_HWADDR_LEN {
            return None;
        }
        let mut octets = [0; MAX_HWADDR_LEN];
        octets[..bytes.len()].copy_from_slice(bytes);
        Some(HwAddr {
            octets,
            len: bytes.len() as u8,
        })
    }

    pub fn new(mac: [u8; 6]) -> HwAddr {
        let mut octets = [0; MAX_HWADDR_LEN];
        octets[..6].copy_from_slice(&mac);
        HwAddr { octets, len: 6 }
    }

    /// The all-ones address of the given length.
    pub fn broadcast(len: usize) -> HwAddr {
        let len = len.min(MAX_HWADDR_LEN);
        let mut octets = [0; MAX_HWADDR_LEN];
        for b in octets[..len].iter_mut() {
            *b = 0xff;
        }
        HwAddr {
            octets,
            len: len as u8,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.octets[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_multicast(&self) -> bool {
        classify(self.as_bytes()) == L2Class::Multicast
    }
}

impl fmt::Display for HwAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, b) in self.as_bytes().iter().enumerate() {
            if idx > 0 {
                f.write_str(":")?;
            }
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl fmt::Debug for HwAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HwAddr({})", self)
    }
}

/// Context-free classification: only looks at the group bit of the first octet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum L2Class {
    Unicast,
    Multicast,
}

/// Classification relative to one interface's own and broadcast addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum L2Category {
    Unicast,
    /// Unicast to the interface's own address.
    Local,
    Multicast,
    /// Multicast that is exactly the interface's broadcast address.
    Broadcast,
}

pub fn classify(addr: &[u8]) -> L2Class {
    match addr.first() {
        Some(b) if b & 0x1 == 0x1 => L2Class::Multicast,
        _ => L2Class::Unicast,
    }
}

/// Never answers `Local` or `Broadcast` without comparing against `own` and `bcast`.
pub fn categorize(addr: &[u8], own: &HwAddr, bcast: &HwAddr) -> L2Category {
    match classify(addr) {
        L2Class::Unicast if addr == own.as_bytes() => L2Category::Local,
        L2Class::Unicast => L2Category::Unicast,
        L2Class::Multicast if addr == bcast.as_bytes() => L2Category::Broadcast,
        L2Class::Multicast => L2Category::Multicast,
    }
}

/// Names for the multicast groups every LAN is full of.
pub fn multicast_name(addr: &[u8]) -> Option<&'static str> {
    match addr {
        [0x01, 0x80, 0xc2, 0x00, 0x00, 0x00] => Some("Spanning Tree (IEEE 802.1d)"),
        [0x01, 0x80, 0xc2, 0x00, 0x00, 0x02] => Some("Slow Protocols (IEEE 802.3ad)"),
        [0x01, 0x80, 0xc2, 0x00, 0x00, 0x0e] => Some("LLDP"),
        [0x01, 0x00, 0x0c, 0xcc, 0xcc, 0xcc] => Some("Cisco CDP/VTP/UDLD"),
        [0x01, 0x00, 0x5e, _, _, _] => Some("IPv4 multicast"),
        [0x33, 0x33, _, _, _, _] => Some("IPv6 multicast"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let addr = HwAddr::new([0xde, 0xad, 0xbe, 0xef, 0x00, 0x01]);
        assert_eq!(addr.to_string(), "de:ad:be:ef:00:01");
        assert_eq!(format!("{:?}", addr), "HwAddr(de:ad:be:ef:00:01)");
    }

    #[test]
    fn from_slice_rejects_oversized() {
        assert!(HwAddr::from_slice(&[0; 9]).is_none());
        let addr = HwAddr::from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        assert_eq!(addr.len(), 8);
        assert_eq!(addr.as_bytes(), &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn equality_is_by_value_and_length() {
        let short = HwAddr::from_slice(&[1, 2, 3]).unwrap();
        let padded = HwAddr::from_slice(&[1, 2, 3, 0]).unwrap();
        assert_ne!(short, padded);
        assert_eq!(short, HwAddr::from_slice(&[1, 2, 3]).unwrap());
    }

    #[test]
    fn categorize_against_interface() {
        let own = HwAddr::new([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        let bcast = HwAddr::broadcast(6);

        assert_eq!(categorize(own.as_bytes(), &own, &bcast), L2Category::Local);
        assert_eq!(
            categorize(&[0x00, 0x11, 0x22, 0x33, 0x44, 0x56], &own, &bcast),
            L2Category::Unicast
        );
        assert_eq!(categorize(bcast.as_bytes(), &own, &bcast), L2Category::Broadcast);
        assert_eq!(
            categorize(&[0x01, 0x00, 0x5e, 0x00, 0x00, 0xfb], &own, &bcast),
            L2Category::Multicast
        );
    }

    #[test]
    fn classify_is_context_free() {
        assert_eq!(classify(&[0xff; 6]), L2Class::Multicast);
        assert_eq!(classify(&[0x02, 0, 0, 0, 0, 1]), L2Class::Unicast);
        assert!(HwAddr::broadcast(6).is_multicast());
    }

    #[test]
    fn multicast_names() {
        assert_eq!(multicast_name(&[0x01, 0x00, 0x5e, 0x7f, 0xff, 0xfa]), Some("IPv4 multicast"));
        assert_eq!(multicast_name(&[0x33, 0x33, 0, 0, 0, 1]), Some("IPv6 multicast"));
        assert_eq!(multicast_name(&[0x01, 0x80, 0xc2, 0, 0, 0x0e]), Some("LLDP"));
        assert_eq!(multicast_name(&[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]), None);
    }
}
