//! Stateless validators for the link, network and transport headers lanwatch understands.
//!
//! Every handler takes a borrowed byte span and either returns a parsed view of its header
//! (pointing at the payload for the next layer) or a [`DecodeError`] saying whether the bytes
//! were self-contradictory (`Malformed`) or simply not something we know (`NoProtocol`).
//! Nothing here keeps state or logs.

mod types;
pub use self::types::*;

mod cursor;
pub use self::cursor::*;

mod hwaddr;
pub use self::hwaddr::*;

mod ethernet;
pub use self::ethernet::*;

mod arp;
pub use self::arp::*;

mod ipv4;
pub use self::ipv4::*;

mod ipv6;
pub use self::ipv6::*;

mod tcp;
pub use self::tcp::*;

mod udp;
pub use self::udp::*;

mod icmp;
pub use self::icmp::*;

mod igmp;
pub use self::igmp::*;

mod icmpv6;
pub use self::icmpv6::*;

mod nd;
pub use self::nd::*;

mod gre;
pub use self::gre::*;

mod pim;
pub use self::pim::*;

mod netbios;
pub use self::netbios::*;
