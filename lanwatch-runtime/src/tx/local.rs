use crate::error::TxError;
use crate::tx::LocalTransmit;
use lanwatch_packets::{
    EthernetHeader, Ipv4Header, Ipv6Header, UdpHeader, ETHERTYPE_IPV4, ETHERTYPE_IPV6,
    IPPROTO_UDP,
};
use std::io;
use std::net::{IpAddr, SocketAddr, UdpSocket};

///
/// What a self-destined frame turns into once the link layer is stripped.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocalPacket<'a> {
    /// A UDP datagram, handed over through an ordinary UDP socket.
    Udp {
        destination: SocketAddr,
        payload: &'a [u8],
    },
    /// Any other IP packet, header included.
    Ip {
        destination: IpAddr,
        packet: &'a [u8],
    },
}

impl<'a> LocalPacket<'a> {
    /// Reads the destination out of the already-built headers of `frame`.
    pub fn from_frame(frame: &'a [u8]) -> Result<LocalPacket<'a>, TxError> {
        let unsupported = |_| TxError::Unsupported("local delivery of a frame we can't decode");
        let eth = EthernetHeader::parse(frame).map_err(unsupported)?;
        match eth.ethertype() {
            ETHERTYPE_IPV4 => {
                let ip = Ipv4Header::parse(eth.payload()).map_err(unsupported)?;
                let destination = IpAddr::V4(ip.dest_addr());
                if ip.protocol() == IPPROTO_UDP {
                    let udp = UdpHeader::parse(ip.payload()).map_err(unsupported)?;
                    return Ok(LocalPacket::Udp {
                        destination: SocketAddr::new(destination, udp.dest_port()),
                        payload: udp.payload(),
                    });
                }
                let packet = &eth.payload()[..ip.total_length() as usize];
                Ok(LocalPacket::Ip {
                    destination,
                    packet,
                })
            }
            ETHERTYPE_IPV6 => {
                let ip = Ipv6Header::parse(eth.payload()).map_err(unsupported)?;
                let destination = IpAddr::V6(ip.dest_addr());
                if ip.next_header() == IPPROTO_UDP {
                    let udp = UdpHeader::parse(ip.payload()).map_err(unsupported)?;
                    return Ok(LocalPacket::Udp {
                        destination: SocketAddr::new(destination, udp.dest_port()),
                        payload: udp.payload(),
                    });
                }
                Ok(LocalPacket::Ip {
                    destination,
                    packet: eth.payload(),
                })
            }
            _ => Err(TxError::Unsupported("local delivery of non-IP frames")),
        }
    }
}

///
/// The host's own sockets, one per protocol family, used to inject self-destined packets.
///
/// UDP goes through plain datagram sockets, which need no privileges. Everything else needs raw
/// IP sockets, which are only opened when the process is allowed to.
///
pub struct LocalSockets {
    udp4: UdpSocket,
    udp6: Option<UdpSocket>,
    #[cfg(target_os = "linux")]
    raw4: Option<afpacket::RawIpSocket>,
    #[cfg(target_os = "linux")]
    raw6: Option<afpacket::RawIpSocket>,
}

impl LocalSockets {
    pub fn new() -> io::Result<LocalSockets> {
        Ok(LocalSockets {
            udp4: UdpSocket::bind("0.0.0.0:0")?,
            udp6: UdpSocket::bind("[::]:0").ok(),
            #[cfg(target_os = "linux")]
            raw4: afpacket::RawIpSocket::new_v4().ok(),
            #[cfg(target_os = "linux")]
            raw6: afpacket::RawIpSocket::new_v6().ok(),
        })
    }

    fn missing(what: &str) -> io::Error {
        io::Error::new(io::ErrorKind::Other, format!("no {} socket for local delivery", what))
    }

    #[cfg(target_os = "linux")]
    fn send_raw(&self, packet: &[u8], destination: IpAddr) -> io::Result<usize> {
        let socket = match destination {
            IpAddr::V4(_) => self.raw4.as_ref().ok_or_else(|| Self::missing("raw IPv4"))?,
            IpAddr::V6(_) => self.raw6.as_ref().ok_or_else(|| Self::missing("raw IPv6"))?,
        };
        socket.send_to(packet, destination)
    }

    #[cfg(not(target_os = "linux"))]
    fn send_raw(&self, _packet: &[u8], _destination: IpAddr) -> io::Result<usize> {
        Err(Self::missing("raw IP"))
    }
}

impl LocalTransmit for LocalSockets {
    fn deliver(&self, packet: LocalPacket<'_>) -> io::Result<usize> {
        match packet {
            LocalPacket::Udp {
                destination,
                payload,
            } => {
                let socket = match destination {
                    SocketAddr::V4(_) => &self.udp4,
                    SocketAddr::V6(_) => self.udp6.as_ref().ok_or_else(|| Self::missing("UDP/IPv6"))?,
                };
                socket.send_to(payload, destination)
            }
            LocalPacket::Ip {
                destination,
                packet,
            } => self.send_raw(packet, destination),
        }
    }
}
