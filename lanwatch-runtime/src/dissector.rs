use crate::interface::{Interface, RouteLookup, RouteMatch};
use crate::neighbor::{NeighborObserver, NullObserver};
use crate::tx::TxEngine;
use lanwatch_packets::{
    classify, is_extension_header, multicast_name, ArpPacket, DecodeError, DecodeResult,
    EthernetHeader, GreHeader, HwAddr, Icmpv6Message, IcmpHeader, IgmpHeader, Ipv4Header,
    Ipv6Header, L2Class, NbnsPacket, NetbiosName, PimHeader, Protocol, TcpHeader, UdpHeader,
    ETHERTYPE_ARP, ETHERTYPE_IPV4, ETHERTYPE_IPV6, IPPROTO_GRE, IPPROTO_ICMP, IPPROTO_ICMPV6,
    IPPROTO_IGMP, IPPROTO_PIM, IPPROTO_TCP, IPPROTO_UDP, NBNS_PORT,
};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// How far a frame got.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Ok,
    Malformed,
    NoProtocol,
}

/// What the layers of one frame revealed about its sender. Filled top-down as headers validate.
#[derive(Default)]
struct Findings<'a> {
    source: Option<&'a [u8]>,
    destination: Option<&'a [u8]>,
    arp_sender: Option<(&'a [u8], IpAddr)>,
    network_source: Option<IpAddr>,
    netbios_name: Option<NetbiosName>,
    nd_link_addr: Option<&'a [u8]>,
}

struct Probe {
    target_hw: HwAddr,
    target_proto: Ipv4Addr,
    source: Ipv4Addr,
}

///
/// Walks received frames down the protocol stack and accounts for them on one interface.
///
/// Decoding is lock-free. Counters and neighbor updates for a frame happen under a single
/// acquisition of the interface lock afterwards, and any ARP probe the frame calls for is sent
/// once the lock is released.
///
pub struct FrameDissector {
    iface: Arc<Interface>,
    observer: Arc<dyn NeighborObserver>,
    router: Option<Arc<dyn RouteLookup>>,
    tx: Option<Arc<TxEngine>>,
}

impl FrameDissector {
    /// A dissector with no observer, the interface's own route table and no TX.
    pub fn new(iface: Arc<Interface>) -> FrameDissector {
        FrameDissector {
            iface,
            observer: Arc::new(NullObserver),
            router: None,
            tx: None,
        }
    }

    pub fn observer(mut self, observer: Arc<dyn NeighborObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Replaces the interface's route table as the source of routing decisions.
    pub fn router(mut self, router: Arc<dyn RouteLookup>) -> Self {
        self.router = Some(router);
        self
    }

    /// Enables ARP probes through `tx`.
    pub fn tx(mut self, tx: Arc<TxEngine>) -> Self {
        self.tx = Some(tx);
        self
    }

    pub fn interface(&self) -> &Arc<Interface> {
        &self.iface
    }

    pub fn dissect(&self, frame: &[u8]) -> Verdict {
        self.dissect_with_len(frame, frame.len())
    }

    ///
    /// Like `dissect`, for a frame that was `wire_len` bytes long before capture. Only `bytes`
    /// accounting uses `wire_len`.
    ///
    pub fn dissect_with_len(&self, frame: &[u8], wire_len: usize) -> Verdict {
        let mut found = Findings::default();
        let result = self.ethernet(frame, &mut found);
        let verdict = match &result {
            Ok(()) => Verdict::Ok,
            Err(err) if err.is_malformed() => Verdict::Malformed,
            Err(_) => Verdict::NoProtocol,
        };
        if let Err(err) = &result {
            self.log_decode_error(err);
        }

        let probe = {
            let mut state = self.iface.lock();
            state.stats.frames += 1;
            state.stats.bytes += wire_len as u64;
            match verdict {
                Verdict::Ok => {}
                Verdict::Malformed => state.stats.malformed += 1,
                Verdict::NoProtocol => state.stats.noprotocol += 1,
            }
            self.record_neighbors(&mut state.neighbors, &found)
        };

        if let Some(probe) = probe {
            self.send_probe(probe);
        }
        verdict
    }

    /// Books a frame that was too long for the capture buffer and wasn't dissected.
    pub fn count_truncated(&self, wire_len: usize) {
        let mut state = self.iface.lock();
        state.stats.frames += 1;
        state.stats.bytes += wire_len as u64;
        state.stats.truncated += 1;
    }

    fn log_decode_error(&self, err: &DecodeError) {
        match err {
            DecodeError::Malformed { proto, reason } => {
                debug!(iface = %self.iface.name(), proto = %proto, reason, "malformed frame");
            }
            DecodeError::NoProtocol { proto, value } => {
                trace!(iface = %self.iface.name(), proto = %proto, value, "no protocol handler");
            }
        }
    }

    fn ethernet<'a>(&self, frame: &'a [u8], found: &mut Findings<'a>) -> DecodeResult<()> {
        let eth = EthernetHeader::parse(frame)?;
        found.source = Some(eth.source());
        found.destination = Some(eth.destination());
        match eth.ethertype() {
            ETHERTYPE_ARP => self.arp(eth.payload(), found),
            ETHERTYPE_IPV4 => self.ipv4(eth.payload(), found),
            ETHERTYPE_IPV6 => self.ipv6(eth.payload(), found),
            other => Err(DecodeError::no_protocol(Protocol::Ethernet, other)),
        }
    }

    fn arp<'a>(&self, data: &'a [u8], found: &mut Findings<'a>) -> DecodeResult<()> {
        let arp = ArpPacket::parse_padded(data)?;
        let sender = arp.sender_protocol_addr();
        if sender.len() == 4 && arp.protocol_type() == ETHERTYPE_IPV4 {
            let addr = Ipv4Addr::new(sender[0], sender[1], sender[2], sender[3]);
            found.arp_sender = Some((arp.sender_hardware_addr(), IpAddr::V4(addr)));
        }
        Ok(())
    }

    fn ipv4<'a>(&self, data: &'a [u8], found: &mut Findings<'a>) -> DecodeResult<()> {
        let ip = Ipv4Header::parse(data)?;
        found.network_source = Some(IpAddr::V4(ip.src_addr()));
        let payload = ip.payload();
        match ip.protocol() {
            IPPROTO_ICMP => IcmpHeader::parse(payload).map(|_| ()),
            IPPROTO_IGMP => IgmpHeader::parse(payload).map(|_| ()),
            IPPROTO_TCP => TcpHeader::parse(payload).map(|_| ()),
            IPPROTO_UDP => self.udp(payload, found),
            IPPROTO_GRE => GreHeader::parse(payload).map(|_| ()),
            IPPROTO_PIM => PimHeader::parse(payload).map(|_| ()),
            other => Err(DecodeError::no_protocol(Protocol::Ipv4, other)),
        }
    }

    fn ipv6<'a>(&self, data: &'a [u8], found: &mut Findings<'a>) -> DecodeResult<()> {
        let ip = Ipv6Header::parse(data)?;
        found.network_source = Some(IpAddr::V6(ip.src_addr()));
        let payload = ip.payload();
        match ip.next_header() {
            IPPROTO_ICMPV6 => self.icmpv6(payload, found),
            IPPROTO_TCP => TcpHeader::parse(payload).map(|_| ()),
            IPPROTO_UDP => self.udp(payload, found),
            IPPROTO_GRE => GreHeader::parse(payload).map(|_| ()),
            IPPROTO_PIM => PimHeader::parse(payload).map(|_| ()),
            other => {
                if is_extension_header(other) {
                    trace!(iface = %self.iface.name(), next_header = other, "extension headers aren't walked");
                }
                Err(DecodeError::no_protocol(Protocol::Ipv6, other))
            }
        }
    }

    fn udp<'a>(&self, data: &'a [u8], found: &mut Findings<'a>) -> DecodeResult<()> {
        let udp = UdpHeader::parse(data)?;
        if udp.src_port() == NBNS_PORT || udp.dest_port() == NBNS_PORT {
            let nbns = NbnsPacket::parse(udp.payload())?;
            found.netbios_name = nbns.registered_name();
        }
        Ok(())
    }

    fn icmpv6<'a>(&self, data: &'a [u8], found: &mut Findings<'a>) -> DecodeResult<()> {
        if let Icmpv6Message::NeighborDiscovery(nd) = Icmpv6Message::parse(data)? {
            let hwlen = self.iface.hwaddr().len();
            found.nd_link_addr = nd
                .link_addr
                .filter(|addr| addr.len() >= hwlen)
                .map(|addr| &addr[..hwlen]);
        }
        Ok(())
    }

    ///
    /// Applies what a frame showed to the neighbor cache. Runs with the interface lock held and
    /// returns the probe to send, if any, once it is released.
    ///
    fn record_neighbors(
        &self,
        neighbors: &mut crate::neighbor::NeighborCache,
        found: &Findings<'_>,
    ) -> Option<Probe> {
        let name = self.iface.name();
        let observer = &*self.observer;
        let hwaddr = |bytes: &[u8]| HwAddr::from_slice(bytes);

        if let Some(dst) = found.destination.and_then(hwaddr) {
            if dst == *self.iface.bcast() {
                neighbors.observe_named(name, dst, "Broadcast", observer);
            } else if classify(dst.as_bytes()) == L2Class::Multicast {
                match multicast_name(dst.as_bytes()) {
                    Some(mname) => neighbors.observe_named(name, dst, mname, observer),
                    None => neighbors.observe(name, dst, None, observer),
                };
            }
        }

        let mut probe = None;
        if let Some(src) = found.source.and_then(hwaddr) {
            let id = neighbors.observe(name, src, None, observer);
            let nameless = neighbors.get(id).map_or(false, |h| h.name().is_none());
            if let (true, Some(addr)) = (nameless, found.network_source) {
                match self.lookup(addr) {
                    Some(RouteMatch { gateway: None, .. }) => {
                        neighbors.set_name(name, id, &addr.to_string(), observer);
                    }
                    Some(RouteMatch {
                        gateway: Some(gateway),
                        source: Some(source),
                    }) if gateway != addr && classify(src.as_bytes()) == L2Class::Unicast => {
                        probe = self.plan_probe(src, gateway, source);
                    }
                    _ => {}
                }
            }
            if let Some(netbios) = &found.netbios_name {
                neighbors.set_name(name, id, netbios.name(), observer);
            }
        }

        if let Some((sender, IpAddr::V4(addr))) = found.arp_sender {
            if let Some(sender) = hwaddr(sender) {
                neighbors.observe_named(name, sender, &addr.to_string(), observer);
            }
        }

        if let (Some(link), Some(addr)) = (found.nd_link_addr.and_then(hwaddr), found.network_source) {
            neighbors.observe(name, link, Some(addr), observer);
        }
        probe
    }

    fn lookup(&self, addr: IpAddr) -> Option<RouteMatch> {
        match &self.router {
            Some(router) => router.lookup(addr),
            None => self.iface.routes().lookup(addr),
        }
    }

    fn plan_probe(&self, target_hw: HwAddr, gateway: IpAddr, source: IpAddr) -> Option<Probe> {
        match (gateway, source) {
            (IpAddr::V4(target_proto), IpAddr::V4(source)) => Some(Probe {
                target_hw,
                target_proto,
                source,
            }),
            _ => {
                debug!(
                    iface = %self.iface.name(),
                    gateway = %gateway,
                    "neighbor solicitation probes aren't supported, skipping"
                );
                None
            }
        }
    }

    fn send_probe(&self, probe: Probe) {
        let tx = match &self.tx {
            Some(tx) => tx,
            None => return,
        };
        if let Err(err) = tx.send_arp_probe(&probe.target_hw, probe.target_proto, probe.source) {
            warn!(
                iface = %self.iface.name(),
                target = %probe.target_proto,
                error = %err,
                "arp probe not sent"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::{InterfaceConfig, Route4};

    const OWN: [u8; 6] = [0x02, 0x11, 0x22, 0x33, 0x44, 0x55];
    const PEER: [u8; 6] = [0x02, 0xaa, 0xbb, 0xcc, 0xdd, 0xee];

    fn dissector() -> FrameDissector {
        let iface = Interface::new(InterfaceConfig {
            name: "eth0".into(),
            hwaddr: HwAddr::new(OWN),
            ..InterfaceConfig::default()
        })
        .unwrap();
        FrameDissector::new(Arc::new(iface))
    }

    fn frame(dst: &[u8], ethertype: u16, payload: &[u8]) -> Vec<u8> {
        let mut data = dst.to_vec();
        data.extend_from_slice(&PEER);
        data.extend_from_slice(&ethertype.to_be_bytes());
        data.extend_from_slice(payload);
        data
    }

    fn ipv4(protocol: u8, src: [u8; 4], payload: &[u8]) -> Vec<u8> {
        let total = (20 + payload.len()) as u16;
        let mut ip = vec![0x45, 0];
        ip.extend_from_slice(&total.to_be_bytes());
        ip.extend_from_slice(&[0, 0, 0, 0, 64, protocol, 0, 0]);
        ip.extend_from_slice(&src);
        ip.extend_from_slice(&[192, 168, 1, 20]);
        ip.extend_from_slice(payload);
        ip
    }

    #[test]
    fn counts_exactly_one_outcome() {
        let d = dissector();
        assert_eq!(d.dissect(&[0; 10]), Verdict::Malformed);
        assert_eq!(d.dissect(&frame(&OWN, 0x88cc, &[0; 46])), Verdict::NoProtocol);
        let tcp = [0u8; 20];
        let mut tcp = tcp.to_vec();
        tcp[12] = 5 << 4;
        assert_eq!(
            d.dissect(&frame(&OWN, ETHERTYPE_IPV4, &ipv4(IPPROTO_TCP, [10, 0, 0, 1], &tcp))),
            Verdict::Ok
        );

        let stats = d.interface().stats();
        assert_eq!(stats.frames, 3);
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.noprotocol, 1);
        assert_eq!(stats.bytes, 10 + 60 + 54);
    }

    #[test]
    fn unknown_ip_protocol_is_no_protocol() {
        let d = dissector();
        let data = frame(&OWN, ETHERTYPE_IPV4, &ipv4(250, [10, 0, 0, 1], &[0; 8]));
        assert_eq!(d.dissect(&data), Verdict::NoProtocol);
    }

    #[test]
    fn on_link_source_is_named_with_its_address() {
        let d = dissector();
        d.interface().routes_mut().add_route4(Route4 {
            dest: Ipv4Addr::new(192, 168, 1, 0),
            prefix_len: 24,
            gateway: None,
            source: Some(Ipv4Addr::new(192, 168, 1, 20)),
        });
        let icmp = [8, 0, 0, 0, 0, 1, 0, 1];
        d.dissect(&frame(&OWN, ETHERTYPE_IPV4, &ipv4(IPPROTO_ICMP, [192, 168, 1, 7], &icmp)));

        let state = d.interface().lock();
        let id = state.neighbors.find(&HwAddr::new(PEER)).unwrap();
        assert_eq!(state.neighbors.get(id).unwrap().name(), Some("192.168.1.7"));
    }

    #[test]
    fn off_link_source_stays_nameless() {
        let d = dissector();
        let icmp = [8, 0, 0, 0, 0, 1, 0, 1];
        d.dissect(&frame(&OWN, ETHERTYPE_IPV4, &ipv4(IPPROTO_ICMP, [8, 8, 8, 8], &icmp)));
        let state = d.interface().lock();
        let id = state.neighbors.find(&HwAddr::new(PEER)).unwrap();
        assert_eq!(state.neighbors.get(id).unwrap().name(), None);
    }

    #[test]
    fn broadcast_and_multicast_destinations_are_named() {
        let d = dissector();
        d.dissect(&frame(&[0xff; 6], 0x88cc, &[0; 46]));
        d.dissect(&frame(&[0x01, 0x80, 0xc2, 0, 0, 0x0e], 0x88cc, &[0; 46]));

        let state = d.interface().lock();
        let names: Vec<_> = state
            .neighbors
            .iter()
            .map(|h| h.name().map(str::to_string))
            .collect();
        assert_eq!(
            names,
            vec![None, Some("LLDP".to_string()), Some("Broadcast".to_string())]
        );
    }
}
