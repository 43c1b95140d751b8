use lanwatch_packets::{classify, HwAddr, L2Class};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;

mod observer;
pub use self::observer::*;

/// Caller-owned data attached to a neighbor record by [`NeighborObserver::neighbor_added`].
pub type Payload = Box<dyn Any + Send>;

/// Stable handle to a record. Valid until the owning cache is cleared.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NeighborId(usize);

/// One hardware address seen on an interface.
pub struct L2Host {
    hwaddr: HwAddr,
    name: Option<String>,
    payload: Option<Payload>,
}

impl L2Host {
    pub fn hwaddr(&self) -> &HwAddr {
        &self.hwaddr
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.payload.as_ref().and_then(|p| p.downcast_ref())
    }
}

impl fmt::Debug for L2Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("L2Host")
            .field("hwaddr", &self.hwaddr)
            .field("name", &self.name)
            .field("payload", &self.payload.is_some())
            .finish()
    }
}

struct Node {
    host: L2Host,
    prev: Option<usize>,
    next: Option<usize>,
}

///
/// The neighbors of one interface, most recently seen first.
///
/// Records live in an arena and are threaded on a doubly-linked recency list of arena indices, so
/// re-observing an address is a hash lookup plus an O(1) splice. Nothing is ever evicted: records
/// are only released in bulk by `clear`, when the interface goes away.
///
#[derive(Default)]
pub struct NeighborCache {
    nodes: Vec<Node>,
    index: HashMap<HwAddr, usize>,
    head: Option<usize>,
}

impl NeighborCache {
    pub fn new() -> Self {
        NeighborCache::default()
    }

    ///
    /// Records a sighting of `hwaddr` and moves it to the front.
    ///
    /// A new record is named after `addr` when one is given, and `observer` hears about it exactly
    /// once. Sightings of a known address only reorder.
    ///
    pub fn observe(
        &mut self,
        iface: &str,
        hwaddr: HwAddr,
        addr: Option<IpAddr>,
        observer: &dyn NeighborObserver,
    ) -> NeighborId {
        self.observe_with(iface, hwaddr, addr.map(|a| a.to_string()), observer)
    }

    /// Like `observe`, with a fixed name for the address. Known but nameless records get the name too.
    pub fn observe_named(
        &mut self,
        iface: &str,
        hwaddr: HwAddr,
        name: &str,
        observer: &dyn NeighborObserver,
    ) -> NeighborId {
        let known = self.index.contains_key(&hwaddr);
        let id = self.observe_with(iface, hwaddr, Some(name.to_string()), observer);
        if known {
            self.set_name(iface, id, name, observer);
        }
        id
    }

    fn observe_with(
        &mut self,
        iface: &str,
        hwaddr: HwAddr,
        name: Option<String>,
        observer: &dyn NeighborObserver,
    ) -> NeighborId {
        if let Some(&idx) = self.index.get(&hwaddr) {
            self.move_to_front(idx);
            return NeighborId(idx);
        }

        let idx = self.nodes.len();
        self.nodes.push(Node {
            host: L2Host {
                hwaddr,
                name,
                payload: None,
            },
            prev: None,
            next: None,
        });
        self.index.insert(hwaddr, idx);
        self.link_front(idx);

        let payload = observer.neighbor_added(iface, &self.nodes[idx].host);
        self.nodes[idx].host.payload = payload;
        NeighborId(idx)
    }

    ///
    /// Names a record unless it already has a name. Returns true, after telling `observer`, if the
    /// name was taken.
    ///
    pub fn set_name(
        &mut self,
        iface: &str,
        id: NeighborId,
        name: &str,
        observer: &dyn NeighborObserver,
    ) -> bool {
        let host = match self.nodes.get_mut(id.0) {
            Some(node) => &mut node.host,
            None => return false,
        };
        if host.name.is_some() {
            return false;
        }
        host.name = Some(name.to_string());
        observer.neighbor_named(iface, host);
        true
    }

    pub fn get(&self, id: NeighborId) -> Option<&L2Host> {
        self.nodes.get(id.0).map(|n| &n.host)
    }

    pub fn find(&self, hwaddr: &HwAddr) -> Option<NeighborId> {
        self.index.get(hwaddr).map(|idx| NeighborId(*idx))
    }

    /// Front to back, most recently seen first.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            cache: self,
            next: self.head,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Releases every record, names and payloads included, and returns how many there were.
    pub fn clear(&mut self) -> usize {
        let count = self.nodes.len();
        self.nodes.clear();
        self.index.clear();
        self.head = None;
        count
    }

    ///
    /// Dumps the cache as `<neighbors>` with one `<ieee802>` element per record, in recency order.
    ///
    pub fn write_xml(&self, bcast: &HwAddr, out: &mut dyn fmt::Write) -> fmt::Result {
        out.write_str("<neighbors>")?;
        for host in self.iter() {
            if host.hwaddr == *bcast {
                out.write_str("<ieee802 broadcast/>")?;
                continue;
            }
            match classify(host.hwaddr.as_bytes()) {
                L2Class::Multicast => write!(out, "<ieee802 mcast=\"{}\"", host.hwaddr)?,
                L2Class::Unicast => write!(out, "<ieee802 addr=\"{}\"", host.hwaddr)?,
            }
            if let Some(name) = host.name() {
                out.write_str(" name=\"")?;
                write_escaped(name, out)?;
                out.write_str("\"")?;
            }
            out.write_str("/>")?;
        }
        out.write_str("</neighbors>")
    }

    fn link_front(&mut self, idx: usize) {
        self.nodes[idx].prev = None;
        self.nodes[idx].next = self.head;
        if let Some(old) = self.head {
            self.nodes[old].prev = Some(idx);
        }
        self.head = Some(idx);
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }
        let (prev, next) = (self.nodes[idx].prev, self.nodes[idx].next);
        if let Some(p) = prev {
            self.nodes[p].next = next;
        }
        if let Some(n) = next {
            self.nodes[n].prev = prev;
        }
        self.link_front(idx);
    }
}

impl fmt::Debug for NeighborCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

fn write_escaped(s: &str, out: &mut dyn fmt::Write) -> fmt::Result {
    for c in s.chars() {
        match c {
            '&' => out.write_str("&amp;")?,
            '<' => out.write_str("&lt;")?,
            '>' => out.write_str("&gt;")?,
            '"' => out.write_str("&quot;")?,
            c => out.write_char(c)?,
        }
    }
    Ok(())
}

pub struct Iter<'a> {
    cache: &'a NeighborCache,
    next: Option<usize>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a L2Host;

    fn next(&mut self) -> Option<&'a L2Host> {
        let node = &self.cache.nodes[self.next?];
        self.next = node.next;
        Some(&node.host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn mac(last: u8) -> HwAddr {
        HwAddr::new([0x02, 0, 0, 0, 0, last])
    }

    fn order(cache: &NeighborCache) -> Vec<HwAddr> {
        cache.iter().map(|h| *h.hwaddr()).collect()
    }

    #[derive(Default)]
    struct Counting {
        added: AtomicUsize,
        named: AtomicUsize,
    }

    impl NeighborObserver for Counting {
        fn neighbor_added(&self, _iface: &str, host: &L2Host) -> Option<Payload> {
            self.added.fetch_add(1, Ordering::SeqCst);
            Some(Box::new(host.hwaddr().as_bytes()[5] as u32))
        }

        fn neighbor_named(&self, _iface: &str, _host: &L2Host) {
            self.named.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn recency_order() {
        let (a, b, c) = (mac(0xa), mac(0xb), mac(0xc));
        let mut cache = NeighborCache::new();
        for addr in &[a, b, a, c] {
            cache.observe("eth0", *addr, None, &NullObserver);
        }
        assert_eq!(order(&cache), vec![c, a, b]);
        assert_eq!(cache.len(), 3);

        cache.observe("eth0", b, None, &NullObserver);
        assert_eq!(order(&cache), vec![b, c, a]);
        cache.observe("eth0", a, None, &NullObserver);
        assert_eq!(order(&cache), vec![a, b, c]);
    }

    #[test]
    fn added_fires_once_and_payload_sticks() {
        let observer = Counting::default();
        let mut cache = NeighborCache::new();
        let addr: IpAddr = "192.168.1.9".parse().unwrap();

        let id = cache.observe("eth0", mac(9), Some(addr), &observer);
        cache.observe("eth0", mac(9), None, &observer);
        cache.observe("eth0", mac(9), Some("10.0.0.1".parse().unwrap()), &observer);

        assert_eq!(observer.added.load(Ordering::SeqCst), 1);
        let host = cache.get(id).unwrap();
        assert_eq!(host.name(), Some("192.168.1.9"));
        assert_eq!(host.payload::<u32>(), Some(&9));
        assert_eq!(host.payload::<String>(), None);
    }

    #[test]
    fn first_name_wins() {
        let observer = Counting::default();
        let mut cache = NeighborCache::new();
        let id = cache.observe("eth0", mac(1), None, &observer);

        assert!(cache.get(id).unwrap().name().is_none());
        assert!(cache.set_name("eth0", id, "nas", &observer));
        assert!(!cache.set_name("eth0", id, "10.0.0.3", &observer));
        assert_eq!(cache.get(id).unwrap().name(), Some("nas"));
        assert_eq!(observer.named.load(Ordering::SeqCst), 1);

        let named = cache.observe_named("eth0", mac(2), "LLDP", &observer);
        assert_eq!(cache.get(named).unwrap().name(), Some("LLDP"));
        // Created with its name, so no separate naming event.
        assert_eq!(observer.named.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clear_releases_everything() {
        let mut cache = NeighborCache::new();
        for last in 0..5 {
            cache.observe("eth0", mac(last), None, &NullObserver);
        }
        assert_eq!(cache.clear(), 5);
        assert!(cache.is_empty());
        assert_eq!(cache.iter().count(), 0);
        assert!(cache.find(&mac(1)).is_none());
    }

    #[test]
    fn xml_dump() {
        let mut cache = NeighborCache::new();
        let bcast = HwAddr::broadcast(6);
        cache.observe("eth0", mac(1), Some("10.0.0.1".parse().unwrap()), &NullObserver);
        cache.observe_named(
            "eth0",
            HwAddr::new([0x01, 0x00, 0x5e, 0, 0, 0xfb]),
            "IPv4 multicast",
            &NullObserver,
        );
        cache.observe_named("eth0", bcast, "Broadcast", &NullObserver);

        let mut xml = String::new();
        cache.write_xml(&bcast, &mut xml).unwrap();
        assert_eq!(
            xml,
            "<neighbors><ieee802 broadcast/>\
             <ieee802 mcast=\"01:00:5e:00:00:fb\" name=\"IPv4 multicast\"/>\
             <ieee802 addr=\"02:00:00:00:00:01\" name=\"10.0.0.1\"/></neighbors>"
        );
    }

    #[test]
    fn random_sightings_never_duplicate() {
        let mut rng = rand::thread_rng();
        let mut cache = NeighborCache::new();
        let mut last = None;
        for _ in 0..2000 {
            let addr = mac(rng.gen_range(0..64));
            cache.observe("eth0", addr, None, &NullObserver);
            last = Some(addr);
        }
        let seen = order(&cache);
        let mut unique = seen.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), seen.len());
        assert_eq!(seen.len(), cache.len());
        assert_eq!(seen.first().copied(), last);
    }
}
