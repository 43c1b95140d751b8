use crate::neighbor::{L2Host, Payload};
use crossbeam::channel::{self, Receiver, Sender};
use lanwatch_packets::HwAddr;

///
/// Hooks a caller registers to hear about neighbors. Both are invoked with the interface lock
/// held, so an implementation must not call back into the same interface.
///
pub trait NeighborObserver: Send + Sync {
    /// Called exactly once per hardware address, right after the record is created. Whatever it
    /// returns is stored as the record's payload.
    fn neighbor_added(&self, _iface: &str, _host: &L2Host) -> Option<Payload> {
        None
    }

    /// Called when a nameless record gets its name.
    fn neighbor_named(&self, _iface: &str, _host: &L2Host) {}
}

/// Ignores everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullObserver;

impl NeighborObserver for NullObserver {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NeighborEvent {
    Added {
        iface: String,
        hwaddr: HwAddr,
        name: Option<String>,
    },
    Named {
        iface: String,
        hwaddr: HwAddr,
        name: String,
    },
}

/// Forwards every notification as a [`NeighborEvent`] over a crossbeam channel.
///
/// The channel is always unbounded. Sends happen under the interface lock and must never wait for
/// the reader.
#[derive(Clone, Debug)]
pub struct ChannelObserver {
    events: Sender<NeighborEvent>,
}

impl ChannelObserver {
    /// An observer feeding a new unbounded channel, and the receiving end of it.
    pub fn new() -> (ChannelObserver, Receiver<NeighborEvent>) {
        let (events, receiver) = channel::unbounded();
        (ChannelObserver { events }, receiver)
    }
}

impl NeighborObserver for ChannelObserver {
    fn neighbor_added(&self, iface: &str, host: &L2Host) -> Option<Payload> {
        // A gone receiver just means nobody is listening anymore.
        let _ = self.events.send(NeighborEvent::Added {
            iface: iface.to_string(),
            hwaddr: *host.hwaddr(),
            name: host.name().map(str::to_string),
        });
        None
    }

    fn neighbor_named(&self, iface: &str, host: &L2Host) {
        if let Some(name) = host.name() {
            let _ = self.events.send(NeighborEvent::Named {
                iface: iface.to_string(),
                hwaddr: *host.hwaddr(),
                name: name.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neighbor::NeighborCache;

    #[test]
    fn channel_observer_reports_add_then_name() {
        let (observer, events) = ChannelObserver::new();
        let mut cache = NeighborCache::new();
        let addr = HwAddr::new([0x02, 0, 0, 0, 0, 7]);

        let id = cache.observe("eth0", addr, None, &observer);
        cache.observe("eth0", addr, None, &observer);
        assert!(cache.set_name("eth0", id, "printer", &observer));

        assert_eq!(
            events.try_recv().unwrap(),
            NeighborEvent::Added {
                iface: "eth0".into(),
                hwaddr: addr,
                name: None
            }
        );
        assert_eq!(
            events.try_recv().unwrap(),
            NeighborEvent::Named {
                iface: "eth0".into(),
                hwaddr: addr,
                name: "printer".into()
            }
        );
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn slow_reader_never_blocks_the_cache() {
        let (observer, events) = ChannelObserver::new();
        let mut cache = NeighborCache::new();
        for n in 0..5000u32 {
            let b = n.to_be_bytes();
            cache.observe("eth0", HwAddr::new([0x02, 0, b[0], b[1], b[2], b[3]]), None, &observer);
        }
        assert_eq!(cache.len(), 5000);
        assert_eq!(events.try_iter().count(), 5000);
    }

    #[test]
    fn dropped_receiver_is_harmless() {
        let (observer, events) = ChannelObserver::new();
        drop(events);
        let mut cache = NeighborCache::new();
        cache.observe("eth0", HwAddr::new([0x02, 0, 0, 0, 0, 8]), None, &observer);
        assert_eq!(cache.len(), 1);
    }
}
