use crate::error::{Error, Result};
use crate::neighbor::NeighborCache;
use crate::tx::TxRing;
use lanwatch_packets::{HwAddr, ETH_HLEN};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::info;

mod routes;
pub use self::routes::*;

mod settings;
pub use self::settings::*;

mod stats;
pub use self::stats::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkType {
    Ethernet,
    /// Loopback-like devices, which don't take frames through a TX ring.
    Loopback,
    /// Any other ARP hardware type.
    Other(u16),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RingGeometry {
    pub slot_count: usize,
    pub slot_size: usize,
}

impl Default for RingGeometry {
    fn default() -> Self {
        RingGeometry {
            slot_count: 32,
            slot_size: 2048,
        }
    }
}

/// Everything discovery knows about an interface before it is handed to the core.
#[derive(Clone, Debug)]
pub struct InterfaceConfig {
    pub name: String,
    pub index: i32,
    pub link_type: LinkType,
    pub hwaddr: HwAddr,
    /// Defaults to all-ones of the hardware address length.
    pub bcast: Option<HwAddr>,
    pub mtu: u32,
    pub flags: u32,
    /// `None` leaves the interface without TX. Ignored for loopback links.
    pub ring: Option<RingGeometry>,
}

impl Default for InterfaceConfig {
    fn default() -> Self {
        InterfaceConfig {
            name: String::new(),
            index: 0,
            link_type: LinkType::Ethernet,
            hwaddr: HwAddr::new([0; 6]),
            bcast: None,
            mtu: 1500,
            flags: 0,
            ring: Some(RingGeometry::default()),
        }
    }
}

#[cfg(target_os = "linux")]
impl InterfaceConfig {
    /// Builds a configuration from a kernel interface query.
    pub fn from_info(info: &afpacket::InterfaceInfo) -> Result<InterfaceConfig> {
        let hwaddr = HwAddr::from_slice(&info.hwaddr).ok_or_else(|| {
            Error::Config(format!(
                "{}: hardware address of {} bytes",
                info.name,
                info.hwaddr.len()
            ))
        })?;
        let link_type = match info.arphrd {
            afpacket::ARPHRD_ETHER => LinkType::Ethernet,
            afpacket::ARPHRD_LOOPBACK => LinkType::Loopback,
            other => LinkType::Other(other),
        };
        Ok(InterfaceConfig {
            name: info.name.clone(),
            index: info.index,
            link_type,
            hwaddr,
            bcast: None,
            mtu: info.mtu,
            flags: info.flags,
            ring: Some(RingGeometry::default()),
        })
    }
}

/// Mutable per-interface state. Only reachable through [`Interface::lock`].
pub struct InterfaceState {
    pub stats: Stats,
    pub neighbors: NeighborCache,
    pub ring: Option<TxRing>,
    pub settings: InterfaceSettings,
    pub driver: DriverInfo,
    pub offload: OffloadFlags,
}

///
/// One capture and transmit endpoint.
///
/// Addresses and MTU are fixed at construction. Counters, the neighbor cache and the TX ring sit
/// behind a single mutex, so RX accounting and TX slot handling from different threads serialize
/// on it. Routes have their own lock since they are read on every frame but rarely written.
///
pub struct Interface {
    name: String,
    index: i32,
    link_type: LinkType,
    hwaddr: HwAddr,
    bcast: HwAddr,
    mtu: u32,
    flags: u32,
    running: AtomicBool,
    routes: RwLock<RouteTable>,
    state: Mutex<InterfaceState>,
}

impl Interface {
    pub fn new(cfg: InterfaceConfig) -> Result<Interface> {
        let bcast = cfg
            .bcast
            .unwrap_or_else(|| HwAddr::broadcast(cfg.hwaddr.len()));
        if bcast.len() != cfg.hwaddr.len() {
            return Err(Error::Config(format!(
                "{}: broadcast address is {} bytes, hardware address is {}",
                cfg.name,
                bcast.len(),
                cfg.hwaddr.len()
            )));
        }
        if cfg.mtu == 0 {
            return Err(Error::Config(format!("{}: mtu of zero", cfg.name)));
        }

        let ring = match (cfg.link_type, cfg.ring) {
            (LinkType::Loopback, _) | (_, None) => None,
            (_, Some(geometry)) => {
                if geometry.slot_count == 0 {
                    return Err(Error::Config(format!("{}: tx ring has no slots", cfg.name)));
                }
                if geometry.slot_size < ETH_HLEN {
                    return Err(Error::Config(format!(
                        "{}: tx slot of {} bytes cannot hold an ethernet header",
                        cfg.name, geometry.slot_size
                    )));
                }
                Some(TxRing::new(geometry))
            }
        };

        Ok(Interface {
            name: cfg.name,
            index: cfg.index,
            link_type: cfg.link_type,
            hwaddr: cfg.hwaddr,
            bcast,
            mtu: cfg.mtu,
            flags: cfg.flags,
            running: AtomicBool::new(true),
            routes: RwLock::new(RouteTable::new()),
            state: Mutex::new(InterfaceState {
                stats: Stats::default(),
                neighbors: NeighborCache::new(),
                ring,
                settings: InterfaceSettings::default(),
                driver: DriverInfo::default(),
                offload: OffloadFlags::empty(),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> i32 {
        self.index
    }

    pub fn link_type(&self) -> LinkType {
        self.link_type
    }

    pub fn hwaddr(&self) -> &HwAddr {
        &self.hwaddr
    }

    pub fn bcast(&self) -> &HwAddr {
        &self.bcast
    }

    pub fn mtu(&self) -> u32 {
        self.mtu
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }

    ///
    /// Takes the interface lock. A holder that panicked can't have left the counters or the
    /// neighbor cache half-updated, so a poisoned lock is simply taken over.
    ///
    pub fn lock(&self) -> MutexGuard<'_, InterfaceState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn stats(&self) -> Stats {
        self.lock().stats
    }

    pub fn routes(&self) -> RwLockReadGuard<'_, RouteTable> {
        self.routes
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn routes_mut(&self) -> RwLockWriteGuard<'_, RouteTable> {
        self.routes
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    ///
    /// Asks the driver for link settings, identification and offloads, and stores whatever it
    /// answers. Links without ethtool support keep their defaults.
    ///
    #[cfg(target_os = "linux")]
    pub fn query_capabilities(&self) {
        let name = match std::ffi::CString::new(self.name.as_str()) {
            Ok(name) => name,
            Err(_) => return,
        };
        let link = afpacket::link_settings(&name);
        let driver = afpacket::driver_details(&name);
        let offloads = afpacket::offloads(&name);

        let mut state = self.lock();
        match link {
            Ok(link) => state.settings = InterfaceSettings::from(&link),
            Err(err) => tracing::debug!(iface = %self.name, error = %err, "no link settings"),
        }
        match driver {
            Ok(driver) => state.driver = DriverInfo::from(&driver),
            Err(err) => tracing::debug!(iface = %self.name, error = %err, "no driver details"),
        }
        match offloads {
            Ok(offloads) => state.offload = OffloadFlags::from(&offloads),
            Err(err) => tracing::debug!(iface = %self.name, error = %err, "no offload flags"),
        }
    }

    /// Link settings, driver and offloads on one line.
    pub fn link_summary(&self) -> String {
        let state = self.lock();
        format!(
            "{}, {}, offloads: {}",
            state.settings, state.driver, state.offload
        )
    }

    /// Refuses new transmits and ends capture loops. Frames already acquired can still finish.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!(iface = %self.name, "interface stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stops the interface and releases every neighbor record. Returns how many there were.
    pub fn teardown(&self) -> usize {
        self.stop();
        let released = self.lock().neighbors.clear();
        info!(iface = %self.name, released, "interface torn down");
        released
    }
}

impl Drop for Interface {
    fn drop(&mut self) {
        let state = self
            .state
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.neighbors.clear();
    }
}

impl fmt::Debug for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interface")
            .field("name", &self.name)
            .field("index", &self.index)
            .field("link_type", &self.link_type)
            .field("hwaddr", &self.hwaddr)
            .field("mtu", &self.mtu)
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neighbor::NullObserver;

    fn config() -> InterfaceConfig {
        InterfaceConfig {
            name: "eth0".into(),
            index: 2,
            hwaddr: HwAddr::new([0x02, 0x11, 0x22, 0x33, 0x44, 0x55]),
            ring: Some(RingGeometry {
                slot_count: 4,
                slot_size: 256,
            }),
            ..InterfaceConfig::default()
        }
    }

    #[test]
    fn defaults_broadcast_to_all_ones() {
        let iface = Interface::new(config()).unwrap();
        assert_eq!(*iface.bcast(), HwAddr::broadcast(6));
        assert_eq!(iface.lock().ring.as_ref().map(|r| r.capacity()), Some(4));
        assert!(iface.is_running());
    }

    #[test]
    fn rejects_inconsistent_config() {
        let mut cfg = config();
        cfg.bcast = Some(HwAddr::broadcast(8));
        assert!(matches!(Interface::new(cfg), Err(Error::Config(_))));

        let mut cfg = config();
        cfg.mtu = 0;
        assert!(matches!(Interface::new(cfg), Err(Error::Config(_))));

        let mut cfg = config();
        cfg.ring = Some(RingGeometry {
            slot_count: 0,
            slot_size: 2048,
        });
        assert!(matches!(Interface::new(cfg), Err(Error::Config(_))));
    }

    #[test]
    fn loopback_has_no_ring() {
        let mut cfg = config();
        cfg.link_type = LinkType::Loopback;
        let iface = Interface::new(cfg).unwrap();
        assert!(iface.lock().ring.is_none());
    }

    #[test]
    fn teardown_releases_neighbors() {
        let iface = Interface::new(config()).unwrap();
        {
            let mut state = iface.lock();
            for last in 0..3 {
                state.neighbors.observe(
                    "eth0",
                    HwAddr::new([0x02, 0, 0, 0, 0, last]),
                    None,
                    &NullObserver,
                );
            }
        }
        assert_eq!(iface.teardown(), 3);
        assert!(!iface.is_running());
        assert_eq!(iface.teardown(), 0);
    }

    #[test]
    fn link_summary_reflects_capabilities() {
        let iface = Interface::new(config()).unwrap();
        assert_eq!(iface.link_summary(), "unknown, unknown driver, offloads: none");
        {
            let mut state = iface.lock();
            state.settings = InterfaceSettings::Ethtool {
                speed_mbps: 1000,
                duplex: Duplex::Full,
                autoneg: true,
            };
            state.driver = DriverInfo::new("e1000e", "3.2.6-k", "N/A", "0000:00:19.0");
            state.offload = OffloadFlags::RX_CSUM | OffloadFlags::GRO;
        }
        assert_eq!(
            iface.link_summary(),
            "1000Mb/s Full duplex (autoneg), e1000e 3.2.6-k on 0000:00:19.0, offloads: rx-csum gro"
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn query_of_missing_link_keeps_defaults() {
        let mut cfg = config();
        cfg.name = "no-such-if0".into();
        let iface = Interface::new(cfg).unwrap();
        iface.query_capabilities();
        let state = iface.lock();
        assert_eq!(state.settings, InterfaceSettings::Invalid);
        assert_eq!(state.driver, DriverInfo::default());
        assert_eq!(state.offload, OffloadFlags::empty());
    }

    #[test]
    fn poisoned_lock_is_recovered() {
        use std::sync::Arc;
        let iface = Arc::new(Interface::new(config()).unwrap());
        let clone = iface.clone();
        let _ = std::thread::spawn(move || {
            let mut state = clone.lock();
            state.stats.frames += 1;
            panic!("holder died");
        })
        .join();
        assert_eq!(iface.stats().frames, 1);
    }
}
