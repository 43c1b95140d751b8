//! Capability data about an interface. Filled in by whoever queries the driver; the core only
//! stores and hands it back.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Duplex {
    Half,
    Full,
    Unknown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WirelessMode {
    Auto,
    AdHoc,
    Managed,
    Master,
    Repeater,
    Secondary,
    Monitor,
    Mesh,
    Unknown,
}

/// Link settings, in whichever shape the query that produced them returns.
#[derive(Clone, Debug, PartialEq)]
pub enum InterfaceSettings {
    /// Nothing has been queried, or the query failed.
    Invalid,
    Ethtool {
        speed_mbps: u32,
        duplex: Duplex,
        autoneg: bool,
    },
    WirelessExt {
        bitrate: u64,
        mode: WirelessMode,
        freq: u32,
    },
    Nl80211 {
        bitrate: u64,
        mode: WirelessMode,
        freq: u32,
    },
}

impl Default for InterfaceSettings {
    fn default() -> Self {
        InterfaceSettings::Invalid
    }
}

impl InterfaceSettings {
    pub fn is_wireless(&self) -> bool {
        match self {
            InterfaceSettings::WirelessExt { .. } | InterfaceSettings::Nl80211 { .. } => true,
            InterfaceSettings::Invalid | InterfaceSettings::Ethtool { .. } => false,
        }
    }
}

impl fmt::Display for InterfaceSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterfaceSettings::Invalid => f.write_str("unknown"),
            InterfaceSettings::Ethtool {
                speed_mbps,
                duplex,
                autoneg,
            } => {
                match speed_mbps {
                    0 => f.write_str("unknown speed")?,
                    mbps => write!(f, "{}Mb/s", mbps)?,
                }
                write!(
                    f,
                    " {:?} duplex{}",
                    duplex,
                    if *autoneg { " (autoneg)" } else { "" }
                )
            }
            InterfaceSettings::WirelessExt {
                bitrate,
                mode,
                freq,
            }
            | InterfaceSettings::Nl80211 {
                bitrate,
                mode,
                freq,
            } => write!(f, "{:?} {}b/s at {}MHz", mode, bitrate, freq),
        }
    }
}

/// Driver identification. Drivers report missing fields as "N/A", which we store as empty.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DriverInfo {
    pub driver: String,
    pub version: String,
    pub firmware: String,
    pub bus: String,
}

impl DriverInfo {
    pub fn new(driver: &str, version: &str, firmware: &str, bus: &str) -> Self {
        fn field(s: &str) -> String {
            let s = s.trim();
            if s == "N/A" {
                String::new()
            } else {
                s.to_string()
            }
        }
        DriverInfo {
            driver: field(driver),
            version: field(version),
            firmware: field(firmware),
            bus: field(bus),
        }
    }
}

impl fmt::Display for DriverInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.driver.is_empty() {
            return f.write_str("unknown driver");
        }
        f.write_str(&self.driver)?;
        if !self.version.is_empty() {
            write!(f, " {}", self.version)?;
        }
        if !self.firmware.is_empty() {
            write!(f, " fw {}", self.firmware)?;
        }
        if !self.bus.is_empty() {
            write!(f, " on {}", self.bus)?;
        }
        Ok(())
    }
}

#[cfg(target_os = "linux")]
impl From<&afpacket::DriverDetails> for DriverInfo {
    fn from(details: &afpacket::DriverDetails) -> Self {
        DriverInfo::new(
            &details.driver,
            &details.version,
            &details.firmware,
            &details.bus,
        )
    }
}

#[cfg(target_os = "linux")]
impl From<&afpacket::LinkSettings> for InterfaceSettings {
    fn from(link: &afpacket::LinkSettings) -> Self {
        InterfaceSettings::Ethtool {
            speed_mbps: link.speed_mbps.unwrap_or(0),
            duplex: match link.duplex {
                afpacket::DUPLEX_HALF => Duplex::Half,
                afpacket::DUPLEX_FULL => Duplex::Full,
                _ => Duplex::Unknown,
            },
            autoneg: link.autoneg,
        }
    }
}

/// Offloads the driver has enabled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct OffloadFlags(u32);

impl OffloadFlags {
    pub const RX_CSUM: OffloadFlags = OffloadFlags(1 << 0);
    pub const TX_CSUM: OffloadFlags = OffloadFlags(1 << 1);
    pub const SCATTER_GATHER: OffloadFlags = OffloadFlags(1 << 2);
    pub const TSO: OffloadFlags = OffloadFlags(1 << 3);
    pub const UFO: OffloadFlags = OffloadFlags(1 << 4);
    pub const GSO: OffloadFlags = OffloadFlags(1 << 5);
    pub const GRO: OffloadFlags = OffloadFlags(1 << 6);
    pub const LRO: OffloadFlags = OffloadFlags(1 << 7);

    pub fn empty() -> Self {
        OffloadFlags(0)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: OffloadFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: OffloadFlags) {
        self.0 |= other.0;
    }
}

const OFFLOAD_NAMES: [(OffloadFlags, &str); 8] = [
    (OffloadFlags::RX_CSUM, "rx-csum"),
    (OffloadFlags::TX_CSUM, "tx-csum"),
    (OffloadFlags::SCATTER_GATHER, "sg"),
    (OffloadFlags::TSO, "tso"),
    (OffloadFlags::UFO, "ufo"),
    (OffloadFlags::GSO, "gso"),
    (OffloadFlags::GRO, "gro"),
    (OffloadFlags::LRO, "lro"),
];

impl fmt::Display for OffloadFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = OFFLOAD_NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .peekable();
        if names.peek().is_none() {
            return f.write_str("none");
        }
        for (idx, name) in names.enumerate() {
            if idx > 0 {
                f.write_str(" ")?;
            }
            f.write_str(name)?;
        }
        Ok(())
    }
}

#[cfg(target_os = "linux")]
impl From<&afpacket::Offloads> for OffloadFlags {
    fn from(offloads: &afpacket::Offloads) -> Self {
        let mut flags = OffloadFlags::empty();
        for (on, flag) in &[
            (offloads.rx_csum, OffloadFlags::RX_CSUM),
            (offloads.tx_csum, OffloadFlags::TX_CSUM),
            (offloads.scatter_gather, OffloadFlags::SCATTER_GATHER),
            (offloads.tso, OffloadFlags::TSO),
            (offloads.ufo, OffloadFlags::UFO),
            (offloads.gso, OffloadFlags::GSO),
            (offloads.gro, OffloadFlags::GRO),
            (offloads.lro, OffloadFlags::LRO),
        ] {
            if *on {
                flags.insert(*flag);
            }
        }
        flags
    }
}

impl std::ops::BitOr for OffloadFlags {
    type Output = OffloadFlags;

    fn bitor(self, rhs: OffloadFlags) -> OffloadFlags {
        OffloadFlags(self.0 | rhs.0)
    }
}
