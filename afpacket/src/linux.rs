#![allow(non_camel_case_types)]

use libc;

// Slot states of a PACKET_TX_RING frame header, from linux/if_packet.h.
/// The slot is free for user space to fill.
pub const TP_STATUS_AVAILABLE: u32 = 0;
/// User space handed the slot to the kernel for transmission.
pub const TP_STATUS_SEND_REQUEST: u32 = 1;
/// The kernel is transmitting the slot.
pub const TP_STATUS_SENDING: u32 = 2;
/// The kernel refused the slot's contents. User space must reset it to `TP_STATUS_AVAILABLE`.
pub const TP_STATUS_WRONG_FORMAT: u32 = 4;
/// Not a kernel value. Marks a slot user space is still filling, so neither side touches it.
pub const TP_STATUS_PREPARING: u32 = !0;

pub(crate) const SIOCGIFFLAGS: libc::c_ulong = 0x8913;
pub(crate) const SIOCGIFMTU: libc::c_ulong = 0x8921;
pub(crate) const SIOCGIFHWADDR: libc::c_ulong = 0x8927;
pub(crate) const SIOCGIFINDEX: libc::c_ulong = 0x8933;
pub(crate) const SIOCETHTOOL: libc::c_ulong = 0x8946;

// ethtool commands, from linux/ethtool.h.
pub(crate) const ETHTOOL_GSET: u32 = 0x01;
pub(crate) const ETHTOOL_GDRVINFO: u32 = 0x03;
pub(crate) const ETHTOOL_GRXCSUM: u32 = 0x14;
pub(crate) const ETHTOOL_GTXCSUM: u32 = 0x16;
pub(crate) const ETHTOOL_GSG: u32 = 0x18;
pub(crate) const ETHTOOL_GTSO: u32 = 0x1e;
pub(crate) const ETHTOOL_GUFO: u32 = 0x21;
pub(crate) const ETHTOOL_GGSO: u32 = 0x23;
pub(crate) const ETHTOOL_GFLAGS: u32 = 0x25;
pub(crate) const ETHTOOL_GGRO: u32 = 0x2b;
pub(crate) const ETH_FLAG_LRO: u32 = 1 << 15;

pub(crate) const SOL_PACKET: libc::c_int = 263;
pub(crate) const PACKET_ADD_MEMBERSHIP: libc::c_int = 1;
pub(crate) const PACKET_DROP_MEMBERSHIP: libc::c_int = 2;
pub(crate) const PACKET_STATISTICS: libc::c_int = 6;
pub(crate) const PACKET_MR_PROMISC: libc::c_ushort = 1;

#[repr(C)]
#[derive(Clone, Copy)]
pub(crate) struct ifmap {
    pub(crate) mem_start: libc::c_ulong,
    pub(crate) mem_end: libc::c_ulong,
    pub(crate) base_addr: libc::c_ushort,
    pub(crate) irq: libc::c_uchar,
    pub(crate) dma: libc::c_uchar,
    pub(crate) port: libc::c_uchar,
}

#[repr(C)]
pub(crate) union ifru {
    pub(crate) ifru_addr: libc::sockaddr,
    pub(crate) ifru_hwaddr: libc::sockaddr,
    pub(crate) ifru_flags: libc::c_short,
    pub(crate) ifru_ivalue: libc::c_int,
    pub(crate) ifru_mtu: libc::c_int,
    pub(crate) ifru_map: ifmap,
    pub(crate) ifru_data: *mut libc::c_void,
}

#[repr(C)]
pub(crate) union ifrn {
    pub(crate) ifrn_name: [libc::c_char; libc::IFNAMSIZ],
}

#[repr(C)]
pub(crate) struct ifreq {
    pub(crate) ifr_ifrn: ifrn,
    pub(crate) ifr_ifru: ifru,
}

#[repr(C)]
pub(crate) struct packet_mreq {
    pub(crate) mr_ifindex: libc::c_int,
    pub(crate) mr_type: libc::c_ushort,
    pub(crate) mr_alen: libc::c_ushort,
    pub(crate) mr_address: [libc::c_uchar; 8],
}

#[repr(C)]
#[derive(Default)]
pub(crate) struct tpacket_stats {
    pub(crate) tp_packets: libc::c_uint,
    pub(crate) tp_drops: libc::c_uint,
}

#[repr(C)]
pub(crate) struct ethtool_drvinfo {
    pub(crate) cmd: u32,
    pub(crate) driver: [u8; 32],
    pub(crate) version: [u8; 32],
    pub(crate) fw_version: [u8; 32],
    pub(crate) bus_info: [u8; 32],
    pub(crate) erom_version: [u8; 32],
    pub(crate) reserved2: [u8; 12],
    pub(crate) n_priv_flags: u32,
    pub(crate) n_stats: u32,
    pub(crate) testinfo_len: u32,
    pub(crate) eedump_len: u32,
    pub(crate) regdump_len: u32,
}

#[repr(C)]
pub(crate) struct ethtool_cmd {
    pub(crate) cmd: u32,
    pub(crate) supported: u32,
    pub(crate) advertising: u32,
    pub(crate) speed: u16,
    pub(crate) duplex: u8,
    pub(crate) port: u8,
    pub(crate) phy_address: u8,
    pub(crate) transceiver: u8,
    pub(crate) autoneg: u8,
    pub(crate) mdio_support: u8,
    pub(crate) maxtxpkt: u32,
    pub(crate) maxrxpkt: u32,
    pub(crate) speed_hi: u16,
    pub(crate) eth_tp_mdix: u8,
    pub(crate) eth_tp_mdix_ctrl: u8,
    pub(crate) lp_advertising: u32,
    pub(crate) reserved: [u32; 2],
}

#[repr(C)]
pub(crate) struct ethtool_value {
    pub(crate) cmd: u32,
    pub(crate) data: u32,
}
