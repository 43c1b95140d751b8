#![cfg(target_os = "linux")]
mod ethtool;
mod ifinfo;
mod linux;
mod raw;
mod sockets;

pub use ethtool::{
    driver_details, link_settings, offloads, DriverDetails, LinkSettings, Offloads, DUPLEX_FULL,
    DUPLEX_HALF, DUPLEX_UNKNOWN,
};
pub use ifinfo::{
    hwaddr_len, InterfaceInfo, ARPHRD_ETHER, ARPHRD_IEEE1394, ARPHRD_IEEE80211,
    ARPHRD_IEEE80211_RADIOTAP, ARPHRD_LOOPBACK,
};
pub use linux::{
    TP_STATUS_AVAILABLE, TP_STATUS_PREPARING, TP_STATUS_SENDING, TP_STATUS_SEND_REQUEST,
    TP_STATUS_WRONG_FORMAT,
};
pub use raw::RawIpSocket;
pub use sockets::{BoundSocket, RecvInfo, Socket, SocketStats};
