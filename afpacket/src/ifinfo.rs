use crate::linux;
use crate::sockets::ifreq_for;
use libc;
use std::{ffi::CStr, io};

/// ARP hardware types we recognize, from linux/if_arp.h.
pub const ARPHRD_ETHER: u16 = 1;
pub const ARPHRD_IEEE1394: u16 = 24;
pub const ARPHRD_LOOPBACK: u16 = 772;
pub const ARPHRD_IEEE80211: u16 = 801;
pub const ARPHRD_IEEE80211_RADIOTAP: u16 = 803;

/// What the kernel reports about one network interface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterfaceInfo {
    pub name: String,
    pub index: i32,
    /// ARP hardware type of the link, one of the `ARPHRD_*` values.
    pub arphrd: u16,
    pub hwaddr: Vec<u8>,
    pub mtu: u32,
    /// `IFF_*` flags.
    pub flags: u32,
}

impl InterfaceInfo {
    /// Queries the named interface. Needs no privileges.
    pub fn query(iface: impl AsRef<CStr>) -> io::Result<InterfaceInfo> {
        let iface = iface.as_ref();
        let fd = ControlSocket::new()?;

        let index = crate::sockets::ifindex_of(fd.0, iface)?;
        let hw = fd.ioctl(iface, linux::SIOCGIFHWADDR)?;
        let mtu = fd.ioctl(iface, linux::SIOCGIFMTU)?;
        let flags = fd.ioctl(iface, linux::SIOCGIFFLAGS)?;

        // Each read is of the arm the matching ioctl filled in.
        let (arphrd, sa_data, mtu, flags) = unsafe {
            (
                hw.ifr_ifru.ifru_hwaddr.sa_family,
                hw.ifr_ifru.ifru_hwaddr.sa_data,
                mtu.ifr_ifru.ifru_mtu,
                flags.ifr_ifru.ifru_flags,
            )
        };
        let hwaddr = sa_data[..hwaddr_len(arphrd)]
            .iter()
            .map(|b| *b as u8)
            .collect();

        Ok(InterfaceInfo {
            name: iface.to_string_lossy().into_owned(),
            index,
            arphrd,
            hwaddr,
            mtu: mtu as u32,
            flags: flags as u16 as u32,
        })
    }

    pub fn is_up(&self) -> bool {
        self.flags & libc::IFF_UP as u32 != 0
    }

    pub fn is_loopback(&self) -> bool {
        self.arphrd == ARPHRD_LOOPBACK
    }
}

/// Hardware address length for a link type. SIOCGIFHWADDR doesn't report it.
pub fn hwaddr_len(arphrd: u16) -> usize {
    match arphrd {
        ARPHRD_IEEE1394 => 8,
        _ => 6,
    }
}

/// A datagram socket used only as a handle for interface ioctls.
pub(crate) struct ControlSocket(libc::c_int);

impl ControlSocket {
    pub(crate) fn new() -> io::Result<Self> {
        // This block is marked as unsafe because it uses FFI. No Rust memory is involved.
        let fd = unsafe { libc::socket(libc::AF_INET, libc::SOCK_DGRAM, 0) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(ControlSocket(fd))
    }

    fn ioctl(&self, iface: &CStr, request: libc::c_ulong) -> io::Result<linux::ifreq> {
        let mut ifr = ifreq_for(iface);
        // This block is marked as unsafe because it uses FFI. The kernel writes only inside the
        // ifreq we own.
        // Resources:
        // man 7 netdevice
        let err = unsafe { libc::ioctl(self.0, request, &mut ifr as *mut linux::ifreq) };
        if err < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(ifr)
    }

    ///
    /// Runs one `SIOCETHTOOL` request. `cmd` is a `#[repr(C)]` ethtool struct whose first field
    /// already holds the command number; the kernel fills in the rest.
    ///
    pub(crate) fn ethtool<T>(&self, iface: &CStr, cmd: &mut T) -> io::Result<()> {
        let mut ifr = ifreq_for(iface);
        ifr.ifr_ifru.ifru_data = cmd as *mut T as *mut libc::c_void;
        // This block is marked as unsafe because it uses FFI. ifru_data points at `cmd`, which
        // outlives the call, and each command writes no more than its own struct.
        // Resources:
        // man 8 ethtool, linux/ethtool.h
        let err = unsafe { libc::ioctl(self.0, linux::SIOCETHTOOL, &mut ifr as *mut linux::ifreq) };
        if err < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl Drop for ControlSocket {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn loopback() {
        let info = InterfaceInfo::query(CString::new("lo").unwrap()).unwrap();
        assert!(info.is_loopback());
        assert!(info.index > 0);
        assert_eq!(info.hwaddr, vec![0; 6]);
        assert!(info.mtu > 0);
    }

    #[test]
    fn missing_interface() {
        assert!(InterfaceInfo::query(CString::new("no-such-if0").unwrap()).is_err());
    }
}
