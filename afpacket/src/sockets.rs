#![deny(missing_docs)]

use crate::linux;
use libc;
use std::{
    ffi::CStr,
    io,
    mem::{self, MaybeUninit},
    time::Duration,
};

/// Result of one `recv` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecvInfo {
    /// Length of the frame on the wire.
    pub len: usize,
    /// Bytes of it actually written into the buffer. Less than `len` if the frame was truncated.
    pub captured: usize,
}

impl RecvInfo {
    /// True if the buffer was too small for the whole frame.
    pub fn is_truncated(&self) -> bool {
        self.captured < self.len
    }
}

/// Kernel-side counters of a bound socket, reset by every read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SocketStats {
    /// Frames delivered to the socket since the last read.
    pub packets: u64,
    /// Frames the kernel dropped for lack of buffer space since the last read.
    pub drops: u64,
}

/// An `AF_PACKET` socket that is not yet attached to an interface. Options that only apply before
/// `bind`, like blocking mode, are set here.
pub struct Socket {
    fd: libc::c_int,
}

/// An `AF_PACKET` socket attached to one interface. Frames can be captured from and injected into
/// it concurrently through a shared reference.
pub struct BoundSocket {
    fd: libc::c_int,
    send_addr: libc::sockaddr_ll,
}

/// Fills in the name field of an `ifreq`, truncating names that don't fit.
pub(crate) fn ifreq_for(iface: &CStr) -> linux::ifreq {
    // An all-zero ifreq is a valid value of every union arm.
    let mut ifr: linux::ifreq = unsafe { MaybeUninit::zeroed().assume_init() };
    let name = iface.to_bytes();
    let len = name.len().min(libc::IFNAMSIZ - 1);
    // Reading from a union field is unsafe, but the ifrn union has a single arm.
    unsafe {
        for (dst, src) in ifr.ifr_ifrn.ifrn_name.iter_mut().zip(&name[..len]) {
            *dst = *src as libc::c_char;
        }
    }
    ifr
}

/// Looks up the kernel index of the named interface through `fd`.
pub(crate) fn ifindex_of(fd: libc::c_int, iface: &CStr) -> io::Result<libc::c_int> {
    let mut ifr = ifreq_for(iface);
    // This block is marked as unsafe because it uses FFI. The kernel writes only inside the
    // ifreq we own, and we only read the arm SIOCGIFINDEX fills in.
    // Resources:
    // man 7 netdevice
    unsafe {
        let err = libc::ioctl(fd, linux::SIOCGIFINDEX, &mut ifr as *mut linux::ifreq);
        if err < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(ifr.ifr_ifru.ifru_ivalue)
    }
}

impl Socket {
    /// Opens a raw packet socket that receives every ethertype.
    pub fn new() -> io::Result<Self> {
        // This block is marked as unsafe because it uses FFI. socket(2) touches no Rust-owned
        // memory, and a negative descriptor is turned into an Err before a Socket exists.
        let fd = unsafe {
            // Resources:
            // man 7 packet
            let fd = libc::socket(
                libc::AF_PACKET,
                libc::SOCK_RAW,
                (libc::ETH_P_ALL as u16).to_be() as libc::c_int,
            );
            if fd < 0 {
                return Err(io::Error::last_os_error());
            }
            fd
        };
        Ok(Self { fd })
    }

    /// Attaches the socket to the named interface. Consumes `self`, since pre-bind options can no
    /// longer change afterwards.
    pub fn bind(self, iface: impl AsRef<CStr>) -> io::Result<BoundSocket> {
        let ifindex = ifindex_of(self.fd, iface.as_ref())?;
        // This block is marked as unsafe because it uses FFI. sockaddr_ll is plain old data, so
        // zeroing it is sound, and bind only reads the size we pass.
        let send_addr = unsafe {
            let mut ll: libc::sockaddr_ll = MaybeUninit::zeroed().assume_init();
            ll.sll_family = libc::AF_PACKET as libc::c_ushort;
            ll.sll_protocol = (libc::ETH_P_ALL as u16).to_be();
            ll.sll_ifindex = ifindex;
            // Resources:
            // man 7 packet regarding sockaddr_ll
            let err = libc::bind(
                self.fd,
                &ll as *const _ as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            );
            if err < 0 {
                return Err(io::Error::last_os_error());
            }
            ll
        };
        let fd = self.fd;
        // The file descriptor now belongs to the BoundSocket, so `self` must not close it.
        mem::forget(self);
        Ok(BoundSocket { fd, send_addr })
    }

    /// Switches `O_NONBLOCK` on or off.
    pub fn set_nonblocking(&mut self, nonblocking: bool) -> io::Result<()> {
        set_nonblocking(self.fd, nonblocking)
    }

    /// Whether `O_NONBLOCK` is set on the descriptor.
    pub fn is_nonblocking(&self) -> io::Result<bool> {
        // This block is marked as unsafe because it uses FFI. fcntl(F_GETFL) borrows no memory.
        let flags = unsafe {
            let flags = libc::fcntl(self.fd, libc::F_GETFL);
            if flags < 0 {
                return Err(io::Error::last_os_error());
            }
            flags
        };
        Ok(flags & libc::O_NONBLOCK == libc::O_NONBLOCK)
    }

    /// Sets how long a blocking `recv` waits before failing with `WouldBlock`. `None` waits
    /// forever.
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        let tv = match timeout {
            Some(d) => libc::timeval {
                tv_sec: d.as_secs() as libc::time_t,
                tv_usec: d.subsec_micros() as libc::suseconds_t,
            },
            None => libc::timeval {
                tv_sec: 0,
                tv_usec: 0,
            },
        };
        // This block is marked as unsafe because it uses FFI. setsockopt only reads the timeval
        // we own, for the length we pass.
        // Resources:
        // man 7 socket regarding SO_RCVTIMEO
        unsafe {
            let err = libc::setsockopt(
                self.fd,
                libc::SOL_SOCKET,
                libc::SO_RCVTIMEO,
                &tv as *const _ as *const libc::c_void,
                mem::size_of::<libc::timeval>() as libc::socklen_t,
            );
            if err < 0 {
                return Err(io::Error::last_os_error());
            }
        }
        Ok(())
    }
}

fn set_nonblocking(fd: libc::c_int, nonblocking: bool) -> io::Result<()> {
    // This block is marked as unsafe because it uses FFI, however, we assume this code to be
    // safe because we handle fcntl's failures properly. Additionally, we do not borrow any
    // Rust-owned memory.
    // Resources:
    // man 2 fcntl
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        if flags < 0 {
            return Err(io::Error::last_os_error());
        }
        let new_flags = if nonblocking {
            flags | libc::O_NONBLOCK
        } else {
            flags & (!libc::O_NONBLOCK)
        };
        if libc::fcntl(fd, libc::F_SETFL, new_flags) < 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

impl BoundSocket {
    /// The kernel index of the interface this socket is bound to.
    pub fn ifindex(&self) -> i32 {
        self.send_addr.sll_ifindex
    }

    /// Sends a frame to the NIC.
    pub fn send(&self, frame: &[u8]) -> io::Result<usize> {
        // This block is marked as unsafe because it uses FFI. We believe this code to be safe,
        // because it safely borrows the Rust-owned frame and passes the length of the frame to the
        // libc function, so it should not exhibit any C-side undefined behaviour.
        unsafe {
            let bytes = libc::sendto(
                self.fd,
                frame.as_ptr() as *const _,
                frame.len(),
                0,
                &self.send_addr as *const _ as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            );
            if bytes < 0 {
                Err(io::Error::last_os_error())
            } else {
                Ok(bytes as usize)
            }
        }
    }

    /// Receives a frame from the NIC. Frames longer than `frame` are truncated, and the returned
    /// `RecvInfo` says so.
    pub fn recv(&self, frame: &mut [u8]) -> io::Result<RecvInfo> {
        // Note comment in `send` call. MSG_TRUNC makes the kernel report the full frame length
        // while still writing at most `frame.len()` bytes.
        let bytes = unsafe {
            libc::recvfrom(
                self.fd,
                frame.as_mut_ptr() as *mut _,
                frame.len(),
                libc::MSG_TRUNC,
                std::ptr::null_mut(),
                std::ptr::null_mut(),
            )
        };
        if bytes < 0 {
            return Err(io::Error::last_os_error());
        }
        let len = bytes as usize;
        Ok(RecvInfo {
            len,
            captured: len.min(frame.len()),
        })
    }

    /// Configures the socket's non-blocking status.
    pub fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        set_nonblocking(self.fd, nonblocking)
    }

    /// Turns promiscuous mode on or off on this NIC. Useful for receiving all packets on an
    /// interface, including those not addressed to the device. The kernel reference-counts the
    /// mode, so it is dropped again when the socket closes.
    pub fn set_promiscuous(&self, promiscuous: bool) -> io::Result<()> {
        let mreq = linux::packet_mreq {
            mr_ifindex: self.send_addr.sll_ifindex,
            mr_type: linux::PACKET_MR_PROMISC,
            mr_alen: 0,
            mr_address: [0; 8],
        };
        let op = if promiscuous {
            linux::PACKET_ADD_MEMBERSHIP
        } else {
            linux::PACKET_DROP_MEMBERSHIP
        };
        // This block is marked as unsafe because it uses FFI. setsockopt only reads the
        // packet_mreq we own, for the length we pass.
        unsafe {
            let err = libc::setsockopt(
                self.fd,
                linux::SOL_PACKET,
                op,
                &mreq as *const _ as *const libc::c_void,
                mem::size_of::<linux::packet_mreq>() as libc::socklen_t,
            );
            if err < 0 {
                return Err(io::Error::last_os_error());
            }
        }
        Ok(())
    }

    /// Reads and resets the kernel's delivery and drop counters for this socket.
    pub fn statistics(&self) -> io::Result<SocketStats> {
        let mut stats = linux::tpacket_stats::default();
        let mut len = mem::size_of::<linux::tpacket_stats>() as libc::socklen_t;
        // This block is marked as unsafe because it uses FFI. getsockopt writes at most `len`
        // bytes into the tpacket_stats we own.
        unsafe {
            let err = libc::getsockopt(
                self.fd,
                linux::SOL_PACKET,
                linux::PACKET_STATISTICS,
                &mut stats as *mut _ as *mut libc::c_void,
                &mut len,
            );
            if err < 0 {
                return Err(io::Error::last_os_error());
            }
        }
        Ok(SocketStats {
            packets: stats.tp_packets as u64,
            drops: stats.tp_drops as u64,
        })
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}

impl Drop for BoundSocket {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn ifreq_name_is_nul_terminated() {
        let long = CString::new("a-very-long-interface-name").unwrap();
        let ifr = ifreq_for(&long);
        let name = unsafe { ifr.ifr_ifrn.ifrn_name };
        assert_eq!(name[libc::IFNAMSIZ - 1], 0);
        assert_eq!(name[0] as u8, b'a');
    }

    #[test]
    fn truncation() {
        let info = RecvInfo {
            len: 9000,
            captured: 1514,
        };
        assert!(info.is_truncated());
        assert!(!RecvInfo {
            len: 60,
            captured: 60
        }
        .is_truncated());
    }
}
