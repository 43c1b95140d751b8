#![deny(missing_docs)]

use libc;
use std::{
    io,
    mem::{self, MaybeUninit},
    net::IpAddr,
};

/// A raw IP socket whose writes carry their own IP header. Used to hand a complete packet to the
/// local stack without going through a link-layer device.
pub struct RawIpSocket {
    fd: libc::c_int,
    family: libc::c_int,
}

impl RawIpSocket {
    /// Opens an IPv4 raw socket. Needs `CAP_NET_RAW`.
    pub fn new_v4() -> io::Result<Self> {
        Self::new(libc::AF_INET)
    }

    /// Opens an IPv6 raw socket. Needs `CAP_NET_RAW`.
    pub fn new_v6() -> io::Result<Self> {
        Self::new(libc::AF_INET6)
    }

    fn new(family: libc::c_int) -> io::Result<Self> {
        // This block is marked as unsafe because it uses FFI. No Rust memory is involved.
        // Resources:
        // man 7 raw regarding IPPROTO_RAW
        let fd = unsafe { libc::socket(family, libc::SOCK_RAW, libc::IPPROTO_RAW) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(RawIpSocket { fd, family })
    }

    /// Sends `packet`, IP header included, towards `dest`. The address family must match the
    /// socket's.
    pub fn send_to(&self, packet: &[u8], dest: IpAddr) -> io::Result<usize> {
        // This block is marked as unsafe because it uses FFI. Both sockaddr structs are plain old
        // data, and sendto only reads the frame and address we borrow, for the lengths we pass.
        let bytes = unsafe {
            match (dest, self.family) {
                (IpAddr::V4(addr), libc::AF_INET) => {
                    let mut sin: libc::sockaddr_in = MaybeUninit::zeroed().assume_init();
                    sin.sin_family = libc::AF_INET as libc::sa_family_t;
                    sin.sin_addr.s_addr = u32::from_ne_bytes(addr.octets());
                    libc::sendto(
                        self.fd,
                        packet.as_ptr() as *const _,
                        packet.len(),
                        0,
                        &sin as *const _ as *const libc::sockaddr,
                        mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
                    )
                }
                (IpAddr::V6(addr), libc::AF_INET6) => {
                    let mut sin6: libc::sockaddr_in6 = MaybeUninit::zeroed().assume_init();
                    sin6.sin6_family = libc::AF_INET6 as libc::sa_family_t;
                    sin6.sin6_addr.s6_addr = addr.octets();
                    libc::sendto(
                        self.fd,
                        packet.as_ptr() as *const _,
                        packet.len(),
                        0,
                        &sin6 as *const _ as *const libc::sockaddr,
                        mem::size_of::<libc::sockaddr_in6>() as libc::socklen_t,
                    )
                }
                _ => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "address family does not match socket",
                    ))
                }
            }
        };
        if bytes < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(bytes as usize)
        }
    }
}

impl Drop for RawIpSocket {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}
