use crate::ifinfo::ControlSocket;
use crate::linux;
use std::{ffi::CStr, io, mem::MaybeUninit};

/// `duplex` values reported in [`LinkSettings`].
pub const DUPLEX_HALF: u8 = 0;
pub const DUPLEX_FULL: u8 = 1;
pub const DUPLEX_UNKNOWN: u8 = 0xff;

/// What `ethtool -i` shows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DriverDetails {
    pub driver: String,
    pub version: String,
    pub firmware: String,
    pub bus: String,
}

/// Negotiated link parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LinkSettings {
    /// `None` while the link is down or the driver can't tell.
    pub speed_mbps: Option<u32>,
    /// One of the `DUPLEX_*` values.
    pub duplex: u8,
    pub autoneg: bool,
}

/// Offloads as `ethtool -k` reports them. Offloads the driver has no notion of read as off.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Offloads {
    pub rx_csum: bool,
    pub tx_csum: bool,
    pub scatter_gather: bool,
    pub tso: bool,
    pub ufo: bool,
    pub gso: bool,
    pub gro: bool,
    pub lro: bool,
}

/// NUL-terminated C string field to owned text.
fn c_field(raw: &[u8]) -> String {
    let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

/// Driver name, version, firmware and bus address. Needs no privileges.
pub fn driver_details(iface: impl AsRef<CStr>) -> io::Result<DriverDetails> {
    let fd = ControlSocket::new()?;
    // ethtool_drvinfo is plain old data, so all zeroes is a valid value.
    let mut info: linux::ethtool_drvinfo = unsafe { MaybeUninit::zeroed().assume_init() };
    info.cmd = linux::ETHTOOL_GDRVINFO;
    fd.ethtool(iface.as_ref(), &mut info)?;
    Ok(DriverDetails {
        driver: c_field(&info.driver),
        version: c_field(&info.version),
        firmware: c_field(&info.fw_version),
        bus: c_field(&info.bus_info),
    })
}

/// Speed, duplex and autonegotiation through the legacy `ETHTOOL_GSET` command.
pub fn link_settings(iface: impl AsRef<CStr>) -> io::Result<LinkSettings> {
    let fd = ControlSocket::new()?;
    // ethtool_cmd is plain old data, so all zeroes is a valid value.
    let mut cmd: linux::ethtool_cmd = unsafe { MaybeUninit::zeroed().assume_init() };
    cmd.cmd = linux::ETHTOOL_GSET;
    fd.ethtool(iface.as_ref(), &mut cmd)?;

    let speed = (cmd.speed_hi as u32) << 16 | cmd.speed as u32;
    Ok(LinkSettings {
        speed_mbps: match speed {
            0 | 0xffff | 0xffff_ffff => None,
            mbps => Some(mbps),
        },
        duplex: cmd.duplex,
        autoneg: cmd.autoneg != 0,
    })
}

/// Reads one `ethtool_value` command. Drivers without the operation answer `EOPNOTSUPP`, which
/// reads as zero.
fn value(fd: &ControlSocket, iface: &CStr, cmd: u32) -> io::Result<u32> {
    let mut val = linux::ethtool_value { cmd, data: 0 };
    match fd.ethtool(iface, &mut val) {
        Ok(()) => Ok(val.data),
        Err(err) if err.raw_os_error() == Some(libc::EOPNOTSUPP) => Ok(0),
        Err(err) => Err(err),
    }
}

/// Which offloads are switched on.
pub fn offloads(iface: impl AsRef<CStr>) -> io::Result<Offloads> {
    let iface = iface.as_ref();
    let fd = ControlSocket::new()?;
    let on = |cmd| value(&fd, iface, cmd).map(|data| data != 0);
    Ok(Offloads {
        rx_csum: on(linux::ETHTOOL_GRXCSUM)?,
        tx_csum: on(linux::ETHTOOL_GTXCSUM)?,
        scatter_gather: on(linux::ETHTOOL_GSG)?,
        tso: on(linux::ETHTOOL_GTSO)?,
        ufo: on(linux::ETHTOOL_GUFO)?,
        gso: on(linux::ETHTOOL_GGSO)?,
        gro: on(linux::ETHTOOL_GGRO)?,
        lro: value(&fd, iface, linux::ETHTOOL_GFLAGS)? & linux::ETH_FLAG_LRO != 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn c_fields_stop_at_nul() {
        let mut raw = [0u8; 32];
        raw[..6].copy_from_slice(b"e1000e");
        assert_eq!(c_field(&raw), "e1000e");
        assert_eq!(c_field(b"no-nul"), "no-nul");
        assert_eq!(c_field(&[0; 4]), "");
    }

    #[test]
    fn struct_sizes_match_the_kernel() {
        assert_eq!(std::mem::size_of::<linux::ethtool_drvinfo>(), 196);
        assert_eq!(std::mem::size_of::<linux::ethtool_cmd>(), 44);
        assert_eq!(std::mem::size_of::<linux::ethtool_value>(), 8);
    }

    #[test]
    fn missing_interface() {
        let name = CString::new("no-such-if0").unwrap();
        assert!(driver_details(&name).is_err());
        assert!(link_settings(&name).is_err());
        assert!(offloads(&name).is_err());
    }
}
