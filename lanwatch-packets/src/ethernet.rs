use crate::{
    BuildError, Cursor, DecodeError, DecodeResult, HwAddr, Protocol, ETHERTYPE_MIN, ETHERTYPE_VLAN,
};
use std::convert::TryInto;

pub const ETH_ALEN: usize = 6;
pub const ETH_HLEN: usize = 14;
/// Minimum frame size on the wire, without the FCS.
pub const ETH_ZLEN: usize = 60;
pub const VLAN_HLEN: usize = 4;

const DEST_RANGE: (usize, usize) = (0, 6);
const SOURCE_RANGE: (usize, usize) = (6, 12);
const ETHERTYPE_RANGE: (usize, usize) = (12, 14);

///
/// A validated view over an Ethernet II header, with an optional 802.1Q tag already stepped over.
///
/// `ethertype()` is always the protocol of `payload()`, i.e. the inner type on tagged frames.
///
#[derive(Clone, Copy, Debug)]
pub struct EthernetHeader<'a> {
    frame: &'a [u8],
    vlan_tci: Option<u16>,
    ethertype: u16,
    payload: &'a [u8],
}

impl<'a> EthernetHeader<'a> {
    pub fn parse(frame: &'a [u8]) -> DecodeResult<Self> {
        let mut cursor = Cursor::new(frame, Protocol::Ethernet);
        cursor.take_or(ETH_HLEN, "shorter than an ethernet header")?;

        let (start, end) = ETHERTYPE_RANGE;
        let mut ethertype = u16::from_be_bytes(frame[start..end].try_into().unwrap());
        let mut vlan_tci = None;
        if ethertype == ETHERTYPE_VLAN {
            vlan_tci = Some(cursor.read_u16().map_err(|_| {
                DecodeError::malformed(Protocol::Ethernet, "truncated 802.1q tag")
            })?);
            ethertype = cursor
                .read_u16()
                .map_err(|_| DecodeError::malformed(Protocol::Ethernet, "truncated 802.1q tag"))?;
        }
        // 802.3 length framing carries LLC, which we don't dissect.
        if ethertype < ETHERTYPE_MIN {
            return Err(DecodeError::no_protocol(Protocol::Ethernet, ethertype));
        }

        Ok(EthernetHeader {
            frame,
            vlan_tci,
            ethertype,
            payload: cursor.rest(),
        })
    }

    pub fn destination(&self) -> &'a [u8] {
        let (start, end) = DEST_RANGE;
        &self.frame[start..end]
    }

    pub fn source(&self) -> &'a [u8] {
        let (start, end) = SOURCE_RANGE;
        &self.frame[start..end]
    }

    pub fn ethertype(&self) -> u16 {
        self.ethertype
    }

    /// The 12-bit VLAN ID of a tagged frame.
    pub fn vlan_id(&self) -> Option<u16> {
        self.vlan_tci.map(|tci| tci & 0x0fff)
    }

    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }
}

///
/// Whether `received` bytes of network-layer data are consistent with a header that declared
/// `expected` bytes.
///
/// Anything short of `expected` is a contradiction. Extra bytes are accepted only while the frame
/// is still within minimum-size padding, plus room for one 802.1Q tag.
///
pub fn check_padup(received: usize, expected: usize) -> bool {
    if received == expected {
        return true;
    }
    received > expected && received <= ETH_ZLEN + VLAN_HLEN - ETH_HLEN
}

///
/// Writes a 14-byte Ethernet header to the front of `buf` and returns its length.
///
pub fn write_header(
    buf: &mut [u8],
    destination: &HwAddr,
    source: &HwAddr,
    ethertype: u16,
) -> Result<usize, BuildError> {
    for addr in &[destination, source] {
        if addr.len() != ETH_ALEN {
            return Err(BuildError::AddressLength {
                expected: ETH_ALEN,
                got: addr.len(),
            });
        }
    }
    if buf.len() < ETH_HLEN {
        return Err(BuildError::TooSmall {
            need: ETH_HLEN,
            have: buf.len(),
        });
    }
    buf[DEST_RANGE.0..DEST_RANGE.1].copy_from_slice(destination.as_bytes());
    buf[SOURCE_RANGE.0..SOURCE_RANGE.1].copy_from_slice(source.as_bytes());
    buf[ETHERTYPE_RANGE.0..ETHERTYPE_RANGE.1].copy_from_slice(&ethertype.to_be_bytes());
    Ok(ETH_HLEN)
}
