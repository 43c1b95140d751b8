use crate::ethernet::{check_padup, write_header, ETH_ALEN, ETH_HLEN};
use crate::{
    BuildError, Cursor, DecodeError, DecodeResult, HwAddr, Protocol, ETHERTYPE_ARP, ETHERTYPE_IPV4,
};

/// Fixed part of the ARP header, before the four variable-length addresses.
pub const ARP_HLEN: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArpOp {
    Request = 1,
    Reply = 2,
}

pub enum ArpHardwareType {
    Ethernet = 1,
}

///
/// A validated view over an ARP packet as described in RFC 826
/// https://tools.ietf.org/html/rfc826
///
#[derive(Clone, Copy, Debug)]
pub struct ArpPacket<'a> {
    hardware_type: u16,
    protocol_type: u16,
    op: ArpOp,
    sender_hardware_addr: &'a [u8],
    sender_protocol_addr: &'a [u8],
    target_hardware_addr: &'a [u8],
    target_protocol_addr: &'a [u8],
}

impl<'a> ArpPacket<'a> {
    ///
    /// The received length must be exactly the fixed header plus both address pairs.
    ///
    pub fn parse(data: &'a [u8]) -> DecodeResult<Self> {
        let mut cursor = Cursor::new(data, Protocol::Arp);
        cursor.require(ARP_HLEN, "shorter than an arp header")?;
        let hardware_type = cursor.read_u16()?;
        let protocol_type = cursor.read_u16()?;
        let hln = cursor.read_u8()? as usize;
        let pln = cursor.read_u8()? as usize;
        let op = cursor.read_u16()?;

        if data.len() != ARP_HLEN + 2 * hln + 2 * pln {
            return Err(DecodeError::malformed(Protocol::Arp, "length mismatch"));
        }
        let op = match op {
            1 => ArpOp::Request,
            2 => ArpOp::Reply,
            other => return Err(DecodeError::no_protocol(Protocol::Arp, other)),
        };

        Ok(ArpPacket {
            hardware_type,
            protocol_type,
            op,
            sender_hardware_addr: cursor.take(hln)?,
            sender_protocol_addr: cursor.take(pln)?,
            target_hardware_addr: cursor.take(hln)?,
            target_protocol_addr: cursor.take(pln)?,
        })
    }

    ///
    /// Like `parse`, but `data` is the whole Ethernet payload and may carry minimum-size padding
    /// after the last address.
    ///
    pub fn parse_padded(data: &'a [u8]) -> DecodeResult<Self> {
        Cursor::new(data, Protocol::Arp).require(ARP_HLEN, "shorter than an arp header")?;
        let hln = data[4] as usize;
        let pln = data[5] as usize;
        let expected = ARP_HLEN + 2 * hln + 2 * pln;
        if !check_padup(data.len(), expected) {
            return Err(DecodeError::malformed(Protocol::Arp, "length mismatch"));
        }
        ArpPacket::parse(&data[..expected.min(data.len())])
    }

    pub fn hardware_type(&self) -> u16 {
        self.hardware_type
    }

    pub fn protocol_type(&self) -> u16 {
        self.protocol_type
    }

    pub fn op(&self) -> ArpOp {
        self.op
    }

    pub fn sender_hardware_addr(&self) -> &'a [u8] {
        self.sender_hardware_addr
    }

    pub fn sender_protocol_addr(&self) -> &'a [u8] {
        self.sender_protocol_addr
    }

    pub fn target_hardware_addr(&self) -> &'a [u8] {
        self.target_hardware_addr
    }

    pub fn target_protocol_addr(&self) -> &'a [u8] {
        self.target_protocol_addr
    }
}

///
/// An Ethernet-framed ARP REQUEST, addressed to `target_hw` and asking who holds `target_proto`.
///
#[derive(Clone, Copy, Debug)]
pub struct ArpProbe<'a> {
    pub sender_hw: &'a HwAddr,
    pub sender_proto: &'a [u8],
    pub target_hw: &'a HwAddr,
    pub target_proto: &'a [u8],
}

impl<'a> ArpProbe<'a> {
    pub fn len(&self) -> usize {
        ETH_HLEN + ARP_HLEN + 2 * self.sender_hw.len() + 2 * self.sender_proto.len()
    }

    ///
    /// Composes the probe into the front of `buf` and returns the number of bytes written.
    ///
    /// All checks run before the first write, so `buf` is untouched on error.
    ///
    pub fn write(&self, buf: &mut [u8]) -> Result<usize, BuildError> {
        let hln = self.sender_hw.len();
        let pln = self.sender_proto.len();
        if hln != ETH_ALEN {
            return Err(BuildError::AddressLength {
                expected: ETH_ALEN,
                got: hln,
            });
        }
        if self.target_hw.len() != hln {
            return Err(BuildError::AddressLength {
                expected: hln,
                got: self.target_hw.len(),
            });
        }
        if self.target_proto.len() != pln {
            return Err(BuildError::AddressLength {
                expected: pln,
                got: self.target_proto.len(),
            });
        }
        let total = self.len();
        if buf.len() < total {
            return Err(BuildError::TooSmall {
                need: total,
                have: buf.len(),
            });
        }

        let mut off = write_header(buf, self.target_hw, self.sender_hw, ETHERTYPE_ARP)?;
        let mut put = |bytes: &[u8]| {
            buf[off..off + bytes.len()].copy_from_slice(bytes);
            off += bytes.len();
        };
        put(&(ArpHardwareType::Ethernet as u16).to_be_bytes());
        put(&ETHERTYPE_IPV4.to_be_bytes());
        put(&[hln as u8, pln as u8]);
        put(&(ArpOp::Request as u16).to_be_bytes());
        put(self.sender_hw.as_bytes());
        put(self.sender_proto);
        put(self.target_hw.as_bytes());
        put(self.target_proto);

        debug_assert_eq!(off, total);
        Ok(total)
    }
}
