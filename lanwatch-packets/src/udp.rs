use crate::{Cursor, DecodeError, DecodeResult, Protocol};

pub const UDP_HLEN: usize = 8;

#[derive(Clone, Copy, Debug)]
pub struct UdpHeader<'a> {
    src_port: u16,
    dest_port: u16,
    length: u16,
    checksum: u16,
    payload: &'a [u8],
}

impl<'a> UdpHeader<'a> {
    ///
    /// `data` is exactly the IP payload, so the datagram length must account for every byte of it.
    ///
    pub fn parse(data: &'a [u8]) -> DecodeResult<Self> {
        let mut cursor = Cursor::new(data, Protocol::Udp);
        cursor.require(UDP_HLEN, "shorter than a udp header")?;
        let src_port = cursor.read_u16()?;
        let dest_port = cursor.read_u16()?;
        let length = cursor.read_u16()?;
        let checksum = cursor.read_u16()?;

        if length as usize != data.len() {
            return Err(DecodeError::malformed(Protocol::Udp, "length mismatch"));
        }

        Ok(UdpHeader {
            src_port,
            dest_port,
            length,
            checksum,
            payload: cursor.rest(),
        })
    }

    pub fn src_port(&self) -> u16 {
        self.src_port
    }

    pub fn dest_port(&self) -> u16 {
        self.dest_port
    }

    pub fn length(&self) -> u16 {
        self.length
    }

    pub fn checksum(&self) -> u16 {
        self.checksum
    }

    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn udp_datagram() {
        let data = [0x00, 0x89, 0x00, 0x89, 0x00, 0x0a, 0xbe, 0xef, 1, 2];
        let udp = UdpHeader::parse(&data).unwrap();
        assert_eq!(udp.src_port(), 137);
        assert_eq!(udp.dest_port(), 137);
        assert_eq!(udp.length(), 10);
        assert_eq!(udp.checksum(), 0xbeef);
        assert_eq!(udp.payload(), &[1, 2]);
    }

    #[test]
    fn length_must_match() {
        let data = [0x00, 0x35, 0x00, 0x35, 0x00, 0x0b, 0, 0, 1, 2];
        assert!(UdpHeader::parse(&data).unwrap_err().is_malformed());
        assert!(UdpHeader::parse(&data[..7]).unwrap_err().is_malformed());
    }
}
