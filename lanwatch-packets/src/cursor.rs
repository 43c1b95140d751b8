use crate::{DecodeError, DecodeResult, Protocol};
use std::convert::TryInto;

/// A bounds-checked reader over a borrowed byte span.
///
/// Every read either returns the requested bytes and shrinks `remaining()` by exactly that
/// amount, or fails with a `Malformed` error attributed to the cursor's protocol. There is no
/// way to read past the end of the span.
#[derive(Clone, Copy, Debug)]
pub struct Cursor<'a> {
    data: &'a [u8],
    proto: Protocol,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8], proto: Protocol) -> Self {
        Cursor { data, proto }
    }

    pub fn remaining(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Everything not yet consumed.
    pub fn rest(&self) -> &'a [u8] {
        self.data
    }

    /// Fails with `reason` unless at least `n` bytes remain.
    pub fn require(&self, n: usize, reason: &'static str) -> DecodeResult<()> {
        if self.data.len() < n {
            return Err(DecodeError::malformed(self.proto, reason));
        }
        Ok(())
    }

    pub fn peek(&self, n: usize) -> DecodeResult<&'a [u8]> {
        self.require(n, "truncated")?;
        Ok(&self.data[..n])
    }

    pub fn take(&mut self, n: usize) -> DecodeResult<&'a [u8]> {
        self.require(n, "truncated")?;
        let (head, tail) = self.data.split_at(n);
        self.data = tail;
        Ok(head)
    }

    /// Like `take`, with a caller-chosen reason on failure.
    pub fn take_or(&mut self, n: usize, reason: &'static str) -> DecodeResult<&'a [u8]> {
        self.require(n, reason)?;
        self.take(n)
    }

    pub fn skip(&mut self, n: usize) -> DecodeResult<()> {
        self.take(n).map(|_| ())
    }

    pub fn read_u8(&mut self) -> DecodeResult<u8> {
        Ok(self.take(1)?[0])
    }

    /// Reads a network-order 16-bit word.
    pub fn read_u16(&mut self) -> DecodeResult<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes(bytes.try_into().unwrap()))
    }

    pub fn read_u32(&mut self) -> DecodeResult<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes(bytes.try_into().unwrap()))
    }

    pub fn read_array<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        let bytes = self.take(N)?;
        Ok(bytes.try_into().unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_shrink_remaining() {
        let data = [0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc, 0xde];
        let mut cursor = Cursor::new(&data, Protocol::Gre);
        assert_eq!(cursor.read_u16().unwrap(), 0x1234);
        assert_eq!(cursor.remaining(), 5);
        assert_eq!(cursor.read_u32().unwrap(), 0x5678_9abc);
        assert_eq!(cursor.peek(1).unwrap(), &[0xde]);
        assert_eq!(cursor.remaining(), 1);
        assert_eq!(cursor.read_u8().unwrap(), 0xde);
        assert!(cursor.is_empty());
    }

    #[test]
    fn overread_is_malformed() {
        let data = [1, 2, 3];
        let mut cursor = Cursor::new(&data, Protocol::Tcp);
        assert_eq!(
            cursor.read_u32(),
            Err(DecodeError::malformed(Protocol::Tcp, "truncated"))
        );
        // A failed read leaves the cursor where it was.
        assert_eq!(cursor.remaining(), 3);
        assert_eq!(
            cursor.take_or(4, "option data truncated"),
            Err(DecodeError::malformed(Protocol::Tcp, "option data truncated"))
        );
    }

    #[test]
    fn read_array() {
        let data = [10, 0, 0, 1, 7];
        let mut cursor = Cursor::new(&data, Protocol::Ipv4);
        let addr: [u8; 4] = cursor.read_array().unwrap();
        assert_eq!(addr, [10, 0, 0, 1]);
        assert_eq!(cursor.rest(), &[7]);
    }
}
