use crate::interface::Interface;
use std::fmt;
use std::mem;
use std::sync::Arc;
use tracing::warn;

///
/// One acquired, writable TX buffer.
///
/// A frame must end in exactly one of `TxEngine::send` or `TxEngine::abort`, both of which take it
/// by value. Dropping it instead counts as an abort.
///
pub struct TxFrame {
    iface: Arc<Interface>,
    /// Ring slot the buffer belongs to. `None` for a heap buffer.
    slot: Option<usize>,
    buf: Box<[u8]>,
    len: usize,
    finalized: bool,
}

/// How a frame left the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Outcome {
    Sent(usize),
    Failed,
    /// Failed because the device refused the frame's contents.
    Rejected,
    Aborted,
}

impl TxFrame {
    pub(crate) fn new(iface: Arc<Interface>, slot: Option<usize>, buf: Box<[u8]>) -> TxFrame {
        TxFrame {
            iface,
            slot,
            buf,
            len: 0,
            finalized: false,
        }
    }

    /// Usable size of the buffer.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn slot(&self) -> Option<usize> {
        self.slot
    }

    /// The whole buffer, for the caller to fill. Follow up with `set_len`.
    pub fn buffer_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    /// Declares how many bytes of the buffer make up the frame. Clamped to the capacity.
    pub fn set_len(&mut self, len: usize) {
        self.len = len.min(self.buf.len());
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The filled part.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    ///
    /// Returns the buffer to its ring slot and books the outcome, all under one lock.
    ///
    pub(crate) fn finish(mut self, outcome: Outcome) {
        self.complete(outcome);
    }

    fn complete(&mut self, outcome: Outcome) {
        self.finalized = true;
        let buf = mem::take(&mut self.buf);
        let mut state = self.iface.lock();
        if let (Some(idx), Some(ring)) = (self.slot, state.ring.as_mut()) {
            match outcome {
                Outcome::Rejected => ring.release_rejected(idx, buf),
                _ => ring.release(idx, buf),
            }
        }
        let stats = &mut state.stats;
        match outcome {
            Outcome::Sent(bytes) => {
                stats.tx_frames += 1;
                stats.tx_bytes += bytes as u64;
            }
            Outcome::Failed | Outcome::Rejected => stats.tx_errors += 1,
            Outcome::Aborted => stats.tx_aborts += 1,
        }
    }
}

impl Drop for TxFrame {
    fn drop(&mut self) {
        if !self.finalized {
            warn!(
                iface = %self.iface.name(),
                slot = ?self.slot,
                "tx frame dropped without send or abort"
            );
            self.complete(Outcome::Aborted);
        }
    }
}

impl fmt::Debug for TxFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxFrame")
            .field("iface", &self.iface.name())
            .field("slot", &self.slot)
            .field("len", &self.len)
            .field("capacity", &self.buf.len())
            .finish()
    }
}
