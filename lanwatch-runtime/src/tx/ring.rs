use crate::interface::RingGeometry;

///
/// Ownership state of one TX slot, using the kernel's `TP_STATUS_*` encoding so a ring can be
/// shared with a `PACKET_TX_RING` mapping.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotStatus {
    Available,
    /// Queued by `TxEngine::send`, not yet handed to the device.
    SendRequest,
    /// The device has the frame.
    Sending,
    /// The device refused the frame. Recoverable: the next acquire resets it.
    WrongFormat,
    /// Handed out to a caller who hasn't sent or aborted yet.
    Preparing,
}

const STATUS_AVAILABLE: u32 = 0;
const STATUS_SEND_REQUEST: u32 = 1;
const STATUS_SENDING: u32 = 2;
const STATUS_WRONG_FORMAT: u32 = 4;
const STATUS_PREPARING: u32 = !0;

impl SlotStatus {
    pub fn as_raw(self) -> u32 {
        match self {
            SlotStatus::Available => STATUS_AVAILABLE,
            SlotStatus::SendRequest => STATUS_SEND_REQUEST,
            SlotStatus::Sending => STATUS_SENDING,
            SlotStatus::WrongFormat => STATUS_WRONG_FORMAT,
            SlotStatus::Preparing => STATUS_PREPARING,
        }
    }
}

struct Slot {
    status: SlotStatus,
    /// Moves out to the caller's frame while the slot is not Available.
    buf: Option<Box<[u8]>>,
}

///
/// A fixed set of equally-sized TX buffers with a cursor.
///
/// A slot's buffer is moved out to the caller on acquire and moved back on release, so the ring
/// never hands the same memory to two writers. All methods are called with the interface lock held.
///
pub struct TxRing {
    slots: Vec<Slot>,
    cursor: usize,
    slot_size: usize,
}

impl TxRing {
    pub fn new(geometry: RingGeometry) -> TxRing {
        let slots = (0..geometry.slot_count)
            .map(|_| Slot {
                status: SlotStatus::Available,
                buf: Some(vec![0u8; geometry.slot_size].into_boxed_slice()),
            })
            .collect();
        TxRing {
            slots,
            cursor: 0,
            slot_size: geometry.slot_size,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn slot_size(&self) -> usize {
        self.slot_size
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    ///
    /// Takes the first reusable slot at or after the cursor, wrapping around once, and marks it
    /// Preparing. The cursor moves past it. Returns `None` without side effects if every slot is
    /// still owned by a caller or the kernel.
    ///
    pub fn acquire(&mut self) -> Option<(usize, Box<[u8]>)> {
        let count = self.slots.len();
        for step in 0..count {
            let idx = (self.cursor + step) % count;
            let slot = &mut self.slots[idx];
            match slot.status {
                SlotStatus::Available | SlotStatus::WrongFormat => {}
                _ => continue,
            }
            let buf = match slot.buf.take() {
                Some(buf) => buf,
                None => continue,
            };
            slot.status = SlotStatus::Preparing;
            self.cursor = (idx + 1) % count;
            return Some((idx, buf));
        }
        None
    }

    pub fn status(&self, idx: usize) -> Option<SlotStatus> {
        self.slots.get(idx).map(|s| s.status)
    }

    pub fn set_status(&mut self, idx: usize, status: SlotStatus) {
        if let Some(slot) = self.slots.get_mut(idx) {
            slot.status = status;
        }
    }

    /// Gives a slot's buffer back and makes the slot Available again.
    pub fn release(&mut self, idx: usize, buf: Box<[u8]>) {
        if let Some(slot) = self.slots.get_mut(idx) {
            slot.buf = Some(buf);
            slot.status = SlotStatus::Available;
        }
    }

    /// Like `release`, but leaves the slot WrongFormat so the refusal stays visible until the slot
    /// is acquired again.
    pub fn release_rejected(&mut self, idx: usize, buf: Box<[u8]>) {
        if let Some(slot) = self.slots.get_mut(idx) {
            slot.buf = Some(buf);
            slot.status = SlotStatus::WrongFormat;
        }
    }

    /// Number of slots a caller could acquire right now.
    pub fn available(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| match s.status {
                SlotStatus::Available | SlotStatus::WrongFormat => s.buf.is_some(),
                _ => false,
            })
            .count()
    }
}
