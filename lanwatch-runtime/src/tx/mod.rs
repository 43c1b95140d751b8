use crate::error::TxError;
use crate::interface::{Interface, LinkType};
use lanwatch_packets::{ArpProbe, HwAddr};
use std::io;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::{debug, warn};

mod frame;
pub use self::frame::TxFrame;
use self::frame::Outcome;

mod local;
pub use self::local::*;

mod path;
pub use self::path::*;

mod ring;
pub use self::ring::*;

/// The device-facing transmit primitive.
pub trait WireTransmit: Send + Sync {
    /// Returns the number of bytes taken. Zero means the count is reported elsewhere.
    fn transmit(&self, frame: &[u8]) -> io::Result<usize>;
}

/// Hands a self-destined packet to this host's own stack.
pub trait LocalTransmit: Send + Sync {
    fn deliver(&self, packet: LocalPacket<'_>) -> io::Result<usize>;
}

#[cfg(target_os = "linux")]
impl WireTransmit for afpacket::BoundSocket {
    fn transmit(&self, frame: &[u8]) -> io::Result<usize> {
        self.send(frame)
    }
}

impl<T: WireTransmit + ?Sized> WireTransmit for Arc<T> {
    fn transmit(&self, frame: &[u8]) -> io::Result<usize> {
        (**self).transmit(frame)
    }
}

impl<T: LocalTransmit + ?Sized> LocalTransmit for Arc<T> {
    fn deliver(&self, packet: LocalPacket<'_>) -> io::Result<usize> {
        (**self).deliver(packet)
    }
}

///
/// Acquire, fill, send or abort frames on one interface.
///
/// Slot bookkeeping and counters go through the interface lock. The transmit calls themselves run
/// outside it, with the slot marked as handed over, so a slow device never holds up dissection.
///
pub struct TxEngine {
    iface: Arc<Interface>,
    wire: Box<dyn WireTransmit>,
    local: Box<dyn LocalTransmit>,
}

impl TxEngine {
    pub fn new(
        iface: Arc<Interface>,
        wire: Box<dyn WireTransmit>,
        local: Box<dyn LocalTransmit>,
    ) -> TxEngine {
        TxEngine { iface, wire, local }
    }

    pub fn interface(&self) -> &Arc<Interface> {
        &self.iface
    }

    ///
    /// Hands out a writable frame without blocking.
    ///
    /// Loopback-like links get a heap buffer of MTU size. Everything else takes a ring slot, and
    /// fails with `ResourceExhausted` while every slot is still held.
    ///
    pub fn acquire(&self) -> Result<TxFrame, TxError> {
        if !self.iface.is_running() {
            return Err(TxError::Stopped {
                iface: self.iface.name().to_string(),
            });
        }
        if self.iface.link_type() == LinkType::Loopback {
            let buf = vec![0u8; self.iface.mtu() as usize].into_boxed_slice();
            return Ok(TxFrame::new(self.iface.clone(), None, buf));
        }

        let mut state = self.iface.lock();
        let ring = state.ring.as_mut().ok_or_else(|| TxError::NoRing {
            iface: self.iface.name().to_string(),
        })?;
        let (idx, buf) = ring.acquire().ok_or_else(|| TxError::ResourceExhausted {
            iface: self.iface.name().to_string(),
        })?;
        drop(state);
        Ok(TxFrame::new(self.iface.clone(), Some(idx), buf))
    }

    ///
    /// Fills `frame` with an ARP request from this interface for `target_proto`, addressed to
    /// `target_hw`. Nothing is written if the frame can't hold it.
    ///
    pub fn prepare_arp_probe(
        &self,
        frame: &mut TxFrame,
        target_hw: &HwAddr,
        target_proto: Ipv4Addr,
        source: Ipv4Addr,
    ) -> Result<usize, TxError> {
        let probe = ArpProbe {
            sender_hw: self.iface.hwaddr(),
            sender_proto: &source.octets(),
            target_hw,
            target_proto: &target_proto.octets(),
        };
        let len = probe.write(frame.buffer_mut())?;
        frame.set_len(len);
        Ok(len)
    }

    pub fn classify(&self, frame: &[u8]) -> Direction {
        classify(
            self.iface.link_type(),
            self.iface.hwaddr(),
            self.iface.bcast(),
            frame,
        )
    }

    ///
    /// Sends the filled part of `frame` down every path its destination calls for, then returns
    /// the slot to the ring.
    ///
    /// The slot is SendRequest while queued and Sending while the wire has it. A frame the device
    /// refuses as invalid leaves its slot WrongFormat until the next acquire resets it.
    ///
    /// When a frame goes both ways, the wire result decides the outcome and a failed local copy is
    /// only logged.
    ///
    pub fn send(&self, frame: TxFrame) -> Result<usize, TxError> {
        let direction = self.classify(frame.as_bytes());
        self.mark(&frame, SlotStatus::SendRequest);

        let len = frame.len();
        let mut result = Ok(len);
        let mut rejected = false;
        if direction.wire {
            self.mark(&frame, SlotStatus::Sending);
            result = match self.wire.transmit(frame.as_bytes()) {
                Ok(0) => Ok(len),
                Ok(sent) => Ok(sent),
                Err(err) => {
                    rejected = err.kind() == io::ErrorKind::InvalidInput;
                    Err(self.failed(err))
                }
            };
        }
        if direction.local {
            let delivered = LocalPacket::from_frame(frame.as_bytes())
                .and_then(|packet| self.local.deliver(packet).map_err(|err| self.failed(err)));
            match delivered {
                Ok(_) => {}
                Err(err) if direction.wire => {
                    debug!(iface = %self.iface.name(), error = %err, "local copy not delivered");
                }
                Err(err) => result = Err(err),
            }
        }

        match result {
            Ok(sent) => {
                frame.finish(Outcome::Sent(sent));
                Ok(sent)
            }
            Err(err) => {
                warn!(iface = %self.iface.name(), error = %err, rejected, "transmit failed");
                frame.finish(if rejected {
                    Outcome::Rejected
                } else {
                    Outcome::Failed
                });
                Err(err)
            }
        }
    }

    /// Gives the frame back unsent.
    pub fn abort(&self, frame: TxFrame) {
        frame.finish(Outcome::Aborted);
    }

    /// Acquires, fills and sends one ARP probe.
    pub fn send_arp_probe(
        &self,
        target_hw: &HwAddr,
        target_proto: Ipv4Addr,
        source: Ipv4Addr,
    ) -> Result<usize, TxError> {
        let mut frame = self.acquire()?;
        if let Err(err) = self.prepare_arp_probe(&mut frame, target_hw, target_proto, source) {
            self.abort(frame);
            return Err(err);
        }
        debug!(
            iface = %self.iface.name(),
            target = %target_proto,
            via = %target_hw,
            "sending arp probe"
        );
        self.send(frame)
    }

    /// ARP reply generation is not implemented.
    pub fn send_arp_reply(
        &self,
        _target_hw: &HwAddr,
        _target_proto: Ipv4Addr,
        _claimed: Ipv4Addr,
    ) -> Result<usize, TxError> {
        Err(TxError::Unsupported("arp reply generation"))
    }

    fn mark(&self, frame: &TxFrame, status: SlotStatus) {
        if let Some(idx) = frame.slot() {
            if let Some(ring) = self.iface.lock().ring.as_mut() {
                ring.set_status(idx, status);
            }
        }
    }

    fn failed(&self, source: io::Error) -> TxError {
        TxError::TransmitFailed {
            iface: self.iface.name().to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::{InterfaceConfig, RingGeometry};
    use lanwatch_packets::{ArpPacket, EthernetHeader};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        frames: Mutex<Vec<Vec<u8>>>,
        fail: AtomicBool,
        reject: AtomicBool,
        report_zero: AtomicBool,
        /// Status of slot 0 each time the wire is called.
        slot_states: Mutex<Vec<Option<SlotStatus>>>,
        iface: Mutex<Option<Arc<Interface>>>,
    }

    impl WireTransmit for Recorder {
        fn transmit(&self, frame: &[u8]) -> io::Result<usize> {
            if let Some(iface) = self.iface.lock().unwrap().as_ref() {
                let status = iface.lock().ring.as_ref().and_then(|ring| ring.status(0));
                self.slot_states.lock().unwrap().push(status);
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(io::Error::new(io::ErrorKind::Other, "link down"));
            }
            if self.reject.load(Ordering::SeqCst) {
                return Err(io::Error::new(io::ErrorKind::InvalidInput, "bad frame"));
            }
            self.frames.lock().unwrap().push(frame.to_vec());
            if self.report_zero.load(Ordering::SeqCst) {
                Ok(0)
            } else {
                Ok(frame.len())
            }
        }
    }

    #[derive(Default)]
    struct LocalRecorder {
        delivered: Mutex<Vec<String>>,
    }

    impl LocalTransmit for LocalRecorder {
        fn deliver(&self, packet: LocalPacket<'_>) -> io::Result<usize> {
            let (dest, len) = match packet {
                LocalPacket::Udp {
                    destination,
                    payload,
                } => (destination.to_string(), payload.len()),
                LocalPacket::Ip {
                    destination,
                    packet,
                } => (destination.to_string(), packet.len()),
            };
            self.delivered.lock().unwrap().push(dest);
            Ok(len)
        }
    }

    const OWN: [u8; 6] = [0x02, 0x11, 0x22, 0x33, 0x44, 0x55];

    fn engine_with(
        geometry: RingGeometry,
        link_type: LinkType,
    ) -> (TxEngine, Arc<Recorder>, Arc<LocalRecorder>) {
        let iface = Arc::new(
            Interface::new(InterfaceConfig {
                name: "eth0".into(),
                link_type,
                hwaddr: HwAddr::new(OWN),
                ring: Some(geometry),
                ..InterfaceConfig::default()
            })
            .unwrap(),
        );
        let wire = Arc::new(Recorder::default());
        *wire.iface.lock().unwrap() = Some(iface.clone());
        let local = Arc::new(LocalRecorder::default());
        let engine = TxEngine::new(iface, Box::new(wire.clone()), Box::new(local.clone()));
        (engine, wire, local)
    }

    fn engine(
        slots: usize,
        link_type: LinkType,
    ) -> (TxEngine, Arc<Recorder>, Arc<LocalRecorder>) {
        let geometry = RingGeometry {
            slot_count: slots,
            slot_size: 128,
        };
        engine_with(geometry, link_type)
    }

    fn probe(engine: &TxEngine) -> Result<usize, TxError> {
        engine.send_arp_probe(
            &HwAddr::new([0x02, 0, 0, 0, 0, 1]),
            Ipv4Addr::new(192, 168, 1, 1),
            Ipv4Addr::new(192, 168, 1, 20),
        )
    }

    #[test]
    fn ring_exhaustion_and_reuse() {
        let (engine, _, _) = engine(4, LinkType::Ethernet);
        let mut held: Vec<_> = (0..4).map(|_| engine.acquire().unwrap()).collect();
        assert!(matches!(
            engine.acquire(),
            Err(TxError::ResourceExhausted { .. })
        ));

        let aborted = held.remove(2);
        assert_eq!(aborted.slot(), Some(2));
        engine.abort(aborted);
        let again = engine.acquire().unwrap();
        assert_eq!(again.slot(), Some(2));
        assert!(engine.acquire().is_err());

        let stats = engine.interface().stats();
        assert_eq!(stats.tx_aborts, 1);
        assert_eq!(stats.tx_frames, 0);
        held.push(again);
        for frame in held {
            engine.abort(frame);
        }
        assert_eq!(engine.interface().stats().tx_aborts, 5);
    }

    #[test]
    fn sent_slot_is_reused() {
        let (engine, wire, _) = engine(1, LinkType::Ethernet);
        assert_eq!(probe(&engine).unwrap(), 42);
        assert_eq!(probe(&engine).unwrap(), 42);
        assert_eq!(wire.frames.lock().unwrap().len(), 2);

        let stats = engine.interface().stats();
        assert_eq!(stats.tx_frames, 2);
        assert_eq!(stats.tx_bytes, 84);
    }

    #[test]
    fn probe_reaches_the_wire_intact() {
        let (engine, wire, local) = engine(2, LinkType::Ethernet);
        probe(&engine).unwrap();

        let frames = wire.frames.lock().unwrap();
        let eth = EthernetHeader::parse(&frames[0]).unwrap();
        assert_eq!(eth.destination(), &[0x02, 0, 0, 0, 0, 1]);
        assert_eq!(eth.source(), &OWN);
        let arp = ArpPacket::parse(eth.payload()).unwrap();
        assert_eq!(arp.sender_protocol_addr(), &[192, 168, 1, 20]);
        assert_eq!(arp.target_protocol_addr(), &[192, 168, 1, 1]);
        assert!(local.delivered.lock().unwrap().is_empty());
    }

    #[test]
    fn zero_byte_send_counts_as_full_length() {
        let (engine, wire, _) = engine(2, LinkType::Ethernet);
        wire.report_zero.store(true, Ordering::SeqCst);
        assert_eq!(probe(&engine).unwrap(), 42);
        assert_eq!(engine.interface().stats().tx_bytes, 42);
    }

    #[test]
    fn failed_send_counts_error_and_frees_slot() {
        let (engine, wire, _) = engine(1, LinkType::Ethernet);
        wire.fail.store(true, Ordering::SeqCst);
        assert!(matches!(
            probe(&engine),
            Err(TxError::TransmitFailed { .. })
        ));
        let stats = engine.interface().stats();
        assert_eq!(stats.tx_errors, 1);
        assert_eq!(stats.tx_frames, 0);

        wire.fail.store(false, Ordering::SeqCst);
        assert!(probe(&engine).is_ok());
    }

    #[test]
    fn slot_is_sending_while_on_the_wire() {
        let (engine, wire, _) = engine(1, LinkType::Ethernet);
        probe(&engine).unwrap();
        assert_eq!(
            *wire.slot_states.lock().unwrap(),
            vec![Some(SlotStatus::Sending)]
        );
        let state = engine.interface().lock();
        assert_eq!(
            state.ring.as_ref().and_then(|ring| ring.status(0)),
            Some(SlotStatus::Available)
        );
    }

    #[test]
    fn refused_frame_leaves_slot_wrong_format() {
        let (engine, wire, _) = engine(1, LinkType::Ethernet);
        wire.reject.store(true, Ordering::SeqCst);
        assert!(matches!(
            probe(&engine),
            Err(TxError::TransmitFailed { .. })
        ));
        {
            let state = engine.interface().lock();
            let ring = state.ring.as_ref().unwrap();
            assert_eq!(ring.status(0), Some(SlotStatus::WrongFormat));
            assert_eq!(ring.available(), 1);
        }
        assert_eq!(engine.interface().stats().tx_errors, 1);

        wire.reject.store(false, Ordering::SeqCst);
        let frame = engine.acquire().unwrap();
        assert_eq!(frame.slot(), Some(0));
        engine.abort(frame);
        let state = engine.interface().lock();
        assert_eq!(
            state.ring.as_ref().and_then(|ring| ring.status(0)),
            Some(SlotStatus::Available)
        );
    }

    #[test]
    fn too_small_slot_aborts_the_probe() {
        let geometry = RingGeometry {
            slot_count: 1,
            slot_size: 20,
        };
        let (engine, wire, _) = engine_with(geometry, LinkType::Ethernet);
        assert!(matches!(
            probe(&engine),
            Err(TxError::BuildTooSmall { need: 42, have: 20 })
        ));
        assert!(wire.frames.lock().unwrap().is_empty());
        assert_eq!(engine.interface().stats().tx_aborts, 1);
        // The slot came back.
        assert!(engine.acquire().is_ok());
    }

    #[test]
    fn dropped_frame_is_aborted() {
        let (engine, _, _) = engine(1, LinkType::Ethernet);
        {
            let mut frame = engine.acquire().unwrap();
            frame.buffer_mut()[0] = 0xff;
            frame.set_len(1);
        }
        assert_eq!(engine.interface().stats().tx_aborts, 1);
        assert!(engine.acquire().is_ok());
    }

    #[test]
    fn stopped_interface_refuses_acquire() {
        let (engine, _, _) = engine(2, LinkType::Ethernet);
        let held = engine.acquire().unwrap();
        engine.interface().stop();
        assert!(matches!(engine.acquire(), Err(TxError::Stopped { .. })));
        // In-flight frames still finish.
        engine.abort(held);
        assert_eq!(engine.interface().stats().tx_aborts, 1);
    }

    #[test]
    fn loopback_uses_heap_buffers_and_local_path() {
        let (engine, wire, local) = engine(1, LinkType::Loopback);
        let a = engine.acquire().unwrap();
        let b = engine.acquire().unwrap();
        assert_eq!(a.slot(), None);
        assert_eq!(a.capacity(), 1500);

        let mut frame = b;
        assert_eq!(frame.slot(), None);
        let mut udp = vec![0x13, 0x88, 0x13, 0x89, 0, 9, 0, 0, b'x'];
        let mut packet = vec![0x45, 0, 0, 29, 0, 0, 0, 0, 64, 17, 0, 0, 127, 0, 0, 1, 127, 0, 0, 1];
        packet.append(&mut udp);
        let buf = frame.buffer_mut();
        buf[..12].copy_from_slice(&[0; 12]);
        buf[12..14].copy_from_slice(&[0x08, 0x00]);
        buf[14..14 + packet.len()].copy_from_slice(&packet);
        frame.set_len(14 + packet.len());

        assert_eq!(engine.send(frame).unwrap(), 43);
        engine.abort(a);
        assert!(wire.frames.lock().unwrap().is_empty());
        assert_eq!(*local.delivered.lock().unwrap(), vec!["127.0.0.1:5001".to_string()]);
    }

    #[test]
    fn broadcast_non_ip_still_goes_to_wire() {
        let (engine, wire, local) = engine(1, LinkType::Ethernet);
        let mut frame = engine.acquire().unwrap();
        let buf = frame.buffer_mut();
        buf[..6].copy_from_slice(&[0xff; 6]);
        buf[6..12].copy_from_slice(&OWN);
        buf[12..14].copy_from_slice(&[0x88, 0xcc]);
        frame.set_len(60);
        assert_eq!(engine.classify(frame.as_bytes()), Direction::BOTH);

        assert_eq!(engine.send(frame).unwrap(), 60);
        assert_eq!(wire.frames.lock().unwrap().len(), 1);
        assert!(local.delivered.lock().unwrap().is_empty());
    }

    #[test]
    fn arp_reply_is_unsupported() {
        let (engine, _, _) = engine(1, LinkType::Ethernet);
        assert!(matches!(
            engine.send_arp_reply(
                &HwAddr::broadcast(6),
                Ipv4Addr::new(10, 0, 0, 1),
                Ipv4Addr::new(10, 0, 0, 2)
            ),
            Err(TxError::Unsupported(_))
        ));
    }
}
