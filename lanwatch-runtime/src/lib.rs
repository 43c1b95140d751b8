/// The error types of the runtime. Per-frame decode failures never show up here; they are counted
/// on the interface and logged. What does show up is what a caller has to decide about: a TX slot
/// that couldn't be had, a frame that didn't fit, a send the device refused, a bad configuration.
pub mod error;

/// Interfaces are the endpoints everything else hangs off. An interface owns its lifetime
/// counters, its neighbor cache, its TX ring and its routes, and serializes access to them behind
/// one lock. Discovery hands the core an `InterfaceConfig`; the core never asks the OS itself.
pub mod interface;

/// The neighbor cache keeps every hardware address seen on an interface, most recent first, with
/// at most one name each. Callers hear about new and newly named neighbors through a
/// `NeighborObserver` they pass in.
pub mod neighbor;

/// The transmit engine hands out frame buffers from the interface's TX ring, lets the caller fill
/// them (there is a builder for ARP probes), works out whether the frame is for the wire, for this
/// host or both, and sends or aborts it.
pub mod tx;

/// The dissector takes received frames down the protocol stack, counts what happened, and feeds
/// what it learned about senders into the neighbor cache.
pub mod dissector;

/// Capture drives a dissector from a frame source until told to stop.
pub mod capture;

pub use capture::{CaptureConfig, FrameSource, RxFrame};
pub use dissector::{FrameDissector, Verdict};
pub use error::{Error, Result, TxError};
pub use interface::{Interface, InterfaceConfig, LinkType, RingGeometry, Stats};
pub use neighbor::{ChannelObserver, NeighborCache, NeighborEvent, NeighborObserver};
pub use tx::{Direction, TxEngine, TxFrame};
