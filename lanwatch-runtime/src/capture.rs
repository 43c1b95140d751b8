use crate::dissector::FrameDissector;
use std::io;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Clone, Debug)]
pub struct CaptureConfig {
    /// Size of the receive buffer. Longer frames are truncated.
    pub snaplen: usize,
    /// How long a receive may wait before the loop checks whether to stop.
    pub read_timeout: Duration,
    /// Dissect the captured prefix of truncated frames instead of only counting them.
    pub dissect_truncated: bool,
    /// Stop after this many frames.
    pub count: Option<u64>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        CaptureConfig {
            snaplen: 65535,
            read_timeout: Duration::from_millis(250),
            dissect_truncated: false,
            count: None,
        }
    }
}

/// One received frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RxFrame {
    /// Length on the wire.
    pub len: usize,
    /// Bytes written into the buffer.
    pub captured: usize,
}

/// Anything frames can be read from.
pub trait FrameSource {
    /// Reads the next frame into `buf`. `Ok(None)` means nothing arrived before the timeout.
    fn recv_frame(&mut self, buf: &mut [u8]) -> io::Result<Option<RxFrame>>;

    /// Frames lost since the last call.
    fn drops(&mut self) -> io::Result<u64> {
        Ok(0)
    }
}

#[cfg(target_os = "linux")]
impl<'a> FrameSource for &'a afpacket::BoundSocket {
    fn recv_frame(&mut self, buf: &mut [u8]) -> io::Result<Option<RxFrame>> {
        match self.recv(buf) {
            Ok(info) => Ok(Some(RxFrame {
                len: info.len,
                captured: info.captured,
            })),
            Err(err) => match err.kind() {
                io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted => {
                    Ok(None)
                }
                _ => Err(err),
            },
        }
    }

    fn drops(&mut self) -> io::Result<u64> {
        Ok(self.statistics()?.drops)
    }
}

///
/// Feeds frames from `source` to `dissector` until the interface stops or `cfg.count` frames
/// were seen. Returns the number of frames read.
///
pub fn run(
    dissector: &FrameDissector,
    source: &mut dyn FrameSource,
    cfg: &CaptureConfig,
) -> io::Result<u64> {
    let iface = dissector.interface();
    let mut buf = vec![0u8; cfg.snaplen];
    let mut seen = 0u64;
    info!(iface = %iface.name(), snaplen = cfg.snaplen, "capture started");

    while iface.is_running() && cfg.count.map_or(true, |count| seen < count) {
        let frame = match source.recv_frame(&mut buf)? {
            Some(frame) => frame,
            None => {
                add_drops(dissector, source)?;
                continue;
            }
        };
        seen += 1;
        if frame.captured < frame.len && !cfg.dissect_truncated {
            debug!(iface = %iface.name(), len = frame.len, "truncated frame");
            dissector.count_truncated(frame.len);
            continue;
        }
        if frame.captured < frame.len {
            iface.lock().stats.truncated += 1;
        }
        dissector.dissect_with_len(&buf[..frame.captured], frame.len);
    }

    add_drops(dissector, source)?;
    info!(iface = %iface.name(), frames = seen, "capture stopped");
    Ok(seen)
}

fn add_drops(dissector: &FrameDissector, source: &mut dyn FrameSource) -> io::Result<()> {
    let drops = source.drops()?;
    if drops > 0 {
        dissector.interface().lock().stats.drops += drops;
    }
    Ok(())
}
