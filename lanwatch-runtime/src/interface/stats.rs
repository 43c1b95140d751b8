use std::fmt;

/// Lifetime counters of one interface. Only ever incremented, always under the interface lock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub frames: u64,
    pub bytes: u64,
    pub malformed: u64,
    pub truncated: u64,
    pub noprotocol: u64,
    pub drops: u64,
    pub tx_frames: u64,
    pub tx_bytes: u64,
    pub tx_aborts: u64,
    pub tx_errors: u64,
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rx {} frames / {} bytes ({} malformed, {} truncated, {} unknown, {} dropped), \
             tx {} frames / {} bytes ({} aborted, {} failed)",
            self.frames,
            self.bytes,
            self.malformed,
            self.truncated,
            self.noprotocol,
            self.drops,
            self.tx_frames,
            self.tx_bytes,
            self.tx_aborts,
            self.tx_errors
        )
    }
}
