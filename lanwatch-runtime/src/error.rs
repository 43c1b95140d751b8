use lanwatch_packets::BuildError;
use std::io;
use thiserror::Error;

/// Failures surfaced to callers of the transmit engine. None of them are retried internally.
#[derive(Debug, Error)]
pub enum TxError {
    #[error("no free transmit slot on {iface}")]
    ResourceExhausted { iface: String },

    #[error("{iface} has no transmit ring")]
    NoRing { iface: String },

    #[error("{iface} is stopped")]
    Stopped { iface: String },

    #[error("frame needs {need} bytes but the buffer holds {have}")]
    BuildTooSmall { need: usize, have: usize },

    #[error("address length {got} where {expected} was expected")]
    AddressLength { expected: usize, got: usize },

    #[error("transmit on {iface} failed: {source}")]
    TransmitFailed {
        iface: String,
        #[source]
        source: io::Error,
    },

    #[error("{0} is not supported")]
    Unsupported(&'static str),
}

impl From<BuildError> for TxError {
    fn from(err: BuildError) -> Self {
        match err {
            BuildError::TooSmall { need, have } => TxError::BuildTooSmall { need, have },
            BuildError::AddressLength { expected, got } => TxError::AddressLength { expected, got },
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Tx(#[from] TxError),

    #[error("interface '{name}' not found")]
    InterfaceNotFound { name: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_errors_convert() {
        let err: TxError = BuildError::TooSmall { need: 42, have: 10 }.into();
        assert_eq!(err.to_string(), "frame needs 42 bytes but the buffer holds 10");

        let err: Error = TxError::ResourceExhausted {
            iface: "eth0".into(),
        }
        .into();
        assert_eq!(err.to_string(), "no free transmit slot on eth0");
    }
}
