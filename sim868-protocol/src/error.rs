use std::string::FromUtf8Error;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ModemError>;

#[derive(Debug, Error)]
pub enum ModemError {
    #[cfg(feature = "serial")]
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serial port not found: {0}")]
    PortNotFound(String),

    #[error("invalid command line: {0:?}")]
    InvalidCommand(String),

    #[error("response is not valid UTF-8: {0}")]
    InvalidEncoding(#[from] FromUtf8Error),

    #[error("power control signal failed ({kind:?}): {detail}")]
    PowerSignal {
        kind: embedded_hal::digital::ErrorKind,
        detail: String,
    },

    #[error(
        "modem did not answer AT within {elapsed_ms} ms ({probes} probe(s), {power_cycles} power cycle(s))"
    )]
    PowerRetryExhausted {
        probes: u32,
        power_cycles: u32,
        elapsed_ms: u64,
    },

    #[error("command session lock poisoned")]
    SessionPoisoned,
}
