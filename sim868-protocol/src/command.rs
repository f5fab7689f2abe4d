use std::fmt;

use crate::error::{ModemError, Result};

/// Line terminator appended to every command before transmission.
pub const LINE_TERMINATOR: &str = "\r\n";

/// Status token the modem appends to a successful response.
pub const OK_TOKEN: &str = "OK";

/// Command text literals.
pub mod at {
    /// Enable command echo.
    pub const ECHO_ON: &str = "ATE1";
    /// Bare liveness probe.
    pub const ATTENTION: &str = "AT";
    /// Power up the GNSS engine.
    pub const GNSS_POWER_ON: &str = "AT+CGNSPWR=1";
    /// Power down the GNSS engine.
    pub const GNSS_POWER_OFF: &str = "AT+CGNSPWR=0";
    /// Query GNSS navigation information.
    pub const GNSS_INFO: &str = "AT+CGNSINF";
}

/// An AT command line, without its terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `ATE1`
    EchoOn,
    /// `AT`
    Attention,
    /// `AT+CGNSPWR=1` or `AT+CGNSPWR=0`.
    GnssPower(bool),
    /// `AT+CGNSINF`
    GnssInfo,
    /// Any other line. Construct with [`Command::raw`].
    Raw(String),
}

impl Command {
    /// Build an arbitrary command line.
    ///
    /// The line must be printable ASCII and must not carry its own terminator;
    /// the session appends CR LF.
    pub fn raw(line: impl Into<String>) -> Result<Self> {
        let line = line.into();
        if line.is_empty() || !line.bytes().all(|b| b.is_ascii() && !b.is_ascii_control()) {
            return Err(ModemError::InvalidCommand(line));
        }
        Ok(Command::Raw(line))
    }

    /// The command text as sent, minus the terminator.
    pub fn as_str(&self) -> &str {
        match self {
            Command::EchoOn => at::ECHO_ON,
            Command::Attention => at::ATTENTION,
            Command::GnssPower(true) => at::GNSS_POWER_ON,
            Command::GnssPower(false) => at::GNSS_POWER_OFF,
            Command::GnssInfo => at::GNSS_INFO,
            Command::Raw(line) => line,
        }
    }

    /// Wire bytes: the command text followed by CR LF.
    pub fn to_bytes(&self) -> Vec<u8> {
        let text = self.as_str();
        let mut bytes = Vec::with_capacity(text.len() + LINE_TERMINATOR.len());
        bytes.extend_from_slice(text.as_bytes());
        bytes.extend_from_slice(LINE_TERMINATOR.as_bytes());
        bytes
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
